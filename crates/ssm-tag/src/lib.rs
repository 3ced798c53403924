//! SSM Tag Grammar
//!
//! Parses per-field annotation literals into typed tag records and renders
//! the remote path prefix they live under.
//!
//! # Core Concepts
//!
//! - [`Tag`]: Namespace independent record (name, prefix, options, metadata)
//! - [`StoreTag`]: Closed set of namespace variants ([`PmsTag`], [`AsmTag`], custom)
//! - [`TagParser`]: Per-namespace parser, registered in a [`TagParserRegistry`]
//! - [`render_prefix`]: Local/global path prefix rendering
//!
//! # Example
//!
//! ```rust
//! use ssm_tag::{PmsTagParser, TagParser};
//!
//! let tag = PmsTagParser
//!     .parse_tag_string("test, prefix=simple, keyid=default", "", "dev", "svc1")
//!     .unwrap();
//! assert_eq!(tag.full_name(), "/dev/svc1/simple/test");
//! assert!(tag.secure());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod parser;
mod prefix;
mod tag;

pub use error::TagError;
pub use parser::{
    parse_tag, AsmTagParser, GenericTagParser, PmsTagParser, TagParser, TagParserRegistry,
};
pub use prefix::{is_global, render_prefix};
pub use tag::{AsmTag, KeyRef, PmsTag, StoreTag, StoreType, Tag, Tier};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
