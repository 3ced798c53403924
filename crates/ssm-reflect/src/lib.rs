//! SSM Structural Mapping
//!
//! Walks annotated structures and maps every tagged field to a remote path.
//!
//! # Core Concepts
//!
//! - [`Structure`] / [`Field`]: Field table and accessors, derived with `#[derive(Structure)]`
//! - [`Parser`]: Walker producing a [`NodeTree`] for the registered namespaces
//! - [`FieldFilters`]: Longest-prefix include/exclude rules over local paths
//! - [`to_wire`] / [`from_wire`]: Scalar and JSON value conversion
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use ssm_reflect::{FieldFilters, Parser, Structure};
//! use ssm_tag::PmsTagParser;
//!
//! #[derive(Structure, Serialize, Deserialize, Default)]
//! struct Config {
//!     #[pms("test, prefix=simple")]
//!     name: String,
//! }
//!
//! let parser = Parser::new("dev", "svc1").register("pms", PmsTagParser);
//! let tree = parser.parse(&Config::default()).unwrap();
//! let paths = tree.parameter_map("pms", &FieldFilters::new());
//! assert!(paths.contains_key("/dev/svc1/simple/test"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

extern crate self as ssm_reflect;

mod codec;
mod error;
mod field;
mod filter;
mod node;
mod walker;

pub use codec::{from_wire, to_wire, Scalar, ScalarKind, ScalarParseError};
pub use error::{CodecError, ParseError};
pub use field::{
    resolve, resolve_mut, Annotation, Field, FieldDescriptor, FieldMut, FieldRef, Structure,
};
pub use filter::{FieldFilter, FieldFilters, FilterAction};
pub use node::{Node, NodeId, NodeTree};
pub use walker::{Parser, DEFAULT_MAX_DEPTH};

pub use ssm_derive::Structure;

/// Items referenced by `#[derive(Structure)]` expansions.
/// **Note:** Not part of the public API.
#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
