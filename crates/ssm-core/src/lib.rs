//! SSM Core - structure synchronization with parameter and secret stores
//!
//! Reads, writes and deletes the remote entries behind the tagged fields of a
//! structure:
//! - Parses the structure into a node tree for the active stores
//! - Selects fields with include/exclude filters
//! - Batches reads and writes per store, retrying transient failures
//! - Reports missing and failed fields without aborting the call
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use ssm_backend::MemoryStore;
//! use ssm_core::{Serializer, SerializerConfig};
//! use ssm_reflect::Structure;
//!
//! #[derive(Structure, Serialize, Deserialize, Default)]
//! struct Config {
//!     #[pms("test, prefix=simple")]
//!     name: String,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ssm_core::SsmError> {
//! let store = Arc::new(MemoryStore::parameters());
//! let serializer = Serializer::new(SerializerConfig::new("dev", "svc1"))
//!     .with_parameter_store(store.clone());
//!
//! let written = Config { name: "my-name".into() };
//! assert!(serializer.marshal(&written).await?.is_empty());
//! assert_eq!(store.value("/dev/svc1/simple/test").as_deref(), Some("my-name"));
//!
//! let mut read = Config::default();
//! assert!(serializer.unmarshal(&mut read).await?.is_empty());
//! assert_eq!(read.name, "my-name");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod result;
pub mod retry;
pub mod serializer;

mod repository;
mod request;

// Re-exports for convenience
pub use config::{RetryPolicy, SerializerConfig};
pub use error::{FieldError, SsmError, WriteError};
pub use result::{FieldResult, FieldResults};
pub use retry::retry;
pub use serializer::Serializer;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for synchronizing structures
    pub use crate::{FieldResult, FieldResults, Serializer, SerializerConfig, SsmError};
    pub use ssm_reflect::{FieldFilters, Structure};
    pub use ssm_tag::{StoreType, Tier};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
