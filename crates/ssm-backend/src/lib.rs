//! SSM Backend Contract
//!
//! The async interface the orchestrator talks to, plus in-memory stores.
//!
//! # Core Concepts
//!
//! - [`Backend`]: get / create / update / tag / delete / list against one store
//! - [`BackendError`]: Transient, not-found and write failures
//! - [`MemoryStore`]: Parameter store or secrets store kept in memory

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod backend;
mod error;
mod memory;
mod types;

pub use backend::Backend;
pub use error::BackendError;
pub use memory::{
    MemoryStore, StoredEntry, StoredVersion, CURRENT_STAGE, MASKED_VALUE, PREVIOUS_STAGE,
};
pub use types::{
    DeleteOutput, GetEntry, GetOutput, GetRequest, ListEntry, ListPage, PutEntry, RemoteValue,
    ValueType, VersionSelector,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
