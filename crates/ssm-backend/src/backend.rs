//! Store contract

use crate::error::BackendError;
use crate::types::{DeleteOutput, GetOutput, GetRequest, ListPage, PutEntry};
use async_trait::async_trait;
use indexmap::IndexMap;
use ssm_tag::StoreType;

/// A remote key-value store holding parameters or secrets
///
/// Implementations perform the network calls; the orchestrator decides
/// create-or-update, retries and per-field error reporting.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Which store this is
    fn store_type(&self) -> StoreType;

    /// Read a batch of paths
    ///
    /// Missing paths are reported in [`GetOutput::unresolved`], not as
    /// errors.
    async fn get(&self, request: &GetRequest) -> Result<GetOutput, BackendError>;

    /// Create a value, replacing it only when [`PutEntry::overwrite`] allows
    async fn create(&self, entry: &PutEntry) -> Result<(), BackendError>;

    /// Replace the value of an existing path
    async fn update(&self, entry: &PutEntry) -> Result<(), BackendError>;

    /// Attach metadata to an existing path
    async fn tag(&self, path: &str, tags: &IndexMap<String, String>) -> Result<(), BackendError>;

    /// Delete a batch of paths
    ///
    /// Missing paths are reported in [`DeleteOutput::unresolved`].
    async fn delete(&self, paths: &[String]) -> Result<DeleteOutput, BackendError>;

    /// List one page of paths starting with any of `prefixes`
    async fn list(
        &self,
        prefixes: &[String],
        next_token: Option<&str>,
    ) -> Result<ListPage, BackendError>;
}
