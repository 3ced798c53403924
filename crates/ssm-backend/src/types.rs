//! Request and response records exchanged with a store

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ssm_tag::Tier;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Version pin for a read
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionSelector {
    /// Exact version id
    pub id: Option<String>,
    /// Version stage label
    pub stage: Option<String>,
}

impl VersionSelector {
    /// Latest version
    #[inline]
    #[must_use]
    pub fn latest() -> Self {
        Self::default()
    }

    /// Whether no pin is set
    #[inline]
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.id.is_none() && self.stage.is_none()
    }
}

/// One path to read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetEntry {
    /// Remote path
    pub path: String,
    /// Version pin
    pub version: VersionSelector,
}

impl GetEntry {
    /// Read the latest version of `path`
    #[must_use]
    pub fn latest(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: VersionSelector::latest(),
        }
    }
}

/// Batch read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Paths to read
    pub entries: Vec<GetEntry>,
    /// Whether encrypted values must be returned in clear text
    pub decrypt: bool,
}

/// Value read from a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteValue {
    /// Stored text
    pub value: String,
    /// Version the text belongs to
    pub version: Option<String>,
}

/// Batch read result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOutput {
    /// Values by remote path
    pub values: BTreeMap<String, RemoteValue>,
    /// Paths the store could not resolve
    pub unresolved: Vec<String>,
}

/// Stored value type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Plain text
    #[default]
    String,
    /// Encrypted text
    SecureString,
}

/// One write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutEntry {
    /// Remote path
    pub path: String,
    /// Text to store
    pub value: String,
    /// Plain or encrypted
    pub value_type: ValueType,
    /// Resolved key id; `None` uses the store default key
    pub key_id: Option<String>,
    /// Freeform metadata
    pub tags: IndexMap<String, String>,
    /// Tier hint
    pub tier: Option<Tier>,
    /// Human readable description
    pub description: Option<String>,
    /// Whether a create may replace an existing value
    pub overwrite: bool,
    /// Idempotency token for the write
    pub client_token: Option<Uuid>,
}

impl PutEntry {
    /// Plain text write with overwrite enabled
    #[must_use]
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            value_type: ValueType::String,
            key_id: None,
            tags: IndexMap::new(),
            tier: None,
            description: None,
            overwrite: true,
            client_token: None,
        }
    }
}

/// Batch delete result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutput {
    /// Paths that did not exist
    pub unresolved: Vec<String>,
}

/// One listed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Remote path
    pub name: String,
    /// Current version
    pub version: Option<String>,
    /// Last write time
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Entries on this page
    pub entries: Vec<ListEntry>,
    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}
