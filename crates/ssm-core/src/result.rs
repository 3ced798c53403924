//! Per-field outcomes

use crate::error::FieldError;
use ssm_reflect::{resolve, Field, Node};
use ssm_tag::StoreType;
use std::collections::BTreeMap;

/// Outcomes keyed by local dotted path; an empty map means full success
pub type FieldResults = BTreeMap<String, FieldResult>;

/// Outcome for one field that was missing remotely or failed
#[derive(Debug)]
pub struct FieldResult {
    /// Dotted local path
    pub local_name: String,
    /// Remote path
    pub remote_name: String,
    /// Field identifier
    pub field_name: &'static str,
    /// Type owning the field
    pub owner: &'static str,
    /// Store the outcome comes from
    pub store: StoreType,
    /// Index path to the field from the root
    pub accessor: Vec<usize>,
    /// Failure; `None` when the path was simply not found
    pub error: Option<FieldError>,
}

impl FieldResult {
    fn from_node(node: &Node, remote_name: &str, store: StoreType, error: Option<FieldError>) -> Self {
        Self {
            local_name: node.local_path().to_string(),
            remote_name: remote_name.to_string(),
            field_name: node.field_name(),
            owner: node.owner(),
            store,
            accessor: node.accessor().to_vec(),
            error,
        }
    }

    /// Path not found remotely
    #[must_use]
    pub fn missing(node: &Node, remote_name: &str, store: StoreType) -> Self {
        Self::from_node(node, remote_name, store, None)
    }

    /// Field failed
    #[must_use]
    pub fn failed(
        node: &Node,
        remote_name: &str,
        store: StoreType,
        error: impl Into<FieldError>,
    ) -> Self {
        Self::from_node(node, remote_name, store, Some(error.into()))
    }

    /// Whether the path was simply not found
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the field failed
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Read handle of the field within `root`
    #[must_use]
    pub fn resolve<'a>(&self, root: &'a dyn Field) -> Option<&'a dyn Field> {
        resolve(root, &self.accessor)
    }
}
