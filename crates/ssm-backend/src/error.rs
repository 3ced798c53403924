//! Backend error taxonomy

/// Errors reported by a remote store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Transient condition; the call may succeed when retried
    #[error("temporarily unavailable: {0}")]
    Unavailable(String),

    /// The path does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A create targeted an existing path
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The store refused the write
    #[error("write rejected for {path}: {reason}")]
    WriteRejected {
        /// Remote path
        path: String,
        /// Store supplied reason
        reason: String,
    },

    /// Any other store failure
    #[error("backend failure: {0}")]
    Other(String),
}

impl BackendError {
    /// Create a write rejection
    pub fn write_rejected(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteRejected {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying may help
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether the path is missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
