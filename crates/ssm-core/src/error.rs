//! Error types for synchronization
//!
//! Call level failures surface as [`SsmError`]; per-field failures are
//! recorded as [`FieldError`] in the field result map and never abort
//! sibling fields.

use ssm_backend::BackendError;
use ssm_reflect::{CodecError, ParseError};
use ssm_tag::StoreType;

/// Call level error
#[derive(Debug, thiserror::Error)]
pub enum SsmError {
    /// The structure could not be walked
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    /// The call arguments were rejected
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Fields target a store that has no backend
    #[error("no backend configured for the {0} store")]
    BackendMissing(StoreType),

    /// A batch call to a store failed
    #[error("{store} store failed: {source}")]
    Backend {
        /// Store that failed
        store: StoreType,
        /// Underlying failure
        #[source]
        source: BackendError,
    },
}

impl SsmError {
    /// Create a backend error
    pub fn backend(store: StoreType, source: BackendError) -> Self {
        Self::Backend { store, source }
    }

    /// Whether the caller passed something unusable
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::Parse(ParseError::InvalidArgument(_))
        )
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { source, .. } if source.is_transient())
    }
}

/// Rejected write request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// `keyid=local://name` names a key that is not registered
    #[error("no key registered under '{0}'")]
    UnknownKey(String),

    /// The `pattern` option is not a valid regular expression
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as written
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// The value does not match the `pattern` option
    #[error("value does not match pattern '{0}'")]
    PatternMismatch(String),
}

/// Failure of one field
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// Value conversion failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The store rejected the field
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The write request could not be built
    #[error(transparent)]
    Write(#[from] WriteError),
}
