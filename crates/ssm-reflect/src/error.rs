//! Error types for walking and value conversion

use ssm_tag::TagError;

/// Errors while building a node tree
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The root is not a present structure
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An annotation literal was malformed
    #[error("invalid {namespace} tag on {type_name}.{field}: {source}")]
    Tag {
        /// Type owning the field
        type_name: &'static str,
        /// Field carrying the annotation
        field: &'static str,
        /// Annotation namespace
        namespace: String,
        /// Underlying grammar error
        #[source]
        source: TagError,
    },
}

impl ParseError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Errors while converting a single field value
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The wire value could not be parsed into the field kind
    #[error("invalid value '{value}' for field {field}: {reason}")]
    InvalidValue {
        /// Local path of the field
        field: String,
        /// Offending wire value
        value: String,
        /// Parser message
        reason: String,
    },

    /// JSON folding of a sub-structure failed
    #[error("json conversion failed for field {field}: {source}")]
    Json {
        /// Local path of the field
        field: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON error
    pub fn json(field: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            field: field.into(),
            source,
        }
    }
}
