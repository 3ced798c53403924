//! Error types for tag parsing

/// Errors produced while parsing an annotation string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// The annotation literal was empty
    #[error("tag string cannot be empty")]
    Empty,

    /// More than one name was supplied (bare token or `name=`)
    #[error("already got a name '{existing}', cannot also use '{duplicate}'")]
    DuplicateName {
        /// Name that was already recorded
        existing: String,
        /// Name that collided with it
        duplicate: String,
    },

    /// Neither a bare token nor `name=` was present
    #[error("no name specified in tag '{0}'")]
    MissingName(String),

    /// A token had a key but the key was blank (`=value`)
    #[error("empty key in token '{0}'")]
    EmptyKey(String),
}

impl TagError {
    /// Create a duplicate name error
    pub fn duplicate(existing: impl Into<String>, duplicate: impl Into<String>) -> Self {
        Self::DuplicateName {
            existing: existing.into(),
            duplicate: duplicate.into(),
        }
    }
}
