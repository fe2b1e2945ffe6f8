//! Error taxonomy for the entity pipeline.

use thiserror::Error;

/// Result alias used across `entikit_entity`.
pub type Result<T> = std::result::Result<T, EntityError>;

/// Errors scoped to one user action. None of them is fatal to the process.
#[derive(Debug, Error)]
pub enum EntityError {
    /// Missing required identity (e.g. empty entity name at save time).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Persisted slot could not be read, decoded or written.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// Field catalog or sheet classification is inconsistent.
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// Runtime configuration could not be loaded.
    #[error("config error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EntityError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for [`EntityError::Validation`].
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EntityError::validation("Entity name is required to save data.");
        assert_eq!(
            err.to_string(),
            "validation error: Entity name is required to save data."
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_persistence_error_is_not_validation() {
        let err = EntityError::persistence("slot unreadable");
        assert!(!err.is_validation());
        assert!(err.to_string().contains("slot unreadable"));
    }
}
