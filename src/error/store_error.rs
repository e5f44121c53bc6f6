use thiserror::Error;

/// Error type covering every failure surfaced by the data-access core.
///
/// Argument and state errors are detected locally and never reach the
/// persistence engine; conflict and persistence failures originate at
/// flush or commit time and always roll the pending batch back first.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed input to a core operation (nil identity, non-positive
    /// page size, type-mismatched filter criterion)
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Referenced entity identity does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// Transaction control called out of sequence
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// The engine rejected a change that contradicts existing data
    #[error("Persistence conflict: {message}")]
    Conflict { message: String },

    /// The engine failed while executing an operation
    #[error("Persistence failure during {operation}")]
    Persistence {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// An in-flight operation was cancelled; any active transaction has
    /// been rolled back
    #[error("Cancelled during {operation}")]
    Cancelled { operation: String },
}

impl StoreError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        StoreError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        StoreError::InvalidState {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict {
            message: message.into(),
        }
    }

    pub fn persistence(operation: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        StoreError::Persistence {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        StoreError::Cancelled {
            operation: operation.into(),
        }
    }
}

/// Type alias for Result with StoreError to simplify function signatures
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("promotion", "SAVE10");
        assert_eq!(err.to_string(), "promotion not found: SAVE10");
    }

    #[test]
    fn test_persistence_carries_source() {
        let err = StoreError::persistence(
            "commit",
            anyhow::anyhow!("connection reset"),
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "connection reset");
    }
}
