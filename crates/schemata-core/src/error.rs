//! Error types for diffing and migrating schemas.

/// Boxed error coming from a collaborator (database driver, introspector).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while diffing or migrating a schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The declarative schema source is malformed or fails validation.
    #[error("Failed to parse schema: {message}")]
    Parse {
        /// What was wrong with the source.
        message: String,
    },

    /// The live schema could not be read.
    #[error("Failed to read live schema: {0}")]
    Introspection(#[source] BoxError),

    /// An option value could not be canonicalized.
    #[error("Cannot normalize option `{option}` on `{table}`: {message}")]
    Normalization {
        /// Table carrying the option.
        table: String,
        /// Option name.
        option: String,
        /// Why normalization failed.
        message: String,
    },

    /// A planned DDL statement failed against the database.
    #[error("Failed to execute `{statement}`: {source}")]
    Execution {
        /// The statement text, verbatim.
        statement: String,
        /// The underlying database error.
        #[source]
        source: BoxError,
    },

    /// An operation was requested in a state that does not allow it.
    #[error("Invalid migrator state: expected {expected}, found {actual}")]
    InvalidState {
        /// States the operation accepts.
        expected: &'static str,
        /// The state the migrator was in.
        actual: String,
    },

    /// Serialization error while rendering a dump.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SchemaError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_carries_statement_and_cause() {
        let err = SchemaError::Execution {
            statement: "ALTER TABLE `users` DROP COLUMN `email`".to_string(),
            source: "Can't DROP 'email'; check that column/key exists".into(),
        };

        let text = err.to_string();
        assert!(text.contains("ALTER TABLE `users` DROP COLUMN `email`"));
        assert!(text.contains("Can't DROP 'email'"));
    }
}
