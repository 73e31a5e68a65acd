//! Error types for Reginald

use thiserror::Error;

/// The main error type for Reginald operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entry tree could not be translated for the target backend
    #[error("Translation error: {message}")]
    Translation { message: String },

    /// Operation exists in the builder API but not on this backend
    #[error("Unsupported operation '{operation}' for dialect '{dialect}'")]
    Unsupported { operation: String, dialect: String },

    /// Invalid query configuration
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value could not be coerced to the requested type
    #[error("Cannot convert {from} to {to}")]
    Conversion {
        from: &'static str,
        to: &'static str,
    },

    /// Column not found in a result row
    #[error("Column '{column}' not found in row")]
    ColumnNotFound { column: String },

    /// Row index out of range
    #[error("Row index {index} out of range (result has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    /// Commit or rollback mechanics failed, as opposed to the query itself
    #[error("Transaction error: {message}")]
    Transaction { message: String },

    /// No dialect registered under the requested name
    #[error("No dialect registered with name '{name}'")]
    UnknownDialect { name: String },

    /// Async task was cancelled before it started executing
    #[error("Task cancelled before execution")]
    Cancelled,
}

/// Convenience Result type for Reginald operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new translation error
    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation {
            message: message.into(),
        }
    }

    /// Create a new unsupported operation error
    pub fn unsupported(operation: impl Into<String>, dialect: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            dialect: dialect.into(),
        }
    }

    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new conversion error
    pub fn conversion(from: &'static str, to: &'static str) -> Self {
        Self::Conversion { from, to }
    }

    /// Create a new column not found error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Create a new transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create a new unknown dialect error
    pub fn unknown_dialect(name: impl Into<String>) -> Self {
        Self::UnknownDialect { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_error() {
        let err = Error::translation("unresolvable entry");
        assert!(matches!(err, Error::Translation { .. }));
        assert_eq!(err.to_string(), "Translation error: unresolvable entry");
    }

    #[test]
    fn test_invalid_query_error() {
        let err = Error::invalid_query("limit already set");
        assert!(matches!(err, Error::InvalidQuery { .. }));
        assert_eq!(err.to_string(), "Invalid query: limit already set");
    }

    #[test]
    fn test_unsupported_error() {
        let err = Error::unsupported("replace", "PostgreSQL");
        assert_eq!(
            err.to_string(),
            "Unsupported operation 'replace' for dialect 'PostgreSQL'"
        );
    }

    #[test]
    fn test_conversion_error() {
        let err = Error::conversion("TEXT", "i64");
        assert!(matches!(err, Error::Conversion { .. }));
        assert_eq!(err.to_string(), "Cannot convert TEXT to i64");
    }

    #[test]
    fn test_row_out_of_range_error() {
        let err = Error::RowOutOfRange { index: 3, len: 1 };
        assert_eq!(
            err.to_string(),
            "Row index 3 out of range (result has 1 rows)"
        );
    }

    #[test]
    fn test_unknown_dialect_error() {
        let err = Error::unknown_dialect("oracle");
        assert_eq!(err.to_string(), "No dialect registered with name 'oracle'");
    }
}
