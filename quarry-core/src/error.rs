//! Error types for Quarry

use std::time::Duration;
use thiserror::Error;

/// The main error type for Quarry operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement is missing a required part (table, columns, values, ...)
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// An `IN` predicate was given an empty collection.
    ///
    /// Read paths treat this as "no rows"; write paths surface it.
    #[error("IN values for column '{column}' are empty")]
    EmptyIn { column: String },

    /// Named placeholders could not be turned into positional ones
    #[error("Parameter expansion error: {message}")]
    Expansion { message: String },

    /// The driver reported a column type with no value-kind mapping
    #[error("Column '{column}' has unsupported database type '{db_type}'")]
    UnknownColumnType { column: String, db_type: String },

    /// A column value could not be decoded into its value kind
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A row handed to the join resolver lacks the key column
    #[error("Row has no key column '{key}'")]
    MissingKey { key: String },

    /// A statement did not finish within the configured timeout
    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Convenience Result type for Quarry operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new empty-IN error for the given column
    pub fn empty_in(column: impl Into<String>) -> Self {
        Self::EmptyIn {
            column: column.into(),
        }
    }

    /// Create a new parameter expansion error
    pub fn expansion(message: impl Into<String>) -> Self {
        Self::Expansion {
            message: message.into(),
        }
    }

    /// Create a new unknown column type error
    pub fn unknown_column_type(column: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self::UnknownColumnType {
            column: column.into(),
            db_type: db_type.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a new missing key error
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this is the empty-IN signal
    pub fn is_empty_in(&self) -> bool {
        matches!(self, Self::EmptyIn { .. })
    }
}
