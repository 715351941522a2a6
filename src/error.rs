// Bookshelf error types

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Book not found for ISBN {0}")]
    NotFound(String),

    #[error("Lookup failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Lookup failed: registry answered HTTP {0}")]
    HttpStatus(u16),

    #[error("Malformed lookup response: {0}")]
    Malformed(String),

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Database handle unavailable: {0}")]
    HandleUnavailable(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid request: {0}")]
    Request(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected response to {0}")]
    UnexpectedResponse(String),
}

impl CatalogError {
    /// Stable machine-readable name for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "not_found",
            CatalogError::Network(_) | CatalogError::HttpStatus(_) => "network",
            CatalogError::Malformed(_) => "malformed",
            CatalogError::Storage(_) | CatalogError::HandleUnavailable(_) => "storage",
            CatalogError::Constraint(_) => "constraint",
            CatalogError::InvalidInput(_) => "invalid_input",
            CatalogError::Request(_) => "request",
            CatalogError::Io(_) => "io",
            CatalogError::Config(_) => "config",
            CatalogError::UnexpectedResponse(_) => "internal",
        }
    }
}

impl From<quick_xml::Error> for CatalogError {
    fn from(err: quick_xml::Error) -> Self {
        CatalogError::Malformed(err.to_string())
    }
}

impl Serialize for CatalogError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("CatalogError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// True when a SQLite failure is a constraint violation (UNIQUE, FOREIGN KEY, ...).
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub type Result<T> = std::result::Result<T, CatalogError>;
