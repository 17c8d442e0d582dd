//! Error types for the query client.

use thiserror::Error;

use crudquery_core::{InvalidFilterError, QueryParseError, UnsupportedExpressionError};

/// A non-success response from a query endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("query endpoint returned {status}: {body}")]
pub struct RemoteQueryError {
    pub status: u16,
    /// The raw response body, unmodified.
    pub body: String,
}

impl RemoteQueryError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 4xx statuses.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// The envelope's `message`, if the body is an envelope that has one.
    pub fn message(&self) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

/// Errors that can occur when building or running a query.
#[derive(Debug, Error)]
pub enum Error {
    /// The query could not be built locally. Nothing was sent.
    #[error(transparent)]
    Query(#[from] crudquery_core::Error),

    #[error(transparent)]
    Remote(#[from] RemoteQueryError),

    /// Connection failure or timeout.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A select query whose projection names no fields.
    #[error("projection selects no fields")]
    EmptyProjection,
}

impl From<InvalidFilterError> for Error {
    fn from(err: InvalidFilterError) -> Self {
        Error::Query(err.into())
    }
}

impl From<UnsupportedExpressionError> for Error {
    fn from(err: UnsupportedExpressionError) -> Self {
        Error::Query(err.into())
    }
}

impl From<QueryParseError> for Error {
    fn from(err: QueryParseError) -> Self {
        Error::Query(err.into())
    }
}

impl Error {
    /// Returns the appropriate CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Query(_) | Error::EmptyProjection => 1,
            Error::Remote(_) | Error::Decode(_) => 2,
            Error::Network(_) => 3,
        }
    }

    /// True if nothing was sent because the query failed to build.
    pub fn is_local(&self) -> bool {
        matches!(self, Error::Query(_) | Error::EmptyProjection)
    }
}

/// A specialized Result type for query client operations.
pub type Result<T> = std::result::Result<T, Error>;
