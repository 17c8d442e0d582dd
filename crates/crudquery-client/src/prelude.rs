//! Prelude module for convenient imports.
//!
//! Re-exports the client entry points together with the `crudquery_core`
//! types most queries need.
//!
//! # Example
//!
//! ```
//! use crudquery_client::prelude::*;
//!
//! // Now you have access to:
//! // - QueryService, QueryClient, QueryBuilder (building and sending queries)
//! // - Error, RemoteQueryError, Result (error handling)
//! // - QueryRequest, SearchRequest, PagedResult (wire payloads)
//! // - Field, Collection, Projection, FilterDescriptor, Operator (query parts)
//! ```

// Client types
pub use crate::builder::{QueryBuilder, SelectQueryBuilder};
pub use crate::client::{QueryClient, QueryClientBuilder};
pub use crate::service::QueryService;

// Error types
pub use crate::error::{Error, RemoteQueryError, Result};

// Wire payloads
pub use crate::models::{Operation, PagedResult, QueryRequest, SearchRequest};

// Query parts
pub use crudquery_core::{
    CaseSensitivity, Collection, Condition, Field, FieldRef, FilterDescriptor, Operator,
    Projection, Record, Schema,
};
