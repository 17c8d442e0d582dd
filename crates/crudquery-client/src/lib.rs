//! Typed query builders and the HTTP transport for remote query endpoints.
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use crudquery_client::prelude::*;
//! ```
//!
//! A [`QueryService`] hands out [`QueryBuilder`]s. Builders accumulate a
//! [`QueryPlan`](crudquery_core::QueryPlan), serialize it with
//! `crudquery_core` and post it through a [`QueryClient`]: one request per
//! `to_list` or `to_paged_result` call, to the endpoint matching the query
//! shape (plain or search, projected or not, paged or not).

pub mod builder;
pub mod client;
pub mod error;
pub mod models;
pub mod prelude;
pub mod service;

pub use builder::{QueryBuilder, SelectQueryBuilder};
pub use client::{QueryClient, QueryClientBuilder};
pub use error::{Error, RemoteQueryError, Result};
pub use service::QueryService;
