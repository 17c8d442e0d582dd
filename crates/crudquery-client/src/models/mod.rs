//! Wire payloads exchanged with the query endpoints.

mod request;
mod response;

pub use request::{Operation, QueryRequest, SearchRequest};
pub use response::{ApiEnvelope, PagedResult};

pub(crate) use response::decode_body;
