//! Response bodies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, RemoteQueryError, Result};

/// One page of results with the server-side total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub total_count: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    /// Number of pages at the current page size, or 0 when unknown.
    pub fn total_pages(&self) -> u64 {
        match u64::from(self.page_size) {
            0 => 0,
            size => self.total_count.div_ceil(size),
        }
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// The platform's response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Decodes a success-status body, enveloped or bare.
///
/// An envelope with `success: false` becomes a [`RemoteQueryError`] carrying
/// `status` and the raw body.
pub(crate) fn decode_body<R: DeserializeOwned>(status: u16, body: &str) -> Result<R> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !is_envelope(&value) {
        return Ok(serde_json::from_value(value)?);
    }

    let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_value(value)?;
    if !envelope.success {
        return Err(Error::Remote(RemoteQueryError::new(status, body)));
    }
    let data = envelope.data.unwrap_or(serde_json::Value::Null);
    Ok(serde_json::from_value(data)?)
}

fn is_envelope(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .and_then(|object| object.get("success"))
        .is_some_and(serde_json::Value::is_boolean)
}
