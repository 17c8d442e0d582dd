//! HTTP transport for the query endpoints.

use std::fmt;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, RemoteQueryError, Result};
use crate::models::{decode_body, Operation};

/// Posts query payloads to `{base_url}/query/{TypeName}/{operation}`.
///
/// Each call is a single request. Nothing is retried.
#[derive(Clone)]
pub struct QueryClient {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Option<Duration>,
}

/// Builder for [`QueryClient`].
///
/// ```
/// use std::time::Duration;
/// use crudquery_client::QueryClient;
///
/// let client = QueryClient::builder("https://erp.example.com/api")
///     .token("secret")
///     .timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(client.base_url(), "https://erp.example.com/api");
/// ```
#[derive(Clone)]
pub struct QueryClientBuilder {
    base_url: String,
    token: Option<String>,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl QueryClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: None,
            http_client: None,
        }
    }

    /// Bearer token sent with every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Per-request timeout. Unset means the HTTP client's own default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS roots).
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> QueryClient {
        QueryClient {
            http_client: self.http_client.unwrap_or_default(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            token: self.token,
            timeout: self.timeout,
        }
    }
}

impl QueryClient {
    /// Creates an unauthenticated client for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        QueryClientBuilder::new(base_url).build()
    }

    pub fn builder(base_url: impl Into<String>) -> QueryClientBuilder {
        QueryClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// The endpoint URL for `operation` on `type_name`, against `base`
    /// when given, otherwise the client's base URL.
    pub fn endpoint(&self, base: Option<&str>, type_name: &str, operation: Operation) -> String {
        let base = base.map_or(self.base_url.as_str(), |b| b.trim_end_matches('/'));
        format!("{}/query/{}/{}", base, type_name, operation.segment())
    }

    /// Posts `body` to the endpoint and decodes the response.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] for a non-success status or an envelope with
    ///   `success: false`
    /// - [`Error::Network`] if the request could not be completed
    /// - [`Error::Decode`] if the body does not match `R`
    pub async fn execute<B, R>(
        &self,
        base: Option<&str>,
        type_name: &str,
        operation: Operation,
        body: &B,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(base, type_name, operation);
        debug!(endpoint = %url, variant = %operation, "dispatching query");

        let mut request = self.http_client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<R: DeserializeOwned>(&self, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        let body = response.text().await?;

        let result = if status.is_success() {
            decode_body(status.as_u16(), &body)
        } else {
            Err(RemoteQueryError::new(status.as_u16(), body).into())
        };

        if let Err(Error::Remote(err)) = &result {
            warn!(status = err.status, "query endpoint rejected the request");
        }
        result
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
