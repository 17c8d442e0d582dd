//! Entry point for building queries.

use crudquery_core::Record;

use crate::builder::QueryBuilder;
use crate::client::QueryClient;

/// Hands out query builders bound to one client.
///
/// ```
/// use crudquery_client::{QueryClient, QueryService};
///
/// let service = QueryService::new(QueryClient::new("https://erp.example.com/api"));
/// let query = service.for_name::<serde_json::Value>("Producto").take(5);
/// assert_eq!(query.type_name(), "Producto");
/// ```
#[derive(Debug, Clone)]
pub struct QueryService {
    client: QueryClient,
}

impl QueryService {
    pub fn new(client: QueryClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// A query over `T`, addressed by its schema name.
    pub fn for_type<T: Record>(&self) -> QueryBuilder<T> {
        QueryBuilder::new(self.client.clone(), T::schema().name())
    }

    /// A query over `T` sent to `base_url` instead of the client's.
    pub fn for_type_at<T: Record>(&self, base_url: impl Into<String>) -> QueryBuilder<T> {
        self.for_type::<T>().at_base_url(base_url)
    }

    /// A query addressed by record type name, for records without a schema.
    pub fn for_name<T>(&self, type_name: impl Into<String>) -> QueryBuilder<T> {
        QueryBuilder::new(self.client.clone(), type_name.into())
    }
}

impl From<QueryClient> for QueryService {
    fn from(client: QueryClient) -> Self {
        Self::new(client)
    }
}
