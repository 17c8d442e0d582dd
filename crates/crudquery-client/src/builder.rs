//! Fluent query builders.
//!
//! Every step takes the builder by value and returns a new one, and
//! builders are `Clone`, so one prefix can be branched into independent
//! queries:
//!
//! ```
//! use crudquery_client::{QueryClient, QueryService};
//! use crudquery_core::{Field, Record, Schema};
//! # use std::sync::OnceLock;
//! # struct Producto { stock: i32 }
//! # impl Record for Producto {
//! #     fn schema() -> &'static Schema<Self> {
//! #         static S: OnceLock<Schema<Producto>> = OnceLock::new();
//! #         S.get_or_init(|| Schema::builder("Producto").scalar("Stock", |p: &Producto| &p.stock).build())
//! #     }
//! # }
//!
//! const STOCK: Field<Producto, i32> = Field::new("Stock");
//!
//! let service = QueryService::new(QueryClient::new("https://erp.example.com/api"));
//! let en_stock = service.for_type::<Producto>().filter(STOCK.gt(0));
//! let primeros = en_stock.clone().take(10);
//! let resto = en_stock.skip(10);
//!
//! assert_eq!(primeros.to_query_request().unwrap().take, Some(10));
//! assert_eq!(resto.to_query_request().unwrap().take, None);
//! ```
//!
//! Filter steps that fail to lower or parse do not break the chain. The
//! first such error is kept and returned by the request and execution
//! methods before anything is sent.

use std::borrow::Cow;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;

use crudquery_core::{
    lower, parse_filter, CaseSensitivity, Condition, Expr, FieldRef, FilterDescriptor, OrderSpec,
    Projection, QueryPlan, Record, SearchSpec,
};

use crate::client::QueryClient;
use crate::error::{Error, Result};
use crate::models::{Operation, PagedResult, QueryRequest, SearchRequest};

// ==================== Shared state ====================

#[derive(Clone)]
struct QueryState {
    client: QueryClient,
    type_name: Cow<'static, str>,
    plan: QueryPlan,
    pending: Option<crudquery_core::Error>,
}

impl QueryState {
    fn push_filter(&mut self, filter: crudquery_core::Result<FilterDescriptor>) {
        match filter {
            Ok(filter) => self.plan.filters.push(filter),
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: crudquery_core::Error) {
        if self.pending.is_none() {
            self.pending = Some(err);
        }
    }

    fn search_spec(&mut self) -> &mut SearchSpec {
        self.plan.search.get_or_insert_with(SearchSpec::default)
    }

    fn check(&self) -> Result<()> {
        match &self.pending {
            Some(err) => Err(Error::Query(err.clone())),
            None => Ok(()),
        }
    }

    fn query_request(&self) -> Result<QueryRequest> {
        self.check()?;
        Ok(QueryRequest::try_from(&self.plan)?)
    }

    fn search_request(&self) -> Result<Option<SearchRequest>> {
        self.check()?;
        Ok(SearchRequest::from_plan(&self.plan)?)
    }

    fn operation(&self, paged: bool) -> Operation {
        Operation::resolve(
            self.plan.active_search().is_some(),
            self.plan.projection.is_some(),
            paged,
        )
    }

    fn endpoint(&self, paged: bool) -> String {
        self.client.endpoint(
            self.plan.base_url.as_deref(),
            &self.type_name,
            self.operation(paged),
        )
    }

    /// Builds the payload and makes the one call for this query shape.
    async fn dispatch<R: DeserializeOwned>(&self, paged: bool) -> Result<R> {
        if self.plan.projection.is_some() && self.plan.select_string().is_none() {
            return Err(Error::EmptyProjection);
        }

        let base = self.plan.base_url.as_deref();
        let operation = self.operation(paged);
        match self.search_request()? {
            Some(request) => {
                self.client
                    .execute(base, &self.type_name, operation, &request)
                    .await
            }
            None => {
                let request = self.query_request()?;
                self.client
                    .execute(base, &self.type_name, operation, &request)
                    .await
            }
        }
    }
}

// ==================== QueryBuilder ====================

/// Accumulates a query over records of type `T`.
pub struct QueryBuilder<T> {
    state: QueryState,
    _marker: PhantomData<fn() -> T>,
}

impl<T> QueryBuilder<T> {
    pub(crate) fn new(client: QueryClient, type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            state: QueryState {
                client,
                type_name: type_name.into(),
                plan: QueryPlan::new(),
                pending: None,
            },
            _marker: PhantomData,
        }
    }

    /// The record type name used in endpoint paths.
    pub fn type_name(&self) -> &str {
        &self.state.type_name
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.state.plan
    }

    /// Adds a typed condition. Conditions accumulate with AND.
    #[doc(alias = "where")]
    pub fn filter(self, condition: Condition<T>) -> Self {
        self.filter_expr(condition.into_expr())
    }

    /// Adds an untyped boolean expression.
    pub fn filter_expr(mut self, expr: Expr) -> Self {
        self.state.push_filter(lower(&expr).map_err(Into::into));
        self
    }

    /// Adds a filter tree as built by a filter UI.
    pub fn filter_descriptor(mut self, filter: FilterDescriptor) -> Self {
        self.state.plan.filters.push(filter);
        self
    }

    /// Adds a filter written in the query language.
    ///
    /// Text comparisons follow this query's [`case_sensitivity`](Self::case_sensitivity),
    /// whether or not the text was written with `ToLower()`.
    pub fn filter_text(mut self, text: &str) -> Self {
        self.state.push_filter(parse_filter(text));
        self
    }

    pub fn order_by(self, field: &impl FieldRef<T>) -> Self {
        self.order_by_path(field.path(), false)
    }

    pub fn order_by_descending(self, field: &impl FieldRef<T>) -> Self {
        self.order_by_path(field.path(), true)
    }

    /// Orders by a raw field path. Replaces any earlier ordering.
    pub fn order_by_path(mut self, path: impl Into<String>, descending: bool) -> Self {
        self.state.plan.order = Some(OrderSpec {
            path: path.into(),
            descending,
        });
        self
    }

    /// Requests a relationship be loaded with each record.
    ///
    /// Any explicit include replaces the includes derived from filters.
    pub fn include(self, relation: &impl FieldRef<T>) -> Self {
        self.include_path(relation.path())
    }

    pub fn include_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.state.plan.includes.contains(&path) {
            self.state.plan.includes.push(path);
        }
        self
    }

    /// Leaves includes to the server.
    pub fn auto_include(mut self) -> Self {
        self.state.plan.auto_include = true;
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.state.plan.skip = Some(count);
        self
    }

    pub fn take(mut self, count: usize) -> Self {
        self.state.plan.take = Some(count);
        self
    }

    /// Sets a free-text search term. A non-blank term switches execution to
    /// the search endpoints, with the rest of the query as its base query.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.state.search_spec().term = term.into();
        self
    }

    /// Sets the fields the search term is matched against.
    pub fn in_fields(self, fields: &[&dyn FieldRef<T>]) -> Self {
        self.in_field_paths(fields.iter().map(|field| field.path().to_string()))
    }

    /// Appends one search field.
    pub fn also_in_field(mut self, field: &impl FieldRef<T>) -> Self {
        self.state.search_spec().fields.push(field.path().to_string());
        self
    }

    pub fn in_field_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.search_spec().fields = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn case_sensitivity(mut self, case_sensitivity: CaseSensitivity) -> Self {
        self.state.plan.case_sensitivity = case_sensitivity;
        self
    }

    /// Sends this query to another base URL.
    pub fn at_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.state.plan.base_url = Some(base_url.into());
        self
    }

    /// Matches records both queries match. Filters from `other` are
    /// appended; everything else comes from `self`.
    pub fn and(mut self, other: QueryBuilder<T>) -> Self {
        self.state.plan.filters.extend(other.state.plan.filters);
        if let Some(err) = other.state.pending {
            self.state.fail(err);
        }
        self
    }

    /// Matches records either query matches. Everything except the filters
    /// comes from `self`.
    pub fn or(mut self, other: QueryBuilder<T>) -> Self {
        let left = std::mem::take(&mut self.state.plan.filters);
        let right = other.state.plan.filters;
        if !unfiltered(&left) && !unfiltered(&right) {
            self.state.plan.filters = vec![FilterDescriptor::or(vec![
                conjunction(left),
                conjunction(right),
            ])];
        }
        if let Some(err) = other.state.pending {
            self.state.fail(err);
        }
        self
    }

    /// Projects each record into `R` on the server.
    pub fn select<R>(mut self, projection: Projection) -> SelectQueryBuilder<T, R> {
        self.state.plan.projection = Some(projection);
        SelectQueryBuilder {
            state: self.state,
            _marker: PhantomData,
        }
    }

    /// The plain-query payload, without sending it.
    pub fn to_query_request(&self) -> Result<QueryRequest> {
        self.state.query_request()
    }

    /// The search payload, or `None` without an active search term.
    pub fn to_search_request(&self) -> Result<Option<SearchRequest>> {
        self.state.search_request()
    }

    /// The endpoint variant this query would be sent to.
    pub fn operation(&self, paged: bool) -> Operation {
        self.state.operation(paged)
    }

    /// The full endpoint URL this query would be posted to.
    pub fn endpoint(&self, paged: bool) -> String {
        self.state.endpoint(paged)
    }

    /// Evaluates the query against local records.
    ///
    /// # Errors
    ///
    /// Fails for search queries, which only the endpoint can evaluate.
    pub fn preview<'a>(&self, records: &'a [T]) -> Result<Vec<&'a T>>
    where
        T: Record,
    {
        self.state.check()?;
        Ok(self.state.plan.preview(records)?)
    }
}

impl<T: DeserializeOwned> QueryBuilder<T> {
    /// Runs the query and returns every matching record.
    pub async fn to_list(&self) -> Result<Vec<T>> {
        debug!(record = %self.state.type_name, "running list query");
        self.state.dispatch(false).await
    }

    /// Runs the query and returns one page with the server's total count.
    pub async fn to_paged_result(&self) -> Result<PagedResult<T>> {
        debug!(record = %self.state.type_name, "running paged query");
        self.state.dispatch(true).await
    }
}

impl<T> Clone for QueryBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for QueryBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("type_name", &self.state.type_name)
            .field("plan", &self.state.plan)
            .field("pending", &self.state.pending)
            .finish()
    }
}

/// A side without a leaf or relationship matches everything.
fn unfiltered(filters: &[FilterDescriptor]) -> bool {
    filters.iter().all(FilterDescriptor::is_vacuous)
}

fn conjunction(mut filters: Vec<FilterDescriptor>) -> FilterDescriptor {
    if filters.len() == 1 {
        filters.remove(0)
    } else {
        FilterDescriptor::and(filters)
    }
}

// ==================== SelectQueryBuilder ====================

/// A query over `T` whose results are projected into `R`.
pub struct SelectQueryBuilder<T, R> {
    state: QueryState,
    _marker: PhantomData<fn(&T) -> R>,
}

impl<T, R> SelectQueryBuilder<T, R> {
    fn map(self, step: impl FnOnce(QueryBuilder<T>) -> QueryBuilder<T>) -> Self {
        let builder = step(QueryBuilder {
            state: self.state,
            _marker: PhantomData,
        });
        Self {
            state: builder.state,
            _marker: PhantomData,
        }
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.state.plan
    }

    #[doc(alias = "where")]
    pub fn filter(self, condition: Condition<T>) -> Self {
        self.map(|q| q.filter(condition))
    }

    pub fn filter_expr(self, expr: Expr) -> Self {
        self.map(|q| q.filter_expr(expr))
    }

    pub fn filter_text(self, text: &str) -> Self {
        self.map(|q| q.filter_text(text))
    }

    pub fn order_by(self, field: &impl FieldRef<T>) -> Self {
        self.map(|q| q.order_by(field))
    }

    pub fn order_by_descending(self, field: &impl FieldRef<T>) -> Self {
        self.map(|q| q.order_by_descending(field))
    }

    pub fn include(self, relation: &impl FieldRef<T>) -> Self {
        self.map(|q| q.include(relation))
    }

    pub fn skip(self, count: usize) -> Self {
        self.map(|q| q.skip(count))
    }

    pub fn take(self, count: usize) -> Self {
        self.map(|q| q.take(count))
    }

    pub fn search(self, term: impl Into<String>) -> Self {
        self.map(|q| q.search(term))
    }

    pub fn in_fields(self, fields: &[&dyn FieldRef<T>]) -> Self {
        self.map(|q| q.in_fields(fields))
    }

    pub fn also_in_field(self, field: &impl FieldRef<T>) -> Self {
        self.map(|q| q.also_in_field(field))
    }

    pub fn in_field_paths<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|q| q.in_field_paths(paths))
    }

    pub fn filter_descriptor(self, filter: FilterDescriptor) -> Self {
        self.map(|q| q.filter_descriptor(filter))
    }

    pub fn order_by_path(self, path: impl Into<String>, descending: bool) -> Self {
        self.map(|q| q.order_by_path(path, descending))
    }

    pub fn include_path(self, path: impl Into<String>) -> Self {
        self.map(|q| q.include_path(path))
    }

    pub fn auto_include(self) -> Self {
        self.map(QueryBuilder::auto_include)
    }

    pub fn case_sensitivity(self, case_sensitivity: CaseSensitivity) -> Self {
        self.map(|q| q.case_sensitivity(case_sensitivity))
    }

    pub fn at_base_url(self, base_url: impl Into<String>) -> Self {
        self.map(|q| q.at_base_url(base_url))
    }

    pub fn to_query_request(&self) -> Result<QueryRequest> {
        self.state.query_request()
    }

    pub fn to_search_request(&self) -> Result<Option<SearchRequest>> {
        self.state.search_request()
    }

    pub fn operation(&self, paged: bool) -> Operation {
        self.state.operation(paged)
    }

    pub fn endpoint(&self, paged: bool) -> String {
        self.state.endpoint(paged)
    }
}

impl<T, R: DeserializeOwned> SelectQueryBuilder<T, R> {
    pub async fn to_list(&self) -> Result<Vec<R>> {
        debug!(record = %self.state.type_name, "running select query");
        self.state.dispatch(false).await
    }

    pub async fn to_paged_result(&self) -> Result<PagedResult<R>> {
        debug!(record = %self.state.type_name, "running paged select query");
        self.state.dispatch(true).await
    }
}

impl<T, R> Clone for SelectQueryBuilder<T, R> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
