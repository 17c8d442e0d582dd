//! Request payloads and endpoint variants.

use crudquery_core::{CompileResult, QueryPlan};
use serde::{Deserialize, Serialize};

/// The endpoint variants a query can be dispatched to.
///
/// Each maps to `{base}/query/{TypeName}/{segment}`.
///
/// ```
/// use crudquery_client::models::Operation;
///
/// assert_eq!(Operation::resolve(true, true, true), Operation::SearchSelectPaged);
/// assert_eq!(Operation::SearchSelectPaged.segment(), "search-select-paged");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    Paged,
    Select,
    SelectPaged,
    Search,
    SearchPaged,
    SearchSelect,
    SearchSelectPaged,
}

impl Operation {
    /// Picks the variant for a query with or without a search term, a
    /// projection and paging.
    pub fn resolve(search: bool, select: bool, paged: bool) -> Self {
        match (search, select, paged) {
            (false, false, false) => Operation::Query,
            (false, false, true) => Operation::Paged,
            (false, true, false) => Operation::Select,
            (false, true, true) => Operation::SelectPaged,
            (true, false, false) => Operation::Search,
            (true, false, true) => Operation::SearchPaged,
            (true, true, false) => Operation::SearchSelect,
            (true, true, true) => Operation::SearchSelectPaged,
        }
    }

    /// The trailing endpoint path segment.
    pub fn segment(&self) -> &'static str {
        match self {
            Operation::Query => "query",
            Operation::Paged => "paged",
            Operation::Select => "select",
            Operation::SelectPaged => "select-paged",
            Operation::Search => "search",
            Operation::SearchPaged => "search-paged",
            Operation::SearchSelect => "search-select",
            Operation::SearchSelectPaged => "search-select-paged",
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(
            self,
            Operation::Search
                | Operation::SearchPaged
                | Operation::SearchSelect
                | Operation::SearchSelectPaged
        )
    }

    pub fn is_paged(&self) -> bool {
        matches!(
            self,
            Operation::Paged
                | Operation::SelectPaged
                | Operation::SearchPaged
                | Operation::SearchSelectPaged
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.segment())
    }
}

/// Payload of a plain query.
///
/// Absent parts are sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub select: Option<String>,
    pub include: Option<Vec<String>>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl TryFrom<&QueryPlan> for QueryRequest {
    type Error = crudquery_core::InvalidFilterError;

    fn try_from(plan: &QueryPlan) -> CompileResult<Self> {
        Ok(Self {
            filter: plan.filter_string()?,
            order_by: plan.order_string(),
            select: plan.select_string(),
            include: plan.include_paths(),
            skip: plan.skip,
            take: plan.take,
        })
    }
}

/// Payload of a search query.
///
/// The endpoint decides how `search_term` is matched across `search_fields`
/// and combined with `base_query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_term: String,
    /// Empty means the entity's default search fields.
    pub search_fields: Vec<String>,
    pub base_query: QueryRequest,
}

impl SearchRequest {
    /// Builds the search payload, or `None` when the plan has no active
    /// search term.
    pub fn from_plan(plan: &QueryPlan) -> CompileResult<Option<Self>> {
        let Some(search) = plan.active_search() else {
            return Ok(None);
        };
        Ok(Some(Self {
            search_term: search.term.clone(),
            search_fields: search.fields.clone(),
            base_query: QueryRequest::try_from(plan)?,
        }))
    }
}
