//! The accumulated state of one query.
//!
//! A [`QueryPlan`] is plain data: builders produce it, the client turns it
//! into a wire request, and [`QueryPlan::preview`] can run it against local
//! records for validation.

use crate::compiler::{compile_all, key_on, Predicate};
use crate::descriptor::FilterDescriptor;
use crate::error::{CompileResult, InvalidFilterError};
use crate::includes::derive_includes;
use crate::operator::CaseSensitivity;
use crate::projection::Projection;
use crate::schema::Record;
use crate::serialize::serialize_with;
use crate::value::Value;

/// Ordering by one field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub path: String,
    pub descending: bool,
}

impl OrderSpec {
    pub fn ascending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            descending: false,
        }
    }

    pub fn descending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            descending: true,
        }
    }

    /// Renders `"path"` or `"path desc"`.
    pub fn render(&self) -> String {
        if self.descending {
            format!("{} desc", self.path)
        } else {
            self.path.clone()
        }
    }
}

/// A free-text search across field paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSpec {
    pub term: String,
    pub fields: Vec<String>,
}

/// Everything a query has accumulated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Filter trees, AND-combined.
    pub filters: Vec<FilterDescriptor>,
    pub order: Option<OrderSpec>,
    pub search: Option<SearchSpec>,
    pub projection: Option<Projection>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
    /// Explicit include paths. Empty means "derive from the filters".
    pub includes: Vec<String>,
    /// Leave includes to the server.
    pub auto_include: bool,
    pub case_sensitivity: CaseSensitivity,
    /// Overrides the client's base URL for this query only.
    pub base_url: Option<String>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the filters under the plan's case sensitivity, or `None`
    /// when there is nothing to filter on.
    pub fn filter_string(&self) -> CompileResult<Option<String>> {
        serialize_with(&self.filters, self.case_sensitivity)
    }

    pub fn order_string(&self) -> Option<String> {
        self.order.as_ref().map(OrderSpec::render)
    }

    pub fn select_string(&self) -> Option<String> {
        self.projection.as_ref().and_then(Projection::render)
    }

    /// The include list to send.
    ///
    /// `None` with `auto_include`, or when neither explicit nor derived
    /// includes exist. Explicit includes win over derived ones.
    pub fn include_paths(&self) -> Option<Vec<String>> {
        if self.auto_include {
            return None;
        }
        let paths = if self.includes.is_empty() {
            derive_includes(&self.filters)
        } else {
            self.includes.clone()
        };
        (!paths.is_empty()).then_some(paths)
    }

    /// The search spec, if its term is not blank.
    pub fn active_search(&self) -> Option<&SearchSpec> {
        self.search
            .as_ref()
            .filter(|search| !search.term.trim().is_empty())
    }

    /// Compiles the filters against `T`.
    pub fn compile<T: Record>(&self) -> CompileResult<Predicate<T>> {
        compile_all(&self.filters, self.case_sensitivity)
    }

    /// Runs the plan against local records: filter, stable order with nulls
    /// first, then skip and take.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFilterError::SearchNotLocal`] if a search term is set,
    /// and any error the filters or the order path raise while compiling.
    ///
    /// # Example
    ///
    /// ```
    /// # use std::sync::OnceLock;
    /// # use crudquery_core::{Record, Schema};
    /// use crudquery_core::{FilterDescriptor, Operator, OrderSpec, QueryPlan};
    ///
    /// # struct Item { n: i32 }
    /// # impl Record for Item {
    /// #     fn schema() -> &'static Schema<Self> {
    /// #         static S: OnceLock<Schema<Item>> = OnceLock::new();
    /// #         S.get_or_init(|| Schema::builder("Item").scalar("N", |i: &Item| &i.n).build())
    /// #     }
    /// # }
    /// let items: Vec<Item> = (1..=5).map(|n| Item { n }).collect();
    /// let plan = QueryPlan {
    ///     filters: vec![FilterDescriptor::leaf("N", Operator::GreaterThan, 1)],
    ///     order: Some(OrderSpec::descending("N")),
    ///     take: Some(2),
    ///     ..QueryPlan::default()
    /// };
    /// let picked: Vec<i32> = plan.preview(&items).unwrap().iter().map(|i| i.n).collect();
    /// assert_eq!(picked, vec![5, 4]);
    /// ```
    pub fn preview<'a, T: Record>(&self, records: &'a [T]) -> CompileResult<Vec<&'a T>> {
        if self.active_search().is_some() {
            return Err(InvalidFilterError::SearchNotLocal);
        }
        let predicate = self.compile::<T>()?;
        let mut matched = predicate.filter(records);

        if let Some(order) = &self.order {
            let segments: Vec<&str> = order.path.split('.').collect();
            let key = key_on::<T>(&segments, &order.path)?;
            let mut keyed: Vec<(Value, &'a T)> = matched
                .into_iter()
                .map(|record| (key(record).unwrap_or(Value::Null), record))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = a.sort_cmp(b);
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
            matched = keyed.into_iter().map(|(_, record)| record).collect();
        }

        Ok(matched
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.take.unwrap_or(usize::MAX))
            .collect())
    }
}
