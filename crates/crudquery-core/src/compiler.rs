//! Compiles filter trees into in-process predicates.
//!
//! Property paths are resolved through the record's [`Schema`](crate::Schema)
//! when the predicate is built, so an unknown field fails here rather than on
//! the first record.
//!
//! # Example
//!
//! ```
//! # use std::sync::OnceLock;
//! # use crudquery_core::{Record, Schema};
//! # struct Cliente { nombre: String }
//! # impl Record for Cliente {
//! #     fn schema() -> &'static Schema<Self> {
//! #         static SCHEMA: OnceLock<Schema<Cliente>> = OnceLock::new();
//! #         SCHEMA.get_or_init(|| Schema::builder("Cliente").scalar("Nombre", |c: &Cliente| &c.nombre).build())
//! #     }
//! # }
//! use crudquery_core::{compile, CaseSensitivity, FilterDescriptor, Operator};
//!
//! let filter = FilterDescriptor::leaf("Nombre", Operator::Contains, "ana");
//! let predicate = compile::<Cliente>(&filter, CaseSensitivity::CaseInsensitive).unwrap();
//!
//! let clientes = vec![
//!     Cliente { nombre: "Mariana".to_string() },
//!     Cliente { nombre: "Pedro".to_string() },
//! ];
//! let matched = predicate.filter(&clientes);
//! assert_eq!(matched.len(), 1);
//! assert_eq!(matched[0].nombre, "Mariana");
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::descriptor::{leaf_operand, FilterDescriptor, NodeKind};
use crate::error::{CompileResult, InvalidFilterError};
use crate::operator::{Cardinality, CaseSensitivity, LogicalOperator, Operator};
use crate::schema::{Member, Record, Relation, ScalarAccess};
use crate::value::{Value, ValueKind, ValueRef};

/// Reads an owned ordering key out of a record.
pub(crate) type SortKey<T> = Arc<dyn Fn(&T) -> Option<Value> + Send + Sync>;

/// An executable filter over records of type `T`.
pub struct Predicate<T> {
    test: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

impl<T: 'static> Predicate<T> {
    pub(crate) fn new(test: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            test: Arc::new(test),
        }
    }

    /// A predicate that matches every record.
    pub fn always() -> Self {
        Self::new(|_: &T| true)
    }

    /// Returns true if `record` satisfies the filter.
    pub fn matches(&self, record: &T) -> bool {
        (self.test)(record)
    }

    /// Returns the records that satisfy the filter, in input order.
    pub fn filter<'a>(&self, records: &'a [T]) -> Vec<&'a T> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    pub(crate) fn not(self) -> Self {
        Self::new(move |record: &T| !self.matches(record))
    }

    fn all(mut parts: Vec<Predicate<T>>) -> Self {
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Self::new(move |record: &T| parts.iter().all(|p| p.matches(record)))
    }

    fn any(mut parts: Vec<Predicate<T>>) -> Self {
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Self::new(move |record: &T| parts.iter().any(|p| p.matches(record)))
    }
}

/// Compiles a single filter tree.
///
/// A vacuous tree (no leaf or relationship anywhere) matches every record.
pub fn compile<T: Record>(
    filter: &FilterDescriptor,
    case: CaseSensitivity,
) -> CompileResult<Predicate<T>> {
    compile_all(std::slice::from_ref(filter), case)
}

/// Compiles a list of filter trees combined with AND.
pub fn compile_all<T: Record>(
    filters: &[FilterDescriptor],
    case: CaseSensitivity,
) -> CompileResult<Predicate<T>> {
    match compile_nested::<T>(filters, case)? {
        Some(predicate) => Ok(predicate),
        None => {
            trace!(record = T::schema().name(), "vacuous filter matches all records");
            Ok(Predicate::always())
        }
    }
}

/// Compiles the non-vacuous `filters` combined with AND, or `None` if there
/// are none.
pub(crate) fn compile_nested<T: Record>(
    filters: &[FilterDescriptor],
    case: CaseSensitivity,
) -> CompileResult<Option<Predicate<T>>> {
    let parts = filters
        .iter()
        .filter(|f| !f.is_vacuous())
        .map(|f| compile_node::<T>(f, case))
        .collect::<CompileResult<Vec<_>>>()?;
    Ok(if parts.is_empty() {
        None
    } else {
        Some(Predicate::all(parts))
    })
}

fn compile_node<T: Record>(
    node: &FilterDescriptor,
    case: CaseSensitivity,
) -> CompileResult<Predicate<T>> {
    let predicate = match node.kind()? {
        NodeKind::Empty => Predicate::always(),
        NodeKind::Group {
            logical_operator,
            children,
        } => {
            let parts = children
                .iter()
                .filter(|c| !c.is_vacuous())
                .map(|c| compile_node::<T>(c, case))
                .collect::<CompileResult<Vec<_>>>()?;
            if parts.is_empty() {
                Predicate::always()
            } else {
                match logical_operator {
                    LogicalOperator::And => Predicate::all(parts),
                    LogicalOperator::Or => Predicate::any(parts),
                }
            }
        }
        NodeKind::Leaf {
            property,
            operator,
            value,
        } => {
            let segments: Vec<&str> = property.split('.').collect();
            let leaf = LeafSpec {
                path: property,
                operator,
                value,
                case,
            };
            leaf_on::<T>(&segments, &leaf)?
        }
        NodeKind::Relationship {
            path,
            cardinality,
            nested,
        } => {
            let segments: Vec<&str> = path.split('.').collect();
            let scope = ScopeSpec {
                path: &path,
                cardinality,
                nested,
                case,
            };
            scope_on::<T>(&segments, &scope)?
        }
    };
    Ok(if node.negate {
        predicate.not()
    } else {
        predicate
    })
}

/// A leaf being resolved one path segment at a time.
pub(crate) struct LeafSpec<'a> {
    /// Full dotted path, for error messages.
    pub path: &'a str,
    pub operator: Operator,
    pub value: Option<&'a Value>,
    pub case: CaseSensitivity,
}

impl LeafSpec<'_> {
    /// True when the leaf matches an absent value.
    pub fn is_null_test(&self) -> bool {
        match self.operator {
            Operator::IsNull => true,
            Operator::Equals => matches!(self.value, Some(Value::Null)),
            _ => false,
        }
    }
}

/// A relationship node being resolved one path segment at a time.
pub(crate) struct ScopeSpec<'a> {
    pub path: &'a str,
    pub cardinality: Cardinality,
    pub nested: &'a [FilterDescriptor],
    pub case: CaseSensitivity,
}

fn split_path<'s, 'a>(segments: &'s [&'a str]) -> CompileResult<(&'a str, &'s [&'a str])> {
    segments
        .split_first()
        .map(|(head, rest)| (*head, rest))
        .ok_or_else(|| InvalidFilterError::malformed("empty property path"))
}

pub(crate) fn leaf_on<T: Record>(
    segments: &[&str],
    leaf: &LeafSpec<'_>,
) -> CompileResult<Predicate<T>> {
    let schema = T::schema();
    let (head, rest) = split_path(segments)?;
    match schema.member(head)? {
        Member::Scalar(field) if rest.is_empty() => scalar_leaf(field.as_ref(), leaf),
        Member::Scalar(_) => Err(InvalidFilterError::NotARelationship {
            path: head.to_string(),
            record: schema.name(),
        }),
        Member::Relation(relation) if rest.is_empty() => presence_leaf(relation.as_ref(), leaf),
        Member::Relation(relation) => relation.leaf(rest, leaf),
    }
}

pub(crate) fn scope_on<T: Record>(
    segments: &[&str],
    scope: &ScopeSpec<'_>,
) -> CompileResult<Predicate<T>> {
    let schema = T::schema();
    let (head, rest) = split_path(segments)?;
    match schema.member(head)? {
        Member::Scalar(_) => Err(InvalidFilterError::NotARelationship {
            path: head.to_string(),
            record: schema.name(),
        }),
        Member::Relation(relation) => relation.scope(rest, scope),
    }
}

/// Resolves a dotted path to an ordering key.
pub(crate) fn key_on<T: Record>(segments: &[&str], path: &str) -> CompileResult<SortKey<T>> {
    let schema = T::schema();
    let (head, rest) = split_path(segments)?;
    match schema.member(head)? {
        Member::Scalar(field) if rest.is_empty() => {
            let field: &'static dyn ScalarAccess<T> = field.as_ref();
            Ok(Arc::new(move |record: &T| {
                field.read(record).map(|v| v.to_owned_value())
            }))
        }
        Member::Scalar(_) => Err(InvalidFilterError::NotARelationship {
            path: head.to_string(),
            record: schema.name(),
        }),
        Member::Relation(relation) if rest.is_empty() => Err(InvalidFilterError::malformed(
            format!("cannot order by relation '{}'", relation.name()),
        )),
        Member::Relation(relation) => relation.key(rest, path),
    }
}

/// A leaf on a relation itself tests whether the relation is set. A
/// collection is never null.
fn presence_leaf<T: Record>(
    relation: &'static dyn Relation<T>,
    leaf: &LeafSpec<'_>,
) -> CompileResult<Predicate<T>> {
    let not_applicable = || InvalidFilterError::OperatorNotApplicable {
        property: leaf.path.to_string(),
        operator: leaf.operator,
        target: match relation.cardinality() {
            Cardinality::One => "relation".to_string(),
            Cardinality::Many => "collection".to_string(),
        },
    };
    let operand = match leaf.operator {
        Operator::IsNull | Operator::IsNotNull | Operator::Equals | Operator::NotEquals => {
            leaf_operand(leaf.path, leaf.operator, leaf.value)?
        }
        _ => return Err(not_applicable()),
    };
    let present = match (leaf.operator, operand) {
        (Operator::IsNotNull, None) | (Operator::NotEquals, Some(Value::Null)) => true,
        (Operator::IsNull, None) | (Operator::Equals, Some(Value::Null)) => false,
        _ => return Err(not_applicable()),
    };
    Ok(match relation.cardinality() {
        Cardinality::One => Predicate::new(move |record: &T| relation.is_present(record) == present),
        Cardinality::Many => Predicate::new(move |_: &T| present),
    })
}

/// The test applied to a terminal scalar.
enum ScalarTest {
    Null,
    NotNull,
    /// Null text reads as `""`.
    Text {
        operator: Operator,
        operand: String,
        fold: bool,
    },
    /// Null values never match.
    Compare { operator: Operator, operand: Value },
}

fn scalar_leaf<T: Record>(
    field: &'static dyn ScalarAccess<T>,
    leaf: &LeafSpec<'_>,
) -> CompileResult<Predicate<T>> {
    let kind = field.kind();
    let operator = leaf.operator;
    if !operator.accepts(kind) {
        return Err(InvalidFilterError::OperatorNotApplicable {
            property: leaf.path.to_string(),
            operator,
            target: kind.name().to_string(),
        });
    }
    let fold = kind == ValueKind::Text && leaf.case == CaseSensitivity::CaseInsensitive;

    let test = match leaf_operand(leaf.path, operator, leaf.value)? {
        None | Some(Value::Null) => match operator {
            Operator::IsNull | Operator::Equals => ScalarTest::Null,
            Operator::IsNotNull | Operator::NotEquals => ScalarTest::NotNull,
            Operator::IsEmpty => ScalarTest::Text {
                operator: Operator::Equals,
                operand: String::new(),
                fold: false,
            },
            _ => ScalarTest::Text {
                operator: Operator::NotEquals,
                operand: String::new(),
                fold: false,
            },
        },
        Some(value) => {
            let coerced = value
                .coerce(kind)
                .ok_or_else(|| InvalidFilterError::ValueMismatch {
                    property: leaf.path.to_string(),
                    expected: kind,
                    value: value.to_literal(),
                })?;
            match coerced {
                Value::Text(text) => ScalarTest::Text {
                    operator,
                    operand: if fold { text.to_lowercase() } else { text },
                    fold,
                },
                operand => ScalarTest::Compare { operator, operand },
            }
        }
    };

    Ok(Predicate::new(move |record: &T| {
        let value = field.read(record);
        match &test {
            ScalarTest::Null => value.is_none(),
            ScalarTest::NotNull => value.is_some(),
            ScalarTest::Text {
                operator,
                operand,
                fold,
            } => {
                let text = match value {
                    Some(ValueRef::Text(s)) => s,
                    _ => "",
                };
                let text = if *fold {
                    Cow::Owned(text.to_lowercase())
                } else {
                    Cow::Borrowed(text)
                };
                text_matches(*operator, &text, operand)
            }
            ScalarTest::Compare { operator, operand } => value
                .and_then(|v| v.compare(operand))
                .is_some_and(|ordering| ordering_matches(*operator, ordering)),
        }
    }))
}

fn text_matches(operator: Operator, text: &str, operand: &str) -> bool {
    match operator {
        Operator::Contains => text.contains(operand),
        Operator::DoesNotContain => !text.contains(operand),
        Operator::StartsWith => text.starts_with(operand),
        Operator::EndsWith => text.ends_with(operand),
        other => ordering_matches(other, text.cmp(operand)),
    }
}

fn ordering_matches(operator: Operator, ordering: Ordering) -> bool {
    match operator {
        Operator::Equals => ordering == Ordering::Equal,
        Operator::NotEquals => ordering != Ordering::Equal,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::LessThanOrEquals => ordering != Ordering::Greater,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::GreaterThanOrEquals => ordering != Ordering::Less,
        _ => false,
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
