//! The composite filter tree exchanged with filter UIs.
//!
//! A [`FilterDescriptor`] is one of three node shapes:
//!
//! - a **leaf** comparing `property` with `value` through `operator`,
//! - a **group** folding `children` with `logicalOperator`,
//! - a **relationship** scoping `nestedFilters` to a related record.
//!
//! The JSON form uses camelCase keys:
//!
//! ```
//! use crudquery_core::{FilterDescriptor, Operator};
//!
//! let json = r#"{
//!     "relationshipPath": "Region",
//!     "operator": "Related",
//!     "nestedFilters": [
//!         { "property": "Nombre", "operator": "Equals", "value": "Norte" }
//!     ]
//! }"#;
//! let filter: FilterDescriptor = serde_json::from_str(json).unwrap();
//! assert_eq!(filter, FilterDescriptor::related(
//!     "Region",
//!     vec![FilterDescriptor::leaf("Nombre", Operator::Equals, "Norte")],
//! ));
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{CompileResult, InvalidFilterError};
use crate::operator::{Cardinality, LogicalOperator, OperandShape, Operator};
use crate::value::Value;

/// A node of a filter tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    /// Dot-separated field path of a leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// How `children` are combined.
    #[serde(default)]
    pub logical_operator: LogicalOperator,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FilterDescriptor>,

    /// Navigated relation of a `Related` node. May be dotted for multi-hop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_path: Option<String>,

    /// Filters evaluated against the related record, AND-combined.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_filters: Vec<FilterDescriptor>,

    /// Inverts the node.
    #[serde(default, skip_serializing_if = "is_false")]
    pub negate: bool,

    /// Whether a `Related` node targets one record or a collection.
    #[serde(default, skip_serializing_if = "is_one")]
    pub cardinality: Cardinality,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_one(c: &Cardinality) -> bool {
    *c == Cardinality::One
}

/// The classified shape of a [`FilterDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'a> {
    Leaf {
        property: &'a str,
        operator: Operator,
        value: Option<&'a Value>,
    },
    Group {
        logical_operator: LogicalOperator,
        children: &'a [FilterDescriptor],
    },
    Relationship {
        path: Cow<'a, str>,
        cardinality: Cardinality,
        nested: &'a [FilterDescriptor],
    },
    /// No property, operator or children.
    Empty,
}

impl FilterDescriptor {
    /// Creates a leaf comparing `property` with `value`.
    pub fn leaf(property: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            property: Some(property.into()),
            operator: Some(operator),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Creates a leaf for an operator that takes no value, such as `IsNull`.
    pub fn check(property: impl Into<String>, operator: Operator) -> Self {
        Self {
            property: Some(property.into()),
            operator: Some(operator),
            ..Self::default()
        }
    }

    /// Creates a group folding `children` with `logical_operator`.
    pub fn group(logical_operator: LogicalOperator, children: Vec<FilterDescriptor>) -> Self {
        Self {
            logical_operator,
            children,
            ..Self::default()
        }
    }

    /// Creates an AND group.
    pub fn and(children: Vec<FilterDescriptor>) -> Self {
        Self::group(LogicalOperator::And, children)
    }

    /// Creates an OR group.
    ///
    /// # Example
    ///
    /// ```
    /// use crudquery_core::{FilterDescriptor, LogicalOperator, Operator};
    ///
    /// let filter = FilterDescriptor::or(vec![
    ///     FilterDescriptor::leaf("Precio", Operator::GreaterThan, 100),
    ///     FilterDescriptor::leaf("Stock", Operator::Equals, 0),
    /// ]);
    /// assert_eq!(filter.logical_operator, LogicalOperator::Or);
    /// ```
    pub fn or(children: Vec<FilterDescriptor>) -> Self {
        Self::group(LogicalOperator::Or, children)
    }

    /// Creates a relationship node scoping `nested` to the record at `path`.
    pub fn related(path: impl Into<String>, nested: Vec<FilterDescriptor>) -> Self {
        Self {
            operator: Some(Operator::Related),
            relationship_path: Some(path.into()),
            nested_filters: nested,
            ..Self::default()
        }
    }

    /// Creates a collection relationship: any element at `path` matches `nested`.
    pub fn any(path: impl Into<String>, nested: Vec<FilterDescriptor>) -> Self {
        Self {
            cardinality: Cardinality::Many,
            ..Self::related(path, nested)
        }
    }

    /// Returns this node with `negate` toggled.
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Classifies this node.
    ///
    /// A `Related` node without a `relationshipPath` navigates the relation
    /// its `property` names. `RegionId` names the `Region` relation.
    pub fn kind(&self) -> CompileResult<NodeKind<'_>> {
        if self.operator == Some(Operator::Related) {
            if !self.children.is_empty() {
                return Err(InvalidFilterError::malformed(
                    "a Related node cannot also have children",
                ));
            }
            let path = match (&self.relationship_path, &self.property) {
                (Some(path), _) if !path.is_empty() => Cow::Borrowed(path.as_str()),
                (_, Some(property)) if !property.is_empty() => relation_for_property(property),
                _ => {
                    return Err(InvalidFilterError::malformed(
                        "a Related node needs a relationshipPath or property",
                    ))
                }
            };
            return Ok(NodeKind::Relationship {
                path,
                cardinality: self.cardinality,
                nested: &self.nested_filters,
            });
        }

        if !self.nested_filters.is_empty() {
            return Err(InvalidFilterError::malformed(
                "nestedFilters require the Related operator",
            ));
        }

        match (&self.property, self.operator, self.children.is_empty()) {
            (None, None, true) => Ok(NodeKind::Empty),
            (None, None, false) => Ok(NodeKind::Group {
                logical_operator: self.logical_operator,
                children: &self.children,
            }),
            (Some(property), Some(operator), true) if !property.is_empty() => Ok(NodeKind::Leaf {
                property,
                operator,
                value: self.value.as_ref(),
            }),
            (Some(_), Some(_), true) => Err(InvalidFilterError::malformed("empty property path")),
            (Some(property), None, true) => Err(InvalidFilterError::malformed(format!(
                "leaf '{property}' has no operator"
            ))),
            (None, Some(operator), true) => Err(InvalidFilterError::malformed(format!(
                "operator {operator} has no property"
            ))),
            (_, _, false) => Err(InvalidFilterError::malformed(
                "a group cannot also have a property or operator",
            )),
        }
    }

    /// Returns true if no leaf or relationship exists anywhere in this subtree.
    ///
    /// Malformed nodes are not vacuous, so they still surface as errors.
    pub fn is_vacuous(&self) -> bool {
        match self.kind() {
            Ok(NodeKind::Empty) => true,
            Ok(NodeKind::Group { children, .. }) => children.iter().all(Self::is_vacuous),
            _ => false,
        }
    }
}

/// Maps a `<Name>Id` property to its `<Name>` relation.
fn relation_for_property(property: &str) -> Cow<'_, str> {
    match property.strip_suffix("Id") {
        Some(name) if !name.is_empty() && !name.ends_with('.') => Cow::Borrowed(name),
        _ => Cow::Borrowed(property),
    }
}

/// Checks a leaf's value against its operator and returns the operand.
///
/// Valueless operators accept a missing value, an explicit `null`, or an
/// empty string as UIs commonly send. `Equals null` and `NotEquals null`
/// are allowed and behave as null checks.
pub(crate) fn leaf_operand<'a>(
    property: &str,
    operator: Operator,
    value: Option<&'a Value>,
) -> CompileResult<Option<&'a Value>> {
    match operator.shape() {
        OperandShape::Nested => Err(InvalidFilterError::malformed(format!(
            "'{property}' uses Related as a leaf operator"
        ))),
        OperandShape::Presence | OperandShape::TextPresence => match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(s)) if s.is_empty() => Ok(None),
            Some(_) => Err(InvalidFilterError::UnexpectedValue {
                property: property.to_string(),
                operator,
            }),
        },
        OperandShape::Equality => match value {
            Some(v) => Ok(Some(v)),
            None => Err(missing(property, operator)),
        },
        OperandShape::Ordering | OperandShape::Text => match value {
            Some(v) if !v.is_null() => Ok(Some(v)),
            _ => Err(missing(property, operator)),
        },
    }
}

fn missing(property: &str, operator: Operator) -> InvalidFilterError {
    InvalidFilterError::MissingValue {
        property: property.to_string(),
        operator,
    }
}
