//! Operator semantics: the closed set of filter operators and the operand
//! shape each one requires.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::ValueKind;

/// A filter leaf operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    /// Scopes `nestedFilters` to a related record.
    Related,
}

/// The operand shape an operator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// `==` / `!=` against a scalar of any kind.
    Equality,
    /// `<`, `<=`, `>`, `>=` against an orderable scalar.
    Ordering,
    /// Substring operators against a text value.
    Text,
    /// Emptiness checks on a text field; no value.
    TextPresence,
    /// Null checks on any field or relation; no value.
    Presence,
    /// A nested filter list scoped to a relation.
    Nested,
}

impl Operator {
    /// All operators, in declaration order.
    pub const ALL: [Operator; 15] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::LessThan,
        Operator::LessThanOrEquals,
        Operator::GreaterThan,
        Operator::GreaterThanOrEquals,
        Operator::Contains,
        Operator::DoesNotContain,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
        Operator::Related,
    ];

    /// Returns the operand shape this operator requires.
    pub fn shape(self) -> OperandShape {
        match self {
            Operator::Equals | Operator::NotEquals => OperandShape::Equality,
            Operator::LessThan
            | Operator::LessThanOrEquals
            | Operator::GreaterThan
            | Operator::GreaterThanOrEquals => OperandShape::Ordering,
            Operator::Contains
            | Operator::DoesNotContain
            | Operator::StartsWith
            | Operator::EndsWith => OperandShape::Text,
            Operator::IsEmpty | Operator::IsNotEmpty => OperandShape::TextPresence,
            Operator::IsNull | Operator::IsNotNull => OperandShape::Presence,
            Operator::Related => OperandShape::Nested,
        }
    }

    /// Returns true if a leaf with this operator must carry a `value`.
    pub fn requires_value(self) -> bool {
        matches!(
            self.shape(),
            OperandShape::Equality | OperandShape::Ordering | OperandShape::Text
        )
    }

    /// Returns true if this operator can be applied to a field of `kind`.
    pub fn accepts(self, kind: ValueKind) -> bool {
        match self.shape() {
            OperandShape::Equality | OperandShape::Presence => true,
            OperandShape::Ordering => kind.is_orderable(),
            OperandShape::Text | OperandShape::TextPresence => kind == ValueKind::Text,
            OperandShape::Nested => false,
        }
    }

    /// Returns true for the two null checks.
    pub fn is_null_check(self) -> bool {
        self.shape() == OperandShape::Presence
    }

    /// Returns the comparison symbol for infix operators.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Operator::Equals => Some("=="),
            Operator::NotEquals => Some("!="),
            Operator::LessThan => Some("<"),
            Operator::LessThanOrEquals => Some("<="),
            Operator::GreaterThan => Some(">"),
            Operator::GreaterThanOrEquals => Some(">="),
            _ => None,
        }
    }

    /// Returns the method name for method-call operators.
    pub fn method(self) -> Option<&'static str> {
        match self {
            Operator::Contains | Operator::DoesNotContain => Some("Contains"),
            Operator::StartsWith => Some("StartsWith"),
            Operator::EndsWith => Some("EndsWith"),
            _ => None,
        }
    }

    /// Returns the operator whose result is the logical complement, when one
    /// exists in the closed set without changing null semantics.
    pub fn complement(self) -> Option<Operator> {
        match self {
            Operator::Contains => Some(Operator::DoesNotContain),
            Operator::DoesNotContain => Some(Operator::Contains),
            Operator::IsNull => Some(Operator::IsNotNull),
            Operator::IsNotNull => Some(Operator::IsNull),
            Operator::IsEmpty => Some(Operator::IsNotEmpty),
            Operator::IsNotEmpty => Some(Operator::IsEmpty),
            _ => None,
        }
    }

    /// Mirrors an infix operator for `constant op member` rewrites.
    pub fn flipped(self) -> Operator {
        match self {
            Operator::LessThan => Operator::GreaterThan,
            Operator::LessThanOrEquals => Operator::GreaterThanOrEquals,
            Operator::GreaterThan => Operator::LessThan,
            Operator::GreaterThanOrEquals => Operator::LessThanOrEquals,
            other => other,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    #[serde(alias = "AND", alias = "and")]
    And,
    #[serde(alias = "OR", alias = "or")]
    Or,
}

impl LogicalOperator {
    /// Returns the infix token used in query text.
    pub fn token(self) -> &'static str {
        match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

/// Whether text comparisons fold case. Scoped to a whole query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaseSensitivity {
    CaseSensitive,
    #[default]
    CaseInsensitive,
}

/// Whether a relationship points at one record or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    #[default]
    One,
    Many,
}
