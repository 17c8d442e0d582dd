//! Error types for filter compilation, serialization and query text parsing.

use thiserror::Error;

use crate::operator::Operator;
use crate::value::ValueKind;

/// A specialized Result type for compiling and serializing filters.
pub type CompileResult<T> = std::result::Result<T, InvalidFilterError>;

/// A specialized Result type for parsing query text.
pub type ParseResult<T> = std::result::Result<T, QueryParseError>;

/// A structurally malformed filter tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidFilterError {
    /// A property path segment does not exist on the record type.
    #[error("unknown property '{property}' on {record}{}", suggestion_suffix(.suggestion))]
    UnknownProperty {
        property: String,
        record: &'static str,
        /// The closest known field name, if one is similar enough.
        suggestion: Option<String>,
    },

    /// A relationship path segment names a scalar field.
    #[error("'{path}' on {record} is not a relationship")]
    NotARelationship { path: String, record: &'static str },

    /// A dotted property path crosses a collection.
    #[error("property path '{path}' crosses collection '{collection}'; filter it with a Many relationship")]
    CollectionInPath { path: String, collection: String },

    /// A comparison operator has no value.
    #[error("operator {operator} on '{property}' requires a value")]
    MissingValue { property: String, operator: Operator },

    /// A null or emptiness check carries a value.
    #[error("operator {operator} on '{property}' does not take a value")]
    UnexpectedValue { property: String, operator: Operator },

    /// The value cannot be read as the field's kind.
    #[error("value {value} is not a valid {expected} for '{property}'")]
    ValueMismatch {
        property: String,
        expected: ValueKind,
        value: String,
    },

    /// The operator does not apply to the field's kind.
    #[error("operator {operator} cannot be applied to {target} field '{property}'")]
    OperatorNotApplicable {
        property: String,
        operator: Operator,
        /// Field kind name, or `relation` / `collection`.
        target: String,
    },

    /// A node is neither a leaf, a group nor a relationship.
    #[error("malformed filter node: {reason}")]
    MalformedNode { reason: String },

    /// A plan with a search term was asked to evaluate locally.
    #[error("search queries are evaluated by the remote endpoint and cannot be previewed locally")]
    SearchNotLocal,
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

impl InvalidFilterError {
    /// Creates a malformed node error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        InvalidFilterError::MalformedNode {
            reason: reason.into(),
        }
    }

    /// Creates an unknown property error, suggesting the closest candidate.
    pub fn unknown_property<'a>(
        property: impl Into<String>,
        record: &'static str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let property = property.into();
        let suggestion = closest_match(&property, candidates);
        InvalidFilterError::UnknownProperty {
            property,
            record,
            suggestion,
        }
    }
}

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.8;

fn closest_match<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let lowered = name.to_lowercase();
    candidates
        .into_iter()
        .map(|c| (strsim::jaro_winkler(&lowered, &c.to_lowercase()), c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// A builder expression the serializer cannot render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported expression: {node}")]
pub struct UnsupportedExpressionError {
    /// Description of the offending node kind.
    pub node: String,
}

impl UnsupportedExpressionError {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

/// Errors that can occur while parsing query text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryParseError {
    /// The query text is empty.
    #[error("query expression is empty")]
    EmptyExpression,

    /// An unexpected token was encountered.
    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    /// The input ended in the middle of an expression.
    #[error("unexpected end of expression")]
    UnexpectedEndOfInput,

    /// An opening parenthesis or bracket was never closed.
    #[error("unclosed parenthesis")]
    UnclosedParenthesis,

    /// A string literal is missing its closing quote.
    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    /// A numeric literal could not be parsed.
    #[error("invalid number: {text}")]
    InvalidNumber { text: String },

    /// The argument of `DateTime.Parse` is not a recognized date.
    #[error("invalid date literal: {text}")]
    InvalidDate { text: String },

    /// A character that does not start any token.
    #[error("unknown character '{character}' at position {position}")]
    UnknownCharacter { character: char, position: usize },
}

impl QueryParseError {
    /// Creates an unexpected token error.
    pub fn unexpected_token(token: impl Into<String>, position: usize) -> Self {
        QueryParseError::UnexpectedToken {
            token: token.into(),
            position,
        }
    }

    /// Creates an invalid number error.
    pub fn invalid_number(text: impl Into<String>) -> Self {
        QueryParseError::InvalidNumber { text: text.into() }
    }
}

/// Any local error raised by this crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilterError),

    #[error(transparent)]
    UnsupportedExpression(#[from] UnsupportedExpressionError),

    #[error(transparent)]
    Parse(#[from] QueryParseError),
}

/// A specialized Result type for operations that may fail with any local error.
pub type Result<T> = std::result::Result<T, Error>;
