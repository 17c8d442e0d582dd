//! Renders filter trees into query text for the remote evaluator.
//!
//! ```
//! use crudquery_core::{serialize, FilterDescriptor, Operator};
//!
//! let filters = vec![FilterDescriptor::related(
//!     "Region",
//!     vec![FilterDescriptor::leaf("Nombre", Operator::Equals, "Norte")],
//! )];
//! assert_eq!(
//!     serialize(&filters).unwrap().as_deref(),
//!     Some(r#"Region != null && Region.Nombre == "Norte""#)
//! );
//! ```

use crate::descriptor::{leaf_operand, FilterDescriptor, NodeKind};
use crate::error::{CompileResult, InvalidFilterError};
use crate::operator::{Cardinality, CaseSensitivity, LogicalOperator, Operator};
use crate::value::{Value, ValueKind};

/// Serializes top-level filter trees, joined with ` && `, with text
/// compared exactly as written.
///
/// Returns `None` when nothing is left after pruning vacuous trees, so the
/// caller omits the filter rather than sending an empty clause.
pub fn serialize(filters: &[FilterDescriptor]) -> CompileResult<Option<String>> {
    serialize_with(filters, CaseSensitivity::CaseSensitive)
}

/// Serializes a single filter tree with text compared as written.
pub fn serialize_filter(filter: &FilterDescriptor) -> CompileResult<Option<String>> {
    serialize(std::slice::from_ref(filter))
}

/// Serializes top-level filter trees under `case`.
///
/// With [`CaseSensitivity::CaseInsensitive`] every leaf with a text operand
/// compares `{member}.ToLower()` against the lowercased text, so the remote
/// evaluator folds case the same way [`compile`](crate::compile) does.
///
/// ```
/// use crudquery_core::{serialize_with, CaseSensitivity, FilterDescriptor, Operator};
///
/// let filters = vec![FilterDescriptor::leaf("Nombre", Operator::Contains, "Ana")];
/// assert_eq!(
///     serialize_with(&filters, CaseSensitivity::CaseInsensitive).unwrap().as_deref(),
///     Some(r#"Nombre.ToLower().Contains("ana")"#)
/// );
/// ```
pub fn serialize_with(
    filters: &[FilterDescriptor],
    case: CaseSensitivity,
) -> CompileResult<Option<String>> {
    let scope = Scope::root(case == CaseSensitivity::CaseInsensitive);
    let parts = render_all(filters, &scope)?;
    Ok(if parts.is_empty() {
        None
    } else {
        Some(parts.join(" && "))
    })
}

/// Serializes a single filter tree under `case`.
pub fn serialize_filter_with(
    filter: &FilterDescriptor,
    case: CaseSensitivity,
) -> CompileResult<Option<String>> {
    serialize_with(std::slice::from_ref(filter), case)
}

/// Path prefix and lambda depth of the node being rendered.
struct Scope {
    prefix: Option<String>,
    depth: usize,
    /// Text operands compare lowercased.
    fold: bool,
}

impl Scope {
    fn root(fold: bool) -> Self {
        Self {
            prefix: None,
            depth: 0,
            fold,
        }
    }

    fn nested(&self, prefix: String, depth: usize) -> Self {
        Self {
            prefix: Some(prefix),
            depth,
            fold: self.fold,
        }
    }

    fn qualify(&self, path: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{path}"),
            None => path.to_string(),
        }
    }
}

fn render_all(nodes: &[FilterDescriptor], scope: &Scope) -> CompileResult<Vec<String>> {
    let mut parts = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Some(part) = render(node, scope)? {
            parts.push(part);
        }
    }
    Ok(parts)
}

fn render(node: &FilterDescriptor, scope: &Scope) -> CompileResult<Option<String>> {
    let kind = node.kind()?;
    let parenthesized = matches!(kind, NodeKind::Group { .. });
    let rendered = match kind {
        NodeKind::Empty => return Ok(None),
        NodeKind::Group {
            logical_operator,
            children,
        } => {
            let parts = render_all(children, scope)?;
            if parts.is_empty() {
                return Ok(None);
            }
            let separator = match logical_operator {
                LogicalOperator::And => " && ",
                LogicalOperator::Or => " || ",
            };
            format!("({})", parts.join(separator))
        }
        NodeKind::Leaf {
            property,
            operator,
            value,
        } => render_leaf(&scope.qualify(property), property, operator, value, scope.fold)?,
        NodeKind::Relationship {
            path,
            cardinality,
            nested,
        } => render_relationship(&path, cardinality, nested, scope)?,
    };
    Ok(Some(match (node.negate, parenthesized) {
        (false, _) => rendered,
        (true, true) => format!("!{rendered}"),
        (true, false) => format!("!({rendered})"),
    }))
}

fn render_leaf(
    target: &str,
    property: &str,
    operator: Operator,
    value: Option<&Value>,
    fold: bool,
) -> CompileResult<String> {
    let (target, operand) = match leaf_operand(property, operator, value)? {
        Some(Value::Text(text)) if fold => (
            format!("{target}.ToLower()"),
            Value::Text(text.to_lowercase()).to_literal(),
        ),
        Some(value) => (target.to_string(), literal(property, value)?),
        None => (target.to_string(), String::new()),
    };
    Ok(match operator {
        Operator::IsNull => format!("{target} == null"),
        Operator::IsNotNull => format!("{target} != null"),
        Operator::IsEmpty => format!("{target} == \"\""),
        Operator::IsNotEmpty => format!("{target} != \"\""),
        Operator::DoesNotContain => format!("!{target}.Contains({operand})"),
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            let method = operator.method().unwrap_or_default();
            format!("{target}.{method}({operand})")
        }
        _ => {
            let symbol = operator.symbol().unwrap_or_default();
            format!("{target} {symbol} {operand}")
        }
    })
}

fn literal(property: &str, value: &Value) -> CompileResult<String> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(InvalidFilterError::ValueMismatch {
            property: property.to_string(),
            expected: ValueKind::Float,
            value: f.to_string(),
        }),
        other => Ok(other.to_literal()),
    }
}

/// Renders `path != null` guards for every hop of `path`, then the nested
/// filters with the path prefixed onto them.
fn render_relationship(
    path: &str,
    cardinality: Cardinality,
    nested: &[FilterDescriptor],
    scope: &Scope,
) -> CompileResult<String> {
    let target = scope.qualify(path);
    let mut parts = Vec::new();
    let mut hop = String::new();
    for segment in path.split('.') {
        if !hop.is_empty() {
            hop.push('.');
        }
        hop.push_str(segment);
        parts.push(format!("{} != null", scope.qualify(&hop)));
    }

    match cardinality {
        Cardinality::One => {
            let inner = scope.nested(target, scope.depth);
            parts.extend(render_all(nested, &inner)?);
        }
        Cardinality::Many => {
            let param = format!("x{}", scope.depth + 1);
            let inner = scope.nested(param.clone(), scope.depth + 1);
            let body = render_all(nested, &inner)?;
            if body.is_empty() {
                parts.push(format!("{target}.Any()"));
            } else {
                parts.push(format!("{target}.Any({param} => {})", body.join(" && ")));
            }
        }
    }
    Ok(parts.join(" && "))
}
