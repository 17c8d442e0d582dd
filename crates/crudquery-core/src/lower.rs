//! Lowers an [`Expr`] into a [`FilterDescriptor`].
//!
//! Only the shapes the filter tree can express are accepted:
//!
//! ```text
//! a && b, a || b           -> And / Or groups, flattened
//! member op constant       -> leaf (constant op member is mirrored)
//! member == null           -> IsNull, and != null -> IsNotNull
//! member == ""             -> IsEmpty, and != "" -> IsNotEmpty
//! member.Contains(c)       -> Contains, also StartsWith and EndsWith
//! !member.Contains(c)      -> DoesNotContain
//! !e                       -> e with negate toggled
//! member                   -> member == true
//! new [..].Contains(member)-> Or of Equals
//! member.Any()             -> Many relationship, non-empty
//! member.Any(x => body)    -> Many relationship scoped to body
//! ```
//!
//! [`lower_folded`] also accepts `member.ToLower()` wherever a member is
//! compared with text, and reports which case mode the text was written in.
//!
//! Anything else raises [`UnsupportedExpressionError`] naming the node.

use crate::descriptor::FilterDescriptor;
use crate::error::UnsupportedExpressionError;
use crate::expr::{BinaryOp, Expr};
use crate::operator::{CaseSensitivity, LogicalOperator, Operator};
use crate::value::Value;

type LowerResult<T> = std::result::Result<T, UnsupportedExpressionError>;

/// Lowers a boolean expression. A top-level lambda `p => body` lowers its
/// body with members rooted at `p`.
///
/// ```
/// use crudquery_core::{lower, BinaryOp, Expr, FilterDescriptor, Operator};
///
/// let expr = Expr::binary(BinaryOp::Gt, Expr::constant(100), Expr::member("Precio"));
/// assert_eq!(
///     lower(&expr).unwrap(),
///     FilterDescriptor::leaf("Precio", Operator::LessThan, 100),
/// );
/// ```
pub fn lower(expr: &Expr) -> LowerResult<FilterDescriptor> {
    match expr {
        Expr::Lambda { param, body } => Scope::root().enter(param).lower(body),
        other => Scope::root().lower(other),
    }
}

/// A lowered filter and the case mode its text comparisons were written in.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredFilter {
    pub filter: FilterDescriptor,
    /// `CaseInsensitive` when every text comparison is on `member.ToLower()`,
    /// `CaseSensitive` when none is, and `None` without text to compare.
    pub case_sensitivity: Option<CaseSensitivity>,
}

/// Lowers an expression that may compare `member.ToLower()` with lowercase
/// text, the form [`serialize_with`](crate::serialize_with) writes when case
/// is ignored.
///
/// ```
/// use crudquery_core::{lower_folded, CaseSensitivity, Expr, FilterDescriptor, Operator};
///
/// let expr = Expr::call(
///     Expr::call(Expr::member("Nombre"), "ToLower", vec![]),
///     "Contains",
///     vec![Expr::constant("ana")],
/// );
/// let lowered = lower_folded(&expr).unwrap();
/// assert_eq!(lowered.filter, FilterDescriptor::leaf("Nombre", Operator::Contains, "ana"));
/// assert_eq!(lowered.case_sensitivity, Some(CaseSensitivity::CaseInsensitive));
/// ```
pub fn lower_folded(expr: &Expr) -> LowerResult<LoweredFilter> {
    let mut folding = Folding::default();
    let plain = folding.strip(expr)?;
    Ok(LoweredFilter {
        filter: lower(&plain)?,
        case_sensitivity: folding.case_sensitivity()?,
    })
}

/// Which kinds of text comparison a stripped expression held.
#[derive(Default)]
struct Folding {
    folded: bool,
    exact: bool,
}

impl Folding {
    /// Rewrites `member.ToLower()` operands back to `member`.
    fn strip(&mut self, expr: &Expr) -> LowerResult<Expr> {
        Ok(match expr {
            Expr::Binary { op, left, right } if op.is_comparison() => {
                let (left, left_folded) = unfold(left);
                let (right, right_folded) = unfold(right);
                let (left, right) = (self.strip(&left)?, self.strip(&right)?);
                self.record(
                    left_folded || right_folded,
                    literals(&left).iter().chain(literals(&right)),
                )?;
                Expr::binary(*op, left, right)
            }
            Expr::Binary { op, left, right } => {
                Expr::binary(*op, self.strip(left)?, self.strip(right)?)
            }
            Expr::Not(inner) => Expr::negate(self.strip(inner)?),
            Expr::Call {
                target,
                method,
                args,
            } if method != "ToLower" => {
                let (target, mut folded) = unfold(target);
                let target = self.strip(&target)?;
                let mut stripped = Vec::with_capacity(args.len());
                for arg in args {
                    let (arg, arg_folded) = unfold(arg);
                    folded |= arg_folded;
                    stripped.push(self.strip(&arg)?);
                }
                self.record(
                    folded,
                    literals(&target)
                        .iter()
                        .chain(stripped.iter().flat_map(literals)),
                )?;
                Expr::call(target, method.clone(), stripped)
            }
            Expr::Lambda { param, body } => Expr::lambda(param.clone(), self.strip(body)?),
            other => other.clone(),
        })
    }

    fn record<'e>(
        &mut self,
        folded: bool,
        values: impl IntoIterator<Item = &'e Value>,
    ) -> LowerResult<()> {
        let mut compared_text = false;
        for value in values {
            let Value::Text(text) = value else {
                continue;
            };
            compared_text = true;
            if text.is_empty() {
                continue;
            }
            if !folded {
                self.exact = true;
            } else if text.to_lowercase() == *text {
                self.folded = true;
            } else {
                return Err(UnsupportedExpressionError::new(format!(
                    "ToLower() compared with non-lowercase text {}",
                    value.to_literal()
                )));
            }
        }
        if folded && !compared_text {
            return Err(UnsupportedExpressionError::new(
                "ToLower() compared with a non-text value",
            ));
        }
        Ok(())
    }

    fn case_sensitivity(&self) -> LowerResult<Option<CaseSensitivity>> {
        match (self.folded, self.exact) {
            (true, true) => Err(UnsupportedExpressionError::new(
                "mixed ToLower() and exact text comparisons",
            )),
            (true, false) => Ok(Some(CaseSensitivity::CaseInsensitive)),
            (false, true) => Ok(Some(CaseSensitivity::CaseSensitive)),
            (false, false) => Ok(None),
        }
    }
}

/// `member.ToLower()` is `member`, flagged as folded.
fn unfold(expr: &Expr) -> (Expr, bool) {
    match expr {
        Expr::Call {
            target,
            method,
            args,
        } if method == "ToLower" && args.is_empty() => match target.as_ref() {
            member @ Expr::Member(_) => (member.clone(), true),
            _ => (expr.clone(), false),
        },
        other => (other.clone(), false),
    }
}

fn literals(expr: &Expr) -> &[Value] {
    match expr {
        Expr::Constant(value) => std::slice::from_ref(value),
        Expr::Array(values) => values,
        _ => &[],
    }
}

/// The lambda parameters in scope, innermost last.
struct Scope<'a> {
    params: Vec<&'a str>,
}

impl<'a> Scope<'a> {
    fn root() -> Self {
        Self { params: Vec::new() }
    }

    fn enter<'b>(&self, param: &'b str) -> Scope<'b>
    where
        'a: 'b,
    {
        let mut params: Vec<&'b str> = self.params.clone();
        params.push(param);
        Scope { params }
    }

    /// Resolves a member path relative to the innermost parameter.
    fn path(&self, raw: &str) -> LowerResult<String> {
        let Some(param) = self.params.last() else {
            return Ok(raw.to_string());
        };
        match raw.strip_prefix(*param).and_then(|rest| rest.strip_prefix('.')) {
            Some(rest) if !rest.is_empty() => Ok(rest.to_string()),
            _ => {
                let head = raw.split('.').next().unwrap_or(raw);
                if self.params.iter().rev().skip(1).any(|outer| *outer == head) {
                    Err(UnsupportedExpressionError::new(format!(
                        "outer member reference '{raw}'"
                    )))
                } else {
                    Err(UnsupportedExpressionError::new(format!(
                        "member '{raw}' outside lambda '{param}'"
                    )))
                }
            }
        }
    }

    fn lower(&self, expr: &Expr) -> LowerResult<FilterDescriptor> {
        match expr {
            Expr::Binary { op, left, right } => match op {
                BinaryOp::AndAlso => self.group(LogicalOperator::And, left, right),
                BinaryOp::OrElse => self.group(LogicalOperator::Or, left, right),
                op if op.is_comparison() => self.comparison(*op, left, right),
                _ => Err(UnsupportedExpressionError::new(expr.describe())),
            },
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Call {
                    target,
                    method,
                    args,
                } if method == "Contains" && matches!(target.as_ref(), Expr::Member(_)) => {
                    let leaf = self.method_leaf(Operator::Contains, target, args, inner)?;
                    Ok(FilterDescriptor {
                        operator: Some(Operator::DoesNotContain),
                        ..leaf
                    })
                }
                other => Ok(self.lower(other)?.negated()),
            },
            Expr::Member(raw) => Ok(FilterDescriptor::leaf(
                self.path(raw)?,
                Operator::Equals,
                true,
            )),
            Expr::Call {
                target,
                method,
                args,
            } => self.call(expr, target, method, args),
            Expr::Constant(_) | Expr::Array(_) | Expr::Lambda { .. } => {
                Err(UnsupportedExpressionError::new(expr.describe()))
            }
        }
    }

    fn group(
        &self,
        logical_operator: LogicalOperator,
        left: &Expr,
        right: &Expr,
    ) -> LowerResult<FilterDescriptor> {
        let mut children = Vec::new();
        for side in [left, right] {
            let child = self.lower(side)?;
            let same_group = child.operator.is_none()
                && child.property.is_none()
                && !child.children.is_empty()
                && !child.negate
                && child.logical_operator == logical_operator;
            if same_group {
                children.extend(child.children);
            } else {
                children.push(child);
            }
        }
        Ok(FilterDescriptor::group(logical_operator, children))
    }

    fn comparison(&self, op: BinaryOp, left: &Expr, right: &Expr) -> LowerResult<FilterDescriptor> {
        let operator = comparison_operator(op);
        let (raw, operator, value) = match (left, right) {
            (Expr::Member(raw), Expr::Constant(value)) => (raw, operator, value),
            (Expr::Constant(value), Expr::Member(raw)) => (raw, operator.flipped(), value),
            (Expr::Member(a), Expr::Member(b)) => {
                return Err(UnsupportedExpressionError::new(format!(
                    "member comparison '{a} {} {b}'",
                    op.token()
                )))
            }
            (Expr::Constant(_), Expr::Constant(_)) => {
                return Err(UnsupportedExpressionError::new(format!(
                    "constant comparison '{}'",
                    op.token()
                )))
            }
            (Expr::Member(_) | Expr::Constant(_), other) | (other, _) => {
                return Err(UnsupportedExpressionError::new(other.describe()))
            }
        };
        let property = self.path(raw)?;

        Ok(match (operator, value) {
            (Operator::Equals, Value::Null) => FilterDescriptor::check(property, Operator::IsNull),
            (Operator::NotEquals, Value::Null) => {
                FilterDescriptor::check(property, Operator::IsNotNull)
            }
            (_, Value::Null) => {
                return Err(UnsupportedExpressionError::new(format!(
                    "comparison '{}' with null",
                    op.token()
                )))
            }
            (Operator::Equals, Value::Text(s)) if s.is_empty() => {
                FilterDescriptor::check(property, Operator::IsEmpty)
            }
            (Operator::NotEquals, Value::Text(s)) if s.is_empty() => {
                FilterDescriptor::check(property, Operator::IsNotEmpty)
            }
            (operator, value) => FilterDescriptor::leaf(property, operator, value.clone()),
        })
    }

    fn call(
        &self,
        expr: &Expr,
        target: &Expr,
        method: &str,
        args: &[Expr],
    ) -> LowerResult<FilterDescriptor> {
        match (method, target) {
            ("Contains", Expr::Array(values)) => self.membership(values, args, expr),
            ("Contains", Expr::Member(_)) => self.method_leaf(Operator::Contains, target, args, expr),
            ("StartsWith", Expr::Member(_)) => {
                self.method_leaf(Operator::StartsWith, target, args, expr)
            }
            ("EndsWith", Expr::Member(_)) => self.method_leaf(Operator::EndsWith, target, args, expr),
            ("Any", Expr::Member(raw)) => self.any(raw, args, expr),
            _ => Err(UnsupportedExpressionError::new(expr.describe())),
        }
    }

    fn method_leaf(
        &self,
        operator: Operator,
        target: &Expr,
        args: &[Expr],
        expr: &Expr,
    ) -> LowerResult<FilterDescriptor> {
        match (target, args) {
            (Expr::Member(raw), [Expr::Constant(value)]) if !value.is_null() => Ok(
                FilterDescriptor::leaf(self.path(raw)?, operator, value.clone()),
            ),
            _ => Err(UnsupportedExpressionError::new(expr.describe())),
        }
    }

    /// `new [a, b].Contains(member)` is `member == a || member == b`.
    fn membership(
        &self,
        values: &[Value],
        args: &[Expr],
        expr: &Expr,
    ) -> LowerResult<FilterDescriptor> {
        let [Expr::Member(raw)] = args else {
            return Err(UnsupportedExpressionError::new(expr.describe()));
        };
        if values.is_empty() {
            return Err(UnsupportedExpressionError::new("empty array membership"));
        }
        let property = self.path(raw)?;
        let children = values
            .iter()
            .map(|value| match value {
                Value::Null => FilterDescriptor::check(property.clone(), Operator::IsNull),
                value => FilterDescriptor::leaf(property.clone(), Operator::Equals, value.clone()),
            })
            .collect();
        Ok(FilterDescriptor::or(children))
    }

    fn any(&self, raw: &str, args: &[Expr], expr: &Expr) -> LowerResult<FilterDescriptor> {
        let path = self.path(raw)?;
        match args {
            [] => Ok(FilterDescriptor::any(path, Vec::new())),
            [Expr::Lambda { param, body }] => {
                let nested = self.enter(param).lower(body)?;
                let nested = if is_plain_and(&nested) {
                    nested.children
                } else {
                    vec![nested]
                };
                Ok(FilterDescriptor::any(path, nested))
            }
            _ => Err(UnsupportedExpressionError::new(expr.describe())),
        }
    }
}

/// Nested filters are AND-combined, so a plain AND group can be spread.
fn is_plain_and(node: &FilterDescriptor) -> bool {
    node.operator.is_none()
        && node.property.is_none()
        && !node.children.is_empty()
        && !node.negate
        && node.logical_operator == LogicalOperator::And
}

fn comparison_operator(op: BinaryOp) -> Operator {
    match op {
        BinaryOp::Ne => Operator::NotEquals,
        BinaryOp::Lt => Operator::LessThan,
        BinaryOp::Le => Operator::LessThanOrEquals,
        BinaryOp::Gt => Operator::GreaterThan,
        BinaryOp::Ge => Operator::GreaterThanOrEquals,
        _ => Operator::Equals,
    }
}
