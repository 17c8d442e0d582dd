//! A general boolean expression tree over record members.
//!
//! [`Expr`] is what typed builder conditions and parsed query text produce.
//! It is wider than the filter tree: it can represent arithmetic, member to
//! member comparisons and arbitrary method calls. [`lower`](crate::lower)
//! narrows it to a [`FilterDescriptor`](crate::FilterDescriptor) or reports
//! the first unsupported node.

use std::fmt;

use crate::value::Value;

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // ==================== Comparison ====================
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // ==================== Logical ====================
    AndAlso,
    OrElse,

    // ==================== Arithmetic ====================
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    /// Returns the infix token.
    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide
        )
    }

    /// Binding strength used when printing; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            BinaryOp::OrElse => 1,
            BinaryOp::AndAlso => 2,
            op if op.is_comparison() => 3,
            _ => 4,
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A dotted member path, such as `Region.Nombre` or `x1.Nombre`.
    Member(String),
    Constant(Value),
    /// A literal list, the target of collection-membership `Contains`.
    Array(Vec<Value>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    /// `target.method(args)`.
    Call {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// `param => body`.
    Lambda { param: String, body: Box<Expr> },
}

impl Expr {
    pub fn member(path: impl Into<String>) -> Self {
        Expr::Member(path.into())
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::AndAlso, left, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::OrElse, left, right)
    }

    pub fn negate(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    pub fn call(target: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: Box::new(target),
            method: method.into(),
            args,
        }
    }

    pub fn lambda(param: impl Into<String>, body: Expr) -> Self {
        Expr::Lambda {
            param: param.into(),
            body: Box::new(body),
        }
    }

    /// Describes the node kind for error messages.
    pub fn describe(&self) -> String {
        match self {
            Expr::Member(path) => format!("member '{path}'"),
            Expr::Constant(value) => format!("constant {}", value.to_literal()),
            Expr::Array(_) => "array literal".to_string(),
            Expr::Binary { op, .. } if op.is_arithmetic() => {
                format!("arithmetic '{}'", op.token())
            }
            Expr::Binary { op, .. } => format!("binary '{}'", op.token()),
            Expr::Not(_) => "negation".to_string(),
            Expr::Call { method, .. } => format!("method call '{method}'"),
            Expr::Lambda { param, .. } => format!("lambda '{param} => ...'"),
        }
    }

    /// Rewrites every member path rooted at nothing onto `param`.
    ///
    /// Used to move a record-level condition inside an `Any` lambda.
    pub fn rebase(self, param: &str) -> Expr {
        match self {
            Expr::Member(path) => Expr::Member(format!("{param}.{path}")),
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(left.rebase(param)),
                right: Box::new(right.rebase(param)),
            },
            Expr::Not(inner) => Expr::Not(Box::new(inner.rebase(param))),
            Expr::Call {
                target,
                method,
                args,
            } => Expr::Call {
                target: Box::new(target.rebase(param)),
                method,
                args: args.into_iter().map(|a| a.rebase(param)).collect(),
            },
            // Inner lambdas already scope their own members.
            other => other,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::Member(path) => f.write_str(path),
            Expr::Constant(value) => f.write_str(&value.to_literal()),
            Expr::Array(values) => {
                f.write_str("new [")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&value.to_literal())?;
                }
                f.write_str("]")
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                if prec < parent {
                    f.write_str("(")?;
                }
                left.fmt_prec(f, prec)?;
                write!(f, " {} ", op.token())?;
                // Left-associative: a same-precedence right child needs parens.
                right.fmt_prec(f, prec + 1)?;
                if prec < parent {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Expr::Not(inner) => {
                f.write_str("!")?;
                inner.fmt_prec(f, 5)
            }
            Expr::Call {
                target,
                method,
                args,
            } => {
                target.fmt_prec(f, 6)?;
                write!(f, ".{method}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    arg.fmt_prec(f, 0)?;
                }
                f.write_str(")")
            }
            Expr::Lambda { param, body } => {
                if parent > 0 {
                    f.write_str("(")?;
                }
                write!(f, "{param} => ")?;
                body.fmt_prec(f, 0)?;
                if parent > 0 {
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

/// Prints the expression in query text syntax.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
