//! Typed field selectors and conditions.
//!
//! Declare one constant per field next to the record type, then build
//! conditions from them. Text operations are only available on text fields,
//! and ordering comparisons only on orderable ones.
//!
//! ```
//! use crudquery_core::{lower, Collection, Field, FilterDescriptor, Operator};
//!
//! struct Etiqueta;
//! struct Producto;
//!
//! const NOMBRE: Field<Producto, String> = Field::new("Nombre");
//! const PRECIO: Field<Producto, f64> = Field::new("Precio");
//! const ETIQUETAS: Collection<Producto, Etiqueta> = Collection::new("Etiquetas");
//! const ETIQUETA_NOMBRE: Field<Etiqueta, String> = Field::new("Nombre");
//!
//! let condition = PRECIO.gt(100) & (NOMBRE.contains("ana") | ETIQUETAS.any(ETIQUETA_NOMBRE.eq("oferta")));
//! let filter = lower(condition.expr()).unwrap();
//! assert_eq!(filter.children[0], FilterDescriptor::leaf("Precio", Operator::GreaterThan, 100.0));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, Not};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::expr::{BinaryOp, Expr};
use crate::value::Value;

/// Marker for field value types that support text operations.
pub trait TextLike {}

impl TextLike for String {}

/// Marker for field value types that support `<`, `<=`, `>`, `>=`.
pub trait Orderable {}

macro_rules! orderable {
    ($($ty:ty),* $(,)?) => {
        $(impl Orderable for $ty {})*
    };
}

orderable!(i32, i64, u32, f64, String, NaiveDateTime, NaiveDate, DateTime<Utc>);

/// Anything that names a field path on `T`.
pub trait FieldRef<T> {
    fn path(&self) -> &str;
}

// ==================== Field ====================

fn to_value<V: Into<Value>, X: Into<V>>(value: X) -> Value {
    let value: V = value.into();
    value.into()
}

/// A field of `T` holding values of type `V`.
///
/// `V` may also be a related record type, in which case the field is a
/// reference that can be extended with [`Field::then`].
pub struct Field<T, V> {
    path: Cow<'static, str>,
    _marker: PhantomData<fn(&T) -> V>,
}

impl<T, V> Field<T, V> {
    pub const fn new(path: &'static str) -> Self {
        Self {
            path: Cow::Borrowed(path),
            _marker: PhantomData,
        }
    }

    /// Extends this reference field with a field of the related record.
    pub fn then<W>(&self, next: &Field<V, W>) -> Field<T, W> {
        Field {
            path: Cow::Owned(format!("{}.{}", self.path, next.path)),
            _marker: PhantomData,
        }
    }

    /// Extends this reference field with a collection of the related record.
    pub fn then_collection<W>(&self, next: &Collection<V, W>) -> Collection<T, W> {
        Collection {
            path: Cow::Owned(format!("{}.{}", self.path, next.path)),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn member(&self) -> Expr {
        Expr::member(self.path.as_ref())
    }

    fn compare(&self, op: BinaryOp, value: Value) -> Condition<T> {
        Condition::new(Expr::binary(op, self.member(), Expr::Constant(value)))
    }

    pub fn is_null(&self) -> Condition<T> {
        self.compare(BinaryOp::Eq, Value::Null)
    }

    pub fn is_not_null(&self) -> Condition<T> {
        self.compare(BinaryOp::Ne, Value::Null)
    }
}

impl<T, V: Into<Value>> Field<T, V> {
    pub fn eq(&self, value: impl Into<V>) -> Condition<T> {
        self.compare(BinaryOp::Eq, to_value::<V, _>(value))
    }

    pub fn ne(&self, value: impl Into<V>) -> Condition<T> {
        self.compare(BinaryOp::Ne, to_value::<V, _>(value))
    }

    /// Matches when the field equals any of `values`.
    pub fn is_in<I, X>(&self, values: I) -> Condition<T>
    where
        I: IntoIterator<Item = X>,
        X: Into<V>,
    {
        let values = values.into_iter().map(|v| to_value::<V, X>(v)).collect();
        Condition::new(Expr::call(Expr::Array(values), "Contains", vec![self.member()]))
    }
}

impl<T, V: Into<Value> + Orderable> Field<T, V> {
    pub fn lt(&self, value: impl Into<V>) -> Condition<T> {
        self.compare(BinaryOp::Lt, to_value::<V, _>(value))
    }

    pub fn le(&self, value: impl Into<V>) -> Condition<T> {
        self.compare(BinaryOp::Le, to_value::<V, _>(value))
    }

    pub fn gt(&self, value: impl Into<V>) -> Condition<T> {
        self.compare(BinaryOp::Gt, to_value::<V, _>(value))
    }

    pub fn ge(&self, value: impl Into<V>) -> Condition<T> {
        self.compare(BinaryOp::Ge, to_value::<V, _>(value))
    }
}

impl<T, V: Into<Value> + TextLike> Field<T, V> {
    fn method(&self, method: &str, value: impl Into<V>) -> Condition<T> {
        Condition::new(Expr::call(
            self.member(),
            method,
            vec![Expr::Constant(to_value::<V, _>(value))],
        ))
    }

    pub fn contains(&self, value: impl Into<V>) -> Condition<T> {
        self.method("Contains", value)
    }

    pub fn does_not_contain(&self, value: impl Into<V>) -> Condition<T> {
        !self.method("Contains", value)
    }

    pub fn starts_with(&self, value: impl Into<V>) -> Condition<T> {
        self.method("StartsWith", value)
    }

    pub fn ends_with(&self, value: impl Into<V>) -> Condition<T> {
        self.method("EndsWith", value)
    }

    pub fn is_empty(&self) -> Condition<T> {
        self.compare(BinaryOp::Eq, Value::Text(String::new()))
    }

    pub fn is_not_empty(&self) -> Condition<T> {
        self.compare(BinaryOp::Ne, Value::Text(String::new()))
    }
}

impl<T> Field<T, bool> {
    /// The field itself as a condition.
    pub fn is_true(&self) -> Condition<T> {
        Condition::new(self.member())
    }
}

impl<T, V> Clone for Field<T, V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, V> fmt::Debug for Field<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.path).finish()
    }
}

impl<T, V> FieldRef<T> for Field<T, V> {
    fn path(&self) -> &str {
        &self.path
    }
}

impl<T, V> From<Field<T, V>> for String {
    fn from(field: Field<T, V>) -> Self {
        field.path.into_owned()
    }
}

// ==================== Collection ====================

/// A collection of `U` records owned by `T`.
pub struct Collection<T, U> {
    path: Cow<'static, str>,
    _marker: PhantomData<fn(&T) -> U>,
}

impl<T, U> Collection<T, U> {
    pub const fn new(path: &'static str) -> Self {
        Self {
            path: Cow::Borrowed(path),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Matches when any element satisfies `condition`.
    pub fn any(&self, condition: Condition<U>) -> Condition<T> {
        let param = format!("x{}", lambda_depth(&condition.expr) + 1);
        let body = condition.expr.rebase(&param);
        Condition::new(Expr::call(
            Expr::member(self.path.as_ref()),
            "Any",
            vec![Expr::lambda(param, body)],
        ))
    }

    /// Matches when the collection has at least one element.
    pub fn exists(&self) -> Condition<T> {
        Condition::new(Expr::call(Expr::member(self.path.as_ref()), "Any", vec![]))
    }
}

impl<T, U> Clone for Collection<T, U> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, U> fmt::Debug for Collection<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Collection").field(&self.path).finish()
    }
}

impl<T, U> FieldRef<T> for Collection<T, U> {
    fn path(&self) -> &str {
        &self.path
    }
}

/// Deepest lambda nesting inside `expr`, so an enclosing `Any` can pick an
/// unused parameter name.
fn lambda_depth(expr: &Expr) -> usize {
    match expr {
        Expr::Lambda { body, .. } => 1 + lambda_depth(body),
        Expr::Binary { left, right, .. } => lambda_depth(left).max(lambda_depth(right)),
        Expr::Not(inner) => lambda_depth(inner),
        Expr::Call { target, args, .. } => args
            .iter()
            .map(lambda_depth)
            .fold(lambda_depth(target), usize::max),
        Expr::Member(_) | Expr::Constant(_) | Expr::Array(_) => 0,
    }
}

// ==================== Condition ====================

/// A boolean condition over `T`.
pub struct Condition<T> {
    expr: Expr,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Condition<T> {
    fn new(expr: Expr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    pub fn and(self, other: Condition<T>) -> Condition<T> {
        Condition::new(Expr::and(self.expr, other.expr))
    }

    pub fn or(self, other: Condition<T>) -> Condition<T> {
        Condition::new(Expr::or(self.expr, other.expr))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<T> Clone for Condition<T> {
    fn clone(&self) -> Self {
        Condition::new(self.expr.clone())
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.expr).finish()
    }
}

impl<T> fmt::Display for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.expr, f)
    }
}

impl<T> Not for Condition<T> {
    type Output = Condition<T>;

    fn not(self) -> Self::Output {
        Condition::new(Expr::negate(self.expr))
    }
}

impl<T> BitAnd for Condition<T> {
    type Output = Condition<T>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl<T> BitOr for Condition<T> {
    type Output = Condition<T>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}
