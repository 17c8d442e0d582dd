//! Per-type accessor maps used to resolve property paths.
//!
//! A record type describes its filterable fields once, in a static, by
//! implementing [`Record`]:
//!
//! ```
//! use std::sync::OnceLock;
//! use crudquery_core::{Record, Schema};
//!
//! struct Region {
//!     nombre: String,
//! }
//!
//! struct Producto {
//!     nombre: String,
//!     stock: i32,
//!     region: Option<Region>,
//! }
//!
//! impl Record for Region {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: OnceLock<Schema<Region>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::builder("Region")
//!                 .scalar("Nombre", |r: &Region| &r.nombre)
//!                 .build()
//!         })
//!     }
//! }
//!
//! impl Record for Producto {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: OnceLock<Schema<Producto>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::builder("Producto")
//!                 .scalar("Nombre", |p: &Producto| &p.nombre)
//!                 .scalar("Stock", |p: &Producto| &p.stock)
//!                 .reference("Region", |p: &Producto| p.region.as_ref())
//!                 .build()
//!         })
//!     }
//! }
//!
//! assert_eq!(Producto::schema().name(), "Producto");
//! ```

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::compiler::{self, LeafSpec, Predicate, ScopeSpec, SortKey};
use crate::error::{CompileResult, InvalidFilterError};
use crate::operator::Cardinality;
use crate::value::{ValueKind, ValueRef};

/// A record type with a static field schema.
pub trait Record: Sized + Send + Sync + 'static {
    /// Returns the schema describing this type's filterable fields.
    fn schema() -> &'static Schema<Self>;
}

/// A type that can back a scalar field.
pub trait ScalarField: Send + Sync + 'static {
    /// The kind leaf values are coerced to.
    const KIND: ValueKind;
    /// Whether the field can hold no value.
    const NULLABLE: bool = false;

    /// Reads the field, returning `None` for an absent value.
    fn read(&self) -> Option<ValueRef<'_>>;
}

macro_rules! scalar_field {
    ($ty:ty, $kind:ident, |$v:ident| $read:expr) => {
        impl ScalarField for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn read(&self) -> Option<ValueRef<'_>> {
                let $v = self;
                Some($read)
            }
        }
    };
}

scalar_field!(String, Text, |v| ValueRef::Text(v.as_str()));
scalar_field!(bool, Bool, |v| ValueRef::Bool(*v));
scalar_field!(i32, Int, |v| ValueRef::Int(i64::from(*v)));
scalar_field!(i64, Int, |v| ValueRef::Int(*v));
scalar_field!(u32, Int, |v| ValueRef::Int(i64::from(*v)));
scalar_field!(f64, Float, |v| ValueRef::Float(*v));
scalar_field!(NaiveDateTime, DateTime, |v| ValueRef::DateTime(*v));
scalar_field!(NaiveDate, DateTime, |v| ValueRef::DateTime(
    v.and_time(NaiveTime::MIN)
));
scalar_field!(DateTime<Utc>, DateTime, |v| ValueRef::DateTime(v.naive_utc()));
scalar_field!(Uuid, Guid, |v| ValueRef::Guid(*v));

impl<V: ScalarField> ScalarField for Option<V> {
    const KIND: ValueKind = V::KIND;
    const NULLABLE: bool = true;

    fn read(&self) -> Option<ValueRef<'_>> {
        self.as_ref().and_then(V::read)
    }
}

/// Type-erased read access to one scalar field of `T`.
pub(crate) trait ScalarAccess<T>: Send + Sync {
    fn kind(&self) -> ValueKind;
    fn nullable(&self) -> bool;
    fn read<'a>(&self, record: &'a T) -> Option<ValueRef<'a>>;
}

struct ScalarGetter<T, V> {
    get: fn(&T) -> &V,
}

impl<T, V: ScalarField> ScalarAccess<T> for ScalarGetter<T, V> {
    fn kind(&self) -> ValueKind {
        V::KIND
    }

    fn nullable(&self) -> bool {
        V::NULLABLE
    }

    fn read<'a>(&self, record: &'a T) -> Option<ValueRef<'a>> {
        (self.get)(record).read()
    }
}

/// Type-erased navigation from `T` to a related record type.
///
/// Implementations compile the remainder of a path against the target
/// type's own schema and wrap the result with the navigation step.
pub(crate) trait Relation<T>: Send + Sync {
    fn name(&self) -> &'static str;
    fn cardinality(&self) -> Cardinality;
    /// Reference is set, or collection is non-empty.
    fn is_present(&self, record: &T) -> bool;
    fn leaf(&self, rest: &[&str], leaf: &LeafSpec<'_>) -> CompileResult<Predicate<T>>;
    /// `rest` is empty when this relation is the scoped one.
    fn scope(&self, rest: &[&str], scope: &ScopeSpec<'_>) -> CompileResult<Predicate<T>>;
    fn key(&self, rest: &[&str], path: &str) -> CompileResult<SortKey<T>>;
}

struct ReferenceField<T, U> {
    name: &'static str,
    get: fn(&T) -> Option<&U>,
}

impl<T: Record, U: Record> Relation<T> for ReferenceField<T, U> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cardinality(&self) -> Cardinality {
        Cardinality::One
    }

    fn is_present(&self, record: &T) -> bool {
        (self.get)(record).is_some()
    }

    fn leaf(&self, rest: &[&str], leaf: &LeafSpec<'_>) -> CompileResult<Predicate<T>> {
        let inner = compiler::leaf_on::<U>(rest, leaf)?;
        let absent = leaf.is_null_test();
        let get = self.get;
        Ok(Predicate::new(move |record: &T| {
            get(record).map_or(absent, |related| inner.matches(related))
        }))
    }

    fn scope(&self, rest: &[&str], scope: &ScopeSpec<'_>) -> CompileResult<Predicate<T>> {
        let get = self.get;
        if !rest.is_empty() {
            let inner = compiler::scope_on::<U>(rest, scope)?;
            return Ok(Predicate::new(move |record: &T| {
                get(record).is_some_and(|related| inner.matches(related))
            }));
        }
        if scope.cardinality == Cardinality::Many {
            return Err(InvalidFilterError::malformed(format!(
                "'{}' is a single reference, not a collection",
                scope.path
            )));
        }
        let nested = compiler::compile_nested::<U>(scope.nested, scope.case)?;
        Ok(Predicate::new(move |record: &T| match get(record) {
            Some(related) => nested.as_ref().map_or(true, |p| p.matches(related)),
            None => false,
        }))
    }

    fn key(&self, rest: &[&str], path: &str) -> CompileResult<SortKey<T>> {
        let inner = compiler::key_on::<U>(rest, path)?;
        let get = self.get;
        Ok(Arc::new(move |record: &T| get(record).and_then(|related| inner(related))))
    }
}

struct CollectionField<T, U> {
    name: &'static str,
    get: fn(&T) -> &[U],
}

impl<T: Record, U: Record> CollectionField<T, U> {
    fn crossed(&self, path: &str) -> InvalidFilterError {
        InvalidFilterError::CollectionInPath {
            path: path.to_string(),
            collection: self.name.to_string(),
        }
    }
}

impl<T: Record, U: Record> Relation<T> for CollectionField<T, U> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cardinality(&self) -> Cardinality {
        Cardinality::Many
    }

    fn is_present(&self, record: &T) -> bool {
        !(self.get)(record).is_empty()
    }

    fn leaf(&self, _rest: &[&str], leaf: &LeafSpec<'_>) -> CompileResult<Predicate<T>> {
        Err(self.crossed(leaf.path))
    }

    fn scope(&self, rest: &[&str], scope: &ScopeSpec<'_>) -> CompileResult<Predicate<T>> {
        if !rest.is_empty() || scope.cardinality == Cardinality::One {
            return Err(self.crossed(scope.path));
        }
        let nested = compiler::compile_nested::<U>(scope.nested, scope.case)?;
        let get = self.get;
        Ok(Predicate::new(move |record: &T| {
            let items = get(record);
            match &nested {
                Some(p) => items.iter().any(|item| p.matches(item)),
                None => !items.is_empty(),
            }
        }))
    }

    fn key(&self, _rest: &[&str], path: &str) -> CompileResult<SortKey<T>> {
        Err(self.crossed(path))
    }
}

pub(crate) enum Member<T> {
    Scalar(Box<dyn ScalarAccess<T>>),
    Relation(Box<dyn Relation<T>>),
}

/// The declared type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarInfo {
    pub kind: ValueKind,
    pub nullable: bool,
}

/// The filterable fields of a record type.
pub struct Schema<T> {
    name: &'static str,
    members: Vec<(&'static str, Member<T>)>,
}

impl<T: Record> Schema<T> {
    /// Starts a schema for the type named `name` on the wire.
    pub fn builder(name: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder {
            schema: Schema {
                name,
                members: Vec::new(),
            },
        }
    }

    /// The record type name used in endpoint paths and error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().map(|(name, _)| *name)
    }

    /// Describes a scalar field, or returns `None` for relations and
    /// unknown names.
    pub fn scalar(&self, name: &str) -> Option<ScalarInfo> {
        match self.find(name)? {
            Member::Scalar(field) => Some(ScalarInfo {
                kind: field.kind(),
                nullable: field.nullable(),
            }),
            Member::Relation(_) => None,
        }
    }

    fn find(&self, name: &str) -> Option<&Member<T>> {
        self.members
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, member)| member)
    }

    pub(crate) fn member(&self, name: &str) -> CompileResult<&Member<T>> {
        self.find(name).ok_or_else(|| {
            InvalidFilterError::unknown_property(name, self.name, self.field_names())
        })
    }
}

impl<T> std::fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.members.iter().map(|(name, _)| *name).collect();
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &fields)
            .finish()
    }
}

/// Builder returned by [`Schema::builder`].
pub struct SchemaBuilder<T> {
    schema: Schema<T>,
}

impl<T: Record> SchemaBuilder<T> {
    fn push(mut self, name: &'static str, member: Member<T>) -> Self {
        self.schema.members.retain(|(existing, _)| *existing != name);
        self.schema.members.push((name, member));
        self
    }

    /// Adds a scalar field. Declaring a name twice replaces the first entry.
    pub fn scalar<V: ScalarField>(self, name: &'static str, get: fn(&T) -> &V) -> Self {
        self.push(name, Member::Scalar(Box::new(ScalarGetter { get })))
    }

    /// Adds an optional single-record relation.
    pub fn reference<U: Record>(self, name: &'static str, get: fn(&T) -> Option<&U>) -> Self {
        self.push(name, Member::Relation(Box::new(ReferenceField { name, get })))
    }

    /// Adds a collection relation.
    pub fn collection<U: Record>(self, name: &'static str, get: fn(&T) -> &[U]) -> Self {
        self.push(name, Member::Relation(Box::new(CollectionField { name, get })))
    }

    pub fn build(self) -> Schema<T> {
        self.schema
    }
}
