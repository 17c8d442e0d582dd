//! Filter trees, predicate compilation and query text serialization.
//!
//! A filter UI produces a [`FilterDescriptor`] tree. This crate turns that
//! tree into two things:
//!
//! - a [`Predicate`] that evaluates records in memory ([`compile`]), and
//! - the textual query language a remote endpoint parses ([`serialize`], or
//!   [`serialize_with`] to fold text case the way the predicate does).
//!
//! Records opt in by describing their fields once through [`Record::schema`].
//! The [`grammar`] module parses query text back into filter trees, and
//! [`typed`] provides compile-time checked field selectors.
//!
//! # Example
//!
//! ```
//! use std::sync::OnceLock;
//! use crudquery_core::{
//!     compile, derive_includes, serialize, CaseSensitivity, FilterDescriptor, Operator, Record,
//!     Schema,
//! };
//!
//! struct Region {
//!     nombre: String,
//! }
//!
//! struct Producto {
//!     precio: f64,
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
//!                 .scalar("Precio", |p: &Producto| &p.precio)
//!                 .reference("Region", |p: &Producto| p.region.as_ref())
//!                 .build()
//!         })
//!     }
//! }
//!
//! let filters = vec![
//!     FilterDescriptor::leaf("Precio", Operator::GreaterThan, 100),
//!     FilterDescriptor::related(
//!         "Region",
//!         vec![FilterDescriptor::leaf("Nombre", Operator::Equals, "Norte")],
//!     ),
//! ];
//!
//! assert_eq!(
//!     serialize(&filters).unwrap().as_deref(),
//!     Some(r#"Precio > 100 && Region != null && Region.Nombre == "Norte""#)
//! );
//! assert_eq!(derive_includes(&filters), vec!["Region"]);
//!
//! let predicate = compile::<Producto>(
//!     &FilterDescriptor::and(filters),
//!     CaseSensitivity::CaseInsensitive,
//! )
//! .unwrap();
//! let norte = Producto {
//!     precio: 150.0,
//!     region: Some(Region { nombre: "norte".to_string() }),
//! };
//! assert!(predicate.matches(&norte));
//! ```

pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod expr;
pub mod grammar;
pub mod includes;
pub mod lower;
pub mod operator;
pub mod plan;
pub mod projection;
pub mod schema;
pub mod serialize;
pub mod typed;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use compiler::{compile, compile_all, Predicate};
pub use descriptor::{FilterDescriptor, NodeKind};
pub use error::{
    CompileResult, Error, InvalidFilterError, ParseResult, QueryParseError, Result,
    UnsupportedExpressionError,
};
pub use expr::{BinaryOp, Expr};
pub use grammar::{parse_filter, parse_query, QueryParser};
pub use includes::derive_includes;
pub use lower::{lower, lower_folded, LoweredFilter};
pub use operator::{Cardinality, CaseSensitivity, LogicalOperator, OperandShape, Operator};
pub use plan::{OrderSpec, QueryPlan, SearchSpec};
pub use projection::{Projection, Shape, ShapeMember};
pub use schema::{Record, ScalarField, ScalarInfo, Schema, SchemaBuilder};
pub use serialize::{serialize, serialize_filter, serialize_filter_with, serialize_with};
pub use typed::{Collection, Condition, Field, FieldRef, Orderable, TextLike};
pub use value::{Value, ValueKind, ValueRef};
