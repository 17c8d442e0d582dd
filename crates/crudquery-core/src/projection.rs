//! Projection specs and their record-construction rendering.
//!
//! ```
//! use crudquery_core::Projection;
//!
//! assert_eq!(
//!     Projection::fields(["Nombre", "Precio"]).render().as_deref(),
//!     Some("new { Nombre, Precio }")
//! );
//! let shape = Projection::shape()
//!     .member("Nombre")
//!     .nest("Region", Projection::shape().alias("Nombre", "Region.Nombre"));
//! assert_eq!(
//!     shape.render().as_deref(),
//!     Some("new { Nombre, Region = new { Nombre = Region.Nombre } }")
//! );
//! ```

use std::fmt;

/// What a query selects from each record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// A single field, rendered as its bare path.
    Field(String),
    /// A constructed record, anonymous or named.
    Shape(Shape),
}

/// The members of a constructed record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shape {
    /// Result type name for `new Name { ... }`.
    pub name: Option<String>,
    pub members: Vec<ShapeMember>,
}

/// One member of a [`Shape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeMember {
    /// A field path, optionally assigned to an alias. An unaliased dotted
    /// path renders under its segments joined, `RegionNombre = Region.Nombre`.
    Path { alias: Option<String>, path: String },
    /// A nested shape assigned to an alias.
    Nested { alias: String, shape: Shape },
}

impl Projection {
    /// Selects a single field.
    pub fn field(path: impl Into<String>) -> Self {
        Projection::Field(path.into())
    }

    /// Selects several fields into an anonymous record.
    pub fn fields<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths
            .into_iter()
            .fold(Projection::shape(), |shape, path| shape.member(path))
    }

    /// Starts an anonymous record.
    pub fn shape() -> Self {
        Projection::Shape(Shape::default())
    }

    /// Starts a record of the named result type.
    pub fn named(name: impl Into<String>) -> Self {
        Projection::Shape(Shape {
            name: Some(name.into()),
            members: Vec::new(),
        })
    }

    /// Adds an unaliased field. A bare-field projection becomes a shape.
    pub fn member(self, path: impl Into<String>) -> Self {
        self.push(ShapeMember::Path {
            alias: None,
            path: path.into(),
        })
    }

    /// Adds `alias = path`.
    pub fn alias(self, alias: impl Into<String>, path: impl Into<String>) -> Self {
        self.push(ShapeMember::Path {
            alias: Some(alias.into()),
            path: path.into(),
        })
    }

    /// Adds `alias = new { ... }`. A bare-field nested projection is added
    /// as `alias = path`.
    pub fn nest(self, alias: impl Into<String>, nested: Projection) -> Self {
        let alias = alias.into();
        match nested {
            Projection::Shape(shape) => self.push(ShapeMember::Nested { alias, shape }),
            Projection::Field(path) => self.push(ShapeMember::Path {
                alias: Some(alias),
                path,
            }),
        }
    }

    fn push(self, member: ShapeMember) -> Self {
        let mut shape = match self {
            Projection::Shape(shape) => shape,
            Projection::Field(path) => Shape {
                name: None,
                members: vec![ShapeMember::Path { alias: None, path }],
            },
        };
        shape.members.push(member);
        Projection::Shape(shape)
    }

    /// Renders the select string, or `None` for a shape with no members.
    pub fn render(&self) -> Option<String> {
        match self {
            Projection::Field(path) => Some(path.clone()),
            Projection::Shape(shape) if shape.members.is_empty() => None,
            Projection::Shape(shape) => Some(shape.to_string()),
        }
    }

    /// Field paths read by this projection, in order.
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Projection::Field(path) => out.push(path.as_str()),
            Projection::Shape(shape) => shape.collect_paths(&mut out),
        }
        out
    }
}

impl Shape {
    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        for member in &self.members {
            match member {
                ShapeMember::Path { path, .. } => out.push(path),
                ShapeMember::Nested { shape, .. } => shape.collect_paths(out),
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "new {name} {{ ")?,
            None => f.write_str("new { ")?,
        }
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match member {
                ShapeMember::Path { alias: None, path } if path.contains('.') => {
                    write!(f, "{} = {path}", path.replace('.', ""))?
                }
                ShapeMember::Path { alias: None, path } => f.write_str(path)?,
                ShapeMember::Path {
                    alias: Some(alias),
                    path,
                } => write!(f, "{alias} = {path}")?,
                ShapeMember::Nested { alias, shape } => write!(f, "{alias} = {shape}")?,
            }
        }
        f.write_str(" }")
    }
}
