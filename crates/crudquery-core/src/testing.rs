//! Record fixtures shared by unit tests.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::schema::{Record, Schema};

#[derive(Debug, Clone, PartialEq)]
pub struct Pais {
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub nombre: String,
    pub codigo: Option<i32>,
    pub pais: Option<Pais>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Etiqueta {
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Producto {
    pub id: Uuid,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: f64,
    pub stock: i32,
    pub activo: bool,
    pub creado: NaiveDateTime,
    pub region: Option<Region>,
    pub etiquetas: Vec<Etiqueta>,
}

impl Record for Pais {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Pais>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Pais")
                .scalar("Nombre", |p: &Pais| &p.nombre)
                .build()
        })
    }
}

impl Record for Region {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Region>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Region")
                .scalar("Nombre", |r: &Region| &r.nombre)
                .scalar("Codigo", |r: &Region| &r.codigo)
                .reference("Pais", |r: &Region| r.pais.as_ref())
                .build()
        })
    }
}

impl Record for Etiqueta {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Etiqueta>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Etiqueta")
                .scalar("Nombre", |e: &Etiqueta| &e.nombre)
                .build()
        })
    }
}

impl Record for Producto {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Producto>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Producto")
                .scalar("Id", |p: &Producto| &p.id)
                .scalar("Nombre", |p: &Producto| &p.nombre)
                .scalar("Descripcion", |p: &Producto| &p.descripcion)
                .scalar("Precio", |p: &Producto| &p.precio)
                .scalar("Stock", |p: &Producto| &p.stock)
                .scalar("Activo", |p: &Producto| &p.activo)
                .scalar("Creado", |p: &Producto| &p.creado)
                .reference("Region", |p: &Producto| p.region.as_ref())
                .collection("Etiquetas", |p: &Producto| p.etiquetas.as_slice())
                .build()
        })
    }
}

/// A product with the given name and neutral defaults elsewhere.
pub fn producto(nombre: &str) -> Producto {
    Producto {
        id: Uuid::nil(),
        nombre: nombre.to_string(),
        descripcion: None,
        precio: 0.0,
        stock: 0,
        activo: true,
        creado: NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default(),
        region: None,
        etiquetas: Vec::new(),
    }
}

pub fn region(nombre: &str) -> Region {
    Region {
        nombre: nombre.to_string(),
        codigo: None,
        pais: None,
    }
}

pub fn etiqueta(nombre: &str) -> Etiqueta {
    Etiqueta {
        nombre: nombre.to_string(),
    }
}
