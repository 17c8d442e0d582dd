//! Unit tests for QueryBuilder and SelectQueryBuilder.

use std::sync::OnceLock;

use super::*;
use crudquery_core::{Collection, Field, Operator, Schema};

use crate::service::QueryService;

#[derive(Debug, Clone, PartialEq)]
struct Etiqueta {
    nombre: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Region {
    nombre: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Producto {
    nombre: String,
    precio: f64,
    stock: i32,
    region: Option<Region>,
    etiquetas: Vec<Etiqueta>,
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

impl Record for Region {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Region>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Region")
                .scalar("Nombre", |r: &Region| &r.nombre)
                .build()
        })
    }
}

impl Record for Producto {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Producto>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Producto")
                .scalar("Nombre", |p: &Producto| &p.nombre)
                .scalar("Precio", |p: &Producto| &p.precio)
                .scalar("Stock", |p: &Producto| &p.stock)
                .reference("Region", |p: &Producto| p.region.as_ref())
                .collection("Etiquetas", |p: &Producto| p.etiquetas.as_slice())
                .build()
        })
    }
}

const NOMBRE: Field<Producto, String> = Field::new("Nombre");
const PRECIO: Field<Producto, f64> = Field::new("Precio");
const STOCK: Field<Producto, i32> = Field::new("Stock");
const REGION: Field<Producto, Region> = Field::new("Region");
const REGION_NOMBRE: Field<Region, String> = Field::new("Nombre");
const ETIQUETAS: Collection<Producto, Etiqueta> = Collection::new("Etiquetas");
const ETIQUETA_NOMBRE: Field<Etiqueta, String> = Field::new("Nombre");

fn productos() -> QueryBuilder<Producto> {
    QueryService::new(QueryClient::new("http://localhost/api")).for_type::<Producto>()
}

fn producto(nombre: &str, precio: f64, stock: i32) -> Producto {
    Producto {
        nombre: nombre.to_string(),
        precio,
        stock,
        region: None,
        etiquetas: Vec::new(),
    }
}

// ==================== Plain queries ====================

#[test]
fn test_typed_filters_accumulate_with_and() {
    let request = productos()
        .filter(PRECIO.gt(100.0))
        .filter(NOMBRE.contains("ana") | STOCK.eq(0))
        .to_query_request()
        .unwrap();
    assert_eq!(
        request.filter.as_deref(),
        Some(r#"Precio > 100 && (Nombre.ToLower().Contains("ana") || Stock == 0)"#)
    );
    assert_eq!(request.include, None);
}

#[test]
fn test_any_condition_derives_include() {
    let request = productos()
        .filter(ETIQUETAS.any(ETIQUETA_NOMBRE.eq("oferta")))
        .to_query_request()
        .unwrap();
    assert_eq!(
        request.filter.as_deref(),
        Some(r#"Etiquetas != null && Etiquetas.Any(x1 => x1.Nombre.ToLower() == "oferta")"#)
    );
    assert_eq!(request.include, Some(vec!["Etiquetas".to_string()]));
}

#[test]
fn test_explicit_include_replaces_derived() {
    let base = productos().filter(ETIQUETAS.any(ETIQUETA_NOMBRE.eq("oferta")));

    let explicit = base.clone().include(&REGION).include(&REGION);
    assert_eq!(
        explicit.to_query_request().unwrap().include,
        Some(vec!["Region".to_string()])
    );

    let automatic = base.auto_include();
    assert_eq!(automatic.to_query_request().unwrap().include, None);
}

#[test]
fn test_order_skip_take() {
    let request = productos()
        .order_by(&PRECIO)
        .order_by_descending(&REGION.then(&REGION_NOMBRE))
        .skip(20)
        .take(10)
        .to_query_request()
        .unwrap();
    assert_eq!(request.order_by.as_deref(), Some("Region.Nombre desc"));
    assert_eq!(request.skip, Some(20));
    assert_eq!(request.take, Some(10));
    assert_eq!(request.filter, None);
}

#[test]
fn test_branches_are_independent() {
    let prefix = productos().filter(STOCK.gt(0));
    let baratos = prefix.clone().filter(PRECIO.lt(10.0));
    let caros = prefix.clone().filter(PRECIO.ge(1000.0)).take(5);

    assert_eq!(
        prefix.to_query_request().unwrap().filter.as_deref(),
        Some("Stock > 0")
    );
    assert_eq!(
        baratos.to_query_request().unwrap().filter.as_deref(),
        Some("Stock > 0 && Precio < 10")
    );
    let caros = caros.to_query_request().unwrap();
    assert_eq!(caros.filter.as_deref(), Some("Stock > 0 && Precio >= 1000"));
    assert_eq!(caros.take, Some(5));
    assert_eq!(baratos.to_query_request().unwrap().take, None);
}

#[test]
fn test_filter_text_and_descriptor() {
    let query = productos()
        .filter_text(r#"Nombre.StartsWith("Mar")"#)
        .filter_descriptor(FilterDescriptor::leaf("Stock", Operator::NotEquals, 0));
    assert_eq!(
        query.to_query_request().unwrap().filter.as_deref(),
        Some(r#"Nombre.ToLower().StartsWith("mar") && Stock != 0"#)
    );

    let exact = query.case_sensitivity(CaseSensitivity::CaseSensitive);
    assert_eq!(
        exact.to_query_request().unwrap().filter.as_deref(),
        Some(r#"Nombre.StartsWith("Mar") && Stock != 0"#)
    );
}

#[test]
fn test_first_filter_error_is_kept() {
    let query = productos()
        .filter_text("Precio * 2 > 10")
        .filter_text("Nombre ==")
        .filter(STOCK.gt(0));
    match query.to_query_request() {
        Err(Error::Query(crudquery_core::Error::UnsupportedExpression(err))) => {
            assert_eq!(err.node, "arithmetic '*'");
        }
        other => panic!("expected unsupported expression, got {other:?}"),
    }
    assert!(query.to_search_request().is_err());
}

#[test]
fn test_invalid_descriptor_fails_on_request() {
    let query = productos().filter_descriptor(FilterDescriptor::check("Stock", Operator::GreaterThan));
    assert!(matches!(
        query.to_query_request(),
        Err(Error::Query(crudquery_core::Error::InvalidFilter(_)))
    ));
}

// ==================== Combinators ====================

#[test]
fn test_and_concatenates_filters() {
    let left = productos().filter(STOCK.gt(0)).take(3);
    let right = productos().filter(PRECIO.lt(50.0)).take(99);
    let request = left.and(right).to_query_request().unwrap();
    assert_eq!(request.filter.as_deref(), Some("Stock > 0 && Precio < 50"));
    assert_eq!(request.take, Some(3));
}

#[test]
fn test_or_groups_both_sides() {
    let left = productos().filter(STOCK.gt(0)).filter(PRECIO.lt(50.0));
    let right = productos().filter(NOMBRE.eq("Oferta"));
    let request = left.or(right).to_query_request().unwrap();
    assert_eq!(
        request.filter.as_deref(),
        Some(r#"((Stock > 0 && Precio < 50) || Nombre.ToLower() == "oferta")"#)
    );
}

#[test]
fn test_or_with_unfiltered_side_matches_all() {
    let left = productos().filter(STOCK.gt(0));
    let request = left.or(productos()).to_query_request().unwrap();
    assert_eq!(request.filter, None);
}

#[test]
fn test_or_with_vacuous_side_matches_all() {
    let records = vec![producto("ana", 10.0, 0), producto("Pedro", 30.0, 5)];
    let vacuous = productos()
        .filter_descriptor(FilterDescriptor::and(vec![FilterDescriptor::or(vec![])]));

    let either = vacuous.clone().or(productos().filter(STOCK.gt(0)));
    assert_eq!(either.to_query_request().unwrap().filter, None);
    assert_eq!(either.preview(&records).unwrap().len(), 2);

    let mirrored = productos().filter(STOCK.gt(0)).or(vacuous);
    assert_eq!(mirrored.to_query_request().unwrap().filter, None);
    assert_eq!(mirrored.preview(&records).unwrap().len(), 2);
}

#[test]
fn test_combinators_keep_errors_from_other() {
    let broken = productos().filter_text("(");
    assert!(productos().and(broken.clone()).to_query_request().is_err());
    assert!(productos().or(broken).to_query_request().is_err());
}

// ==================== Search ====================

#[test]
fn test_search_builds_search_request() {
    let query = productos()
        .filter(STOCK.gt(0))
        .order_by(&NOMBRE)
        .search("ana")
        .in_fields(&[&NOMBRE, &REGION.then(&REGION_NOMBRE)])
        .also_in_field(&PRECIO);
    let request = query.to_search_request().unwrap().unwrap();
    assert_eq!(request.search_term, "ana");
    assert_eq!(
        request.search_fields,
        vec!["Nombre", "Region.Nombre", "Precio"]
    );
    assert_eq!(request.base_query.filter.as_deref(), Some("Stock > 0"));
    assert_eq!(request.base_query.order_by.as_deref(), Some("Nombre"));
}

#[test]
fn test_fields_before_term() {
    let query = productos().in_field_paths(["Nombre"]).search("x");
    let request = query.to_search_request().unwrap().unwrap();
    assert_eq!(request.search_fields, vec!["Nombre"]);
}

#[test]
fn test_blank_search_is_plain_query() {
    let query = productos().search("   ").in_fields(&[&NOMBRE]);
    assert_eq!(query.to_search_request().unwrap(), None);
}

// ==================== Select ====================

#[test]
fn test_select_sets_projection() {
    let query = productos()
        .filter(STOCK.gt(0))
        .select::<serde_json::Value>(Projection::fields(["Nombre", "Precio"]))
        .take(5);
    let request = query.to_query_request().unwrap();
    assert_eq!(request.select.as_deref(), Some("new { Nombre, Precio }"));
    assert_eq!(request.filter.as_deref(), Some("Stock > 0"));
    assert_eq!(request.take, Some(5));
}

#[test]
fn test_select_builder_accepts_typed_steps() {
    let query = productos()
        .select::<serde_json::Value>(Projection::field("Nombre"))
        .filter(NOMBRE.starts_with("A"))
        .order_by_descending(&PRECIO)
        .search("a")
        .in_fields(&[&NOMBRE]);
    let request = query.to_search_request().unwrap().unwrap();
    assert_eq!(request.base_query.select.as_deref(), Some("Nombre"));
    assert_eq!(request.base_query.order_by.as_deref(), Some("Precio desc"));
}

#[test]
fn test_select_builder_accepts_query_steps() {
    let query = productos()
        .select::<serde_json::Value>(Projection::field("Nombre"))
        .filter_descriptor(FilterDescriptor::leaf("Nombre", Operator::Equals, "Ana"))
        .case_sensitivity(CaseSensitivity::CaseSensitive)
        .order_by_path("Region.Nombre", true)
        .include_path("Region")
        .at_base_url("http://forms.local/api");
    let request = query.to_query_request().unwrap();
    assert_eq!(request.filter.as_deref(), Some(r#"Nombre == "Ana""#));
    assert_eq!(request.order_by.as_deref(), Some("Region.Nombre desc"));
    assert_eq!(request.include, Some(vec!["Region".to_string()]));
    assert_eq!(
        query.endpoint(false),
        "http://forms.local/api/query/Producto/select"
    );

    let automatic = query.clone().auto_include();
    assert_eq!(automatic.to_query_request().unwrap().include, None);

    let searched = query
        .search("an")
        .in_field_paths(["Nombre"])
        .also_in_field(&REGION.then(&REGION_NOMBRE));
    let request = searched.to_search_request().unwrap().unwrap();
    assert_eq!(request.search_fields, vec!["Nombre", "Region.Nombre"]);
}

// ==================== Preview ====================

#[test]
fn test_preview_runs_locally() {
    let records = vec![
        producto("ana", 10.0, 0),
        producto("Mariana", 20.0, 5),
        producto("Pedro", 30.0, 5),
    ];
    let query = productos()
        .filter(STOCK.gt(0))
        .order_by_descending(&PRECIO);
    let names: Vec<&str> = query
        .preview(&records)
        .unwrap()
        .iter()
        .map(|p| p.nombre.as_str())
        .collect();
    assert_eq!(names, vec!["Pedro", "Mariana"]);
}

#[test]
fn test_preview_honors_case_sensitivity() {
    let records = vec![producto("ANA", 1.0, 1)];
    let insensitive = productos().filter(NOMBRE.eq("ana"));
    assert_eq!(insensitive.preview(&records).unwrap().len(), 1);

    let sensitive = insensitive.case_sensitivity(CaseSensitivity::CaseSensitive);
    assert!(sensitive.preview(&records).unwrap().is_empty());
}

#[test]
fn test_preview_refuses_search() {
    let query = productos().search("ana");
    assert!(matches!(
        query.preview(&[]),
        Err(Error::Query(crudquery_core::Error::InvalidFilter(_)))
    ));
}

#[test]
fn test_endpoint_follows_query_shape() {
    let plain = productos().filter(STOCK.gt(0));
    assert_eq!(plain.operation(false), Operation::Query);
    assert_eq!(plain.endpoint(true), "http://localhost/api/query/Producto/paged");

    let searched = plain.clone().search("ana");
    assert_eq!(searched.operation(true), Operation::SearchPaged);

    let projected = searched.select::<serde_json::Value>(Projection::field("Nombre"));
    assert_eq!(
        projected.endpoint(false),
        "http://localhost/api/query/Producto/search-select"
    );

    let blank = plain.search(" ");
    assert_eq!(blank.operation(false), Operation::Query);
}

#[test]
fn test_base_url_override_is_per_query() {
    let service = QueryService::new(QueryClient::new("http://localhost/api"));
    let other = service.for_type_at::<Producto>("http://forms.local/api");
    assert_eq!(other.plan().base_url.as_deref(), Some("http://forms.local/api"));
    assert_eq!(service.for_type::<Producto>().plan().base_url, None);
    assert_eq!(other.type_name(), "Producto");
}
