//! Parser tests over the serializer's output forms.

use chrono::NaiveDate;

use super::*;
use crate::error::{Error, QueryParseError};
use crate::expr::{BinaryOp, Expr};
use crate::operator::{CaseSensitivity, Operator};
use crate::serialize::{serialize, serialize_with};
use crate::value::Value;

fn parse(input: &str) -> Expr {
    QueryParser::parse(input).unwrap()
}

fn parse_err(input: &str) -> QueryParseError {
    QueryParser::parse(input).unwrap_err()
}

// ==================== Expressions ====================

#[test]
fn test_comparison() {
    assert_eq!(
        parse("Precio >= 10.5"),
        Expr::binary(BinaryOp::Ge, Expr::member("Precio"), Expr::constant(10.5))
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expr = parse("A == 1 || B == 2 && C == 3");
    match expr {
        Expr::Binary {
            op: BinaryOp::OrElse,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::AndAlso,
                ..
            }
        )),
        other => panic!("expected OR at the root, got {other:?}"),
    }
}

#[test]
fn test_parentheses_override_precedence() {
    let expr = parse("(A == 1 || B == 2) && C == 3");
    assert!(matches!(
        expr,
        Expr::Binary {
            op: BinaryOp::AndAlso,
            ..
        }
    ));
}

#[test]
fn test_not_applies_to_comparison() {
    assert_eq!(
        parse("!Stock > 0"),
        Expr::negate(Expr::binary(
            BinaryOp::Gt,
            Expr::member("Stock"),
            Expr::constant(0)
        ))
    );
}

#[test]
fn test_dotted_member_and_method_call() {
    assert_eq!(
        parse(r#"Region.Nombre.StartsWith("N")"#),
        Expr::call(
            Expr::member("Region.Nombre"),
            "StartsWith",
            vec![Expr::constant("N")]
        )
    );
}

#[test]
fn test_date_literal_folds_to_constant() {
    let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    assert_eq!(
        parse(r#"Creado > DateTime.Parse("2024-01-02 03:04:05")"#),
        Expr::binary(
            BinaryOp::Gt,
            Expr::member("Creado"),
            Expr::constant(expected)
        )
    );
}

#[test]
fn test_invalid_date_literal() {
    assert_eq!(
        parse_err(r#"Creado > DateTime.Parse("someday")"#),
        QueryParseError::InvalidDate {
            text: "someday".to_string()
        }
    );
}

#[test]
fn test_array_literal_and_lambda() {
    assert_eq!(
        parse(r#"new ["a", -1, null].Contains(Nombre)"#),
        Expr::call(
            Expr::Array(vec![Value::from("a"), Value::Int(-1), Value::Null]),
            "Contains",
            vec![Expr::member("Nombre")]
        )
    );
    assert_eq!(
        parse("Etiquetas.Any(x1 => x1.Orden > 2)"),
        Expr::call(
            Expr::member("Etiquetas"),
            "Any",
            vec![Expr::lambda(
                "x1",
                Expr::binary(BinaryOp::Gt, Expr::member("x1.Orden"), Expr::constant(2))
            )]
        )
    );
}

#[test]
fn test_arithmetic_parses() {
    assert_eq!(
        parse("Precio * 2 > 10"),
        Expr::binary(
            BinaryOp::Gt,
            Expr::binary(BinaryOp::Multiply, Expr::member("Precio"), Expr::constant(2)),
            Expr::constant(10)
        )
    );
}

#[test]
fn test_display_reparses_to_same_tree() {
    for input in [
        r#"(A == 1 || B == 2) && !Nombre.Contains("x")"#,
        "!(Stock > 0)",
        r#"Etiquetas.Any(x1 => x1.Nombre == "a")"#,
    ] {
        let expr = parse(input);
        assert_eq!(parse(&expr.to_string()), expr, "input: {input}");
    }
}

// ==================== Errors ====================

#[test]
fn test_empty_expression() {
    assert_eq!(parse_err("   "), QueryParseError::EmptyExpression);
}

#[test]
fn test_unclosed_parenthesis() {
    assert_eq!(parse_err("(A == 1"), QueryParseError::UnclosedParenthesis);
    assert_eq!(parse_err("new [1, 2"), QueryParseError::UnclosedParenthesis);
}

#[test]
fn test_trailing_token() {
    assert_eq!(
        parse_err("A == 1 B"),
        QueryParseError::unexpected_token("B", 7)
    );
}

#[test]
fn test_dangling_operator() {
    assert_eq!(parse_err("A =="), QueryParseError::UnexpectedEndOfInput);
    assert_eq!(parse_err("A && || B"), QueryParseError::unexpected_token("||", 5));
}

#[test]
fn test_chained_comparison_is_rejected() {
    assert_eq!(
        parse_err("A == 1 == 2"),
        QueryParseError::unexpected_token("==", 7)
    );
}

// ==================== parse_filter ====================

#[test]
fn test_parse_filter_relationship_any() {
    let filter = parse_filter(r#"Etiquetas != null && Etiquetas.Any(x1 => x1.Nombre == "a")"#)
        .unwrap();
    assert_eq!(
        filter,
        FilterDescriptor::and(vec![
            FilterDescriptor::check("Etiquetas", Operator::IsNotNull),
            FilterDescriptor::any(
                "Etiquetas",
                vec![FilterDescriptor::leaf("Nombre", Operator::Equals, "a")]
            ),
        ])
    );
}

#[test]
fn test_parse_filter_reports_unsupported_nodes() {
    match parse_filter("Precio + 1 > 10") {
        Err(Error::UnsupportedExpression(err)) => assert_eq!(err.node, "arithmetic '+'"),
        other => panic!("expected unsupported expression, got {other:?}"),
    }
}

#[test]
fn test_parse_filter_reports_parse_errors() {
    assert!(matches!(
        parse_filter("Nombre == \"open"),
        Err(Error::Parse(QueryParseError::UnterminatedString { position: 10 }))
    ));
}

#[test]
fn test_serialized_tree_parses_back() {
    let filters = vec![
        FilterDescriptor::leaf("Nombre", Operator::DoesNotContain, r#"a "b" \c"#),
        FilterDescriptor::or(vec![
            FilterDescriptor::leaf("Stock", Operator::LessThan, -3),
            FilterDescriptor::check("Descripcion", Operator::IsEmpty),
        ]),
    ];
    let text = serialize(&filters).unwrap().unwrap();
    assert_eq!(parse_filter(&text).unwrap(), FilterDescriptor::and(filters));
}

// ==================== parse_query ====================

#[test]
fn test_to_lower_chains_onto_member() {
    assert_eq!(
        parse(r#"Nombre.ToLower().Contains("ana")"#),
        Expr::call(
            Expr::call(Expr::member("Nombre"), "ToLower", vec![]),
            "Contains",
            vec![Expr::constant("ana")],
        )
    );
}

#[test]
fn test_case_insensitive_text_parses_back_with_its_mode() {
    let filters = vec![
        FilterDescriptor::leaf("Nombre", Operator::StartsWith, "Mar"),
        FilterDescriptor::related(
            "Region",
            vec![FilterDescriptor::leaf("Nombre", Operator::Equals, "Norte")],
        ),
        FilterDescriptor::leaf("Stock", Operator::GreaterThan, 0),
    ];
    let text = serialize_with(&filters, CaseSensitivity::CaseInsensitive)
        .unwrap()
        .unwrap();
    assert_eq!(
        text,
        concat!(
            r#"Nombre.ToLower().StartsWith("mar") && Region != null"#,
            r#" && Region.Nombre.ToLower() == "norte" && Stock > 0"#
        )
    );

    let parsed = parse_query(&text).unwrap();
    assert_eq!(parsed.case_sensitivity, Some(CaseSensitivity::CaseInsensitive));
    assert_eq!(
        parsed.filter,
        FilterDescriptor::and(vec![
            FilterDescriptor::leaf("Nombre", Operator::StartsWith, "mar"),
            FilterDescriptor::check("Region", Operator::IsNotNull),
            FilterDescriptor::leaf("Region.Nombre", Operator::Equals, "norte"),
            FilterDescriptor::leaf("Stock", Operator::GreaterThan, 0),
        ])
    );
    assert_eq!(parse_filter(&text).unwrap(), parsed.filter);
}

#[test]
fn test_parse_query_rejects_mixed_folding() {
    match parse_query(r#"Nombre.ToLower() == "ana" || Nombre == "Ana""#) {
        Err(Error::UnsupportedExpression(err)) => {
            assert_eq!(err.node, "mixed ToLower() and exact text comparisons")
        }
        other => panic!("expected unsupported expression, got {other:?}"),
    }
}
