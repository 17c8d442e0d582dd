//! Serialize command implementation.
//!
//! Turns a JSON filter descriptor file into query text.

use crudquery_core::{derive_includes, serialize_with, CaseSensitivity, FilterDescriptor};
use tracing::debug;

use super::{parse_descriptors, read_input, CommandContext, Result};
use crate::output::{format_serialized_json, format_serialized_table};

/// The query text and include paths for a set of top-level filters.
pub struct Serialized {
    pub filter: Option<String>,
    pub includes: Vec<String>,
}

/// Serializes `filters` the way a query under `case` would send them.
pub fn serialize_filters(filters: &[FilterDescriptor], case: CaseSensitivity) -> Result<Serialized> {
    let filter = serialize_with(filters, case)?;
    let includes = derive_includes(filters);
    debug!(filters = filters.len(), includes = includes.len(), ?case, "serialized filters");
    Ok(Serialized { filter, includes })
}

/// Executes the serialize command.
///
/// # Arguments
///
/// * `input` - Path to a JSON file, or `-` for stdin
/// * `case` - Whether text comparisons fold case
///
/// # Errors
///
/// Fails if the input cannot be read, is not descriptor JSON, or holds an
/// invalid filter tree.
pub fn execute(ctx: &CommandContext, input: &str, case: CaseSensitivity) -> Result<()> {
    let json = read_input(input)?;
    let filters = parse_descriptors(&json)?;
    let serialized = serialize_filters(&filters, case)?;

    if ctx.json_output {
        println!(
            "{}",
            format_serialized_json(serialized.filter.as_deref(), &serialized.includes)?
        );
    } else if !ctx.quiet {
        print!(
            "{}",
            format_serialized_table(
                serialized.filter.as_deref(),
                &serialized.includes,
                ctx.use_colors
            )
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandError;

    #[test]
    fn test_serialize_related_descriptor() {
        let filters = parse_descriptors(
            r#"{
                "relationshipPath": "Region",
                "operator": "Related",
                "nestedFilters": [
                    {"property": "Nombre", "operator": "Equals", "value": "Norte"}
                ]
            }"#,
        )
        .unwrap();
        let serialized = serialize_filters(&filters, CaseSensitivity::CaseSensitive).unwrap();
        assert_eq!(
            serialized.filter.as_deref(),
            Some(r#"Region != null && Region.Nombre == "Norte""#)
        );
        assert_eq!(serialized.includes, vec!["Region"]);
    }

    #[test]
    fn test_serialize_empty_list_matches_all() {
        let serialized = serialize_filters(&[], CaseSensitivity::CaseSensitive).unwrap();
        assert_eq!(serialized.filter, None);
        assert!(serialized.includes.is_empty());
    }

    #[test]
    fn test_serialize_invalid_descriptor_is_filter_error() {
        let filters =
            parse_descriptors(r#"{"property": "Stock", "operator": "GreaterThan"}"#).unwrap();
        assert!(matches!(
            serialize_filters(&filters, CaseSensitivity::CaseSensitive),
            Err(CommandError::Filter(_))
        ));
    }

    #[test]
    fn test_serialize_ignoring_case_folds_text() {
        let filters = parse_descriptors(
            r#"[
                {"property": "Nombre", "operator": "StartsWith", "value": "Mar"},
                {"property": "Stock", "operator": "GreaterThan", "value": 0}
            ]"#,
        )
        .unwrap();
        let serialized = serialize_filters(&filters, CaseSensitivity::CaseInsensitive).unwrap();
        assert_eq!(
            serialized.filter.as_deref(),
            Some(r#"Nombre.ToLower().StartsWith("mar") && Stock > 0"#)
        );
    }
}
