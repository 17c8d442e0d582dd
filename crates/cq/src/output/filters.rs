//! Filter output formatting for `serialize`, `parse` and dry runs.

use crudquery_core::FilterDescriptor;
use serde_json::Value;

use super::helpers::{dimmed, heading, query_text};

fn filter_line(filter: Option<&str>, use_colors: bool) -> String {
    match filter {
        Some(text) => query_text(text, use_colors),
        None => dimmed("(no filter, matches every record)", use_colors),
    }
}

fn include_line(includes: &[String], use_colors: bool) -> String {
    if includes.is_empty() {
        dimmed("(none)", use_colors)
    } else {
        includes.join(", ")
    }
}

/// Formats serialized query text and its include paths.
pub fn format_serialized_table(
    filter: Option<&str>,
    includes: &[String],
    use_colors: bool,
) -> String {
    format!(
        "{} {}\n{} {}\n",
        heading("Filter:", use_colors),
        filter_line(filter, use_colors),
        heading("Include:", use_colors),
        include_line(includes, use_colors),
    )
}

pub fn format_serialized_json(
    filter: Option<&str>,
    includes: &[String],
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "filter": filter,
        "include": includes,
    }))
}

/// Formats a parsed descriptor with its normalized query text.
pub fn format_parsed_table(
    descriptor: &FilterDescriptor,
    normalized: Option<&str>,
    includes: &[String],
    use_colors: bool,
) -> serde_json::Result<String> {
    Ok(format!(
        "{}\n{}\n\n{} {}\n{} {}\n",
        heading("Descriptor:", use_colors),
        serde_json::to_string_pretty(descriptor)?,
        heading("Normalized:", use_colors),
        filter_line(normalized, use_colors),
        heading("Include:", use_colors),
        include_line(includes, use_colors),
    ))
}

pub fn format_parsed_json(
    descriptor: &FilterDescriptor,
    normalized: Option<&str>,
    includes: &[String],
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "descriptor": descriptor,
        "normalized": normalized,
        "include": includes,
    }))
}

/// Formats the request a query would send.
pub fn format_dry_run_table(endpoint: &str, body: &Value, use_colors: bool) -> serde_json::Result<String> {
    Ok(format!(
        "{} {}\n{}\n{}\n",
        heading("POST", use_colors),
        endpoint,
        heading("Body:", use_colors),
        serde_json::to_string_pretty(body)?,
    ))
}

pub fn format_dry_run_json(endpoint: &str, body: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "method": "POST",
        "endpoint": endpoint,
        "body": body,
    }))
}
