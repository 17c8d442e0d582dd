//! Query result output formatting.

use crudquery_client::models::PagedResult;
use owo_colors::OwoColorize;
use serde_json::Value;

use super::helpers::{dimmed, format_cell, truncate_str};

/// Widest a column is allowed to grow before cells are truncated.
const MAX_COLUMN_WIDTH: usize = 32;

/// Column names for a set of records: the union of object keys in
/// first-seen order, or a single `value` column for scalar records.
fn columns(records: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        match record {
            Value::Object(map) => {
                for key in map.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
            _ => {
                if !columns.iter().any(|c| c == "value") {
                    columns.push("value".to_string());
                }
            }
        }
    }
    columns
}

fn cell(record: &Value, column: &str) -> String {
    let raw = match record {
        Value::Object(map) => map.get(column).map(format_cell).unwrap_or_default(),
        other if column == "value" => format_cell(other),
        _ => String::new(),
    };
    truncate_str(&raw, MAX_COLUMN_WIDTH)
}

/// Formats records as an aligned table.
pub fn format_records_table(records: &[Value], use_colors: bool) -> String {
    if records.is_empty() {
        return format!("{}\n", dimmed("No records found.", use_colors));
    }

    let columns = columns(records);
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| columns.iter().map(|c| cell(record, c)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut output = String::new();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", truncate_str(column, *width)))
        .collect();
    let header = header.join("  ");
    if use_colors {
        output.push_str(&header.trim_end().bold().to_string());
    } else {
        output.push_str(header.trim_end());
    }
    output.push('\n');

    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect();
        output.push_str(line.join("  ").trim_end());
        output.push('\n');
    }

    output
}

/// Formats records as a JSON array.
pub fn format_records_json(records: &[Value]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Formats one page of records with a page footer.
pub fn format_page_table(page: &PagedResult<Value>, use_colors: bool) -> String {
    let mut output = format_records_table(&page.data, use_colors);
    let footer = match page.total_pages() {
        0 => format!("{} records", page.total_count),
        pages => format!(
            "Page {} of {} ({} records)",
            page.page, pages, page.total_count
        ),
    };
    output.push('\n');
    output.push_str(&dimmed(&footer, use_colors));
    if page.has_next_page() {
        output.push_str(&dimmed(" - more available", use_colors));
    }
    output.push('\n');
    output
}

/// Formats one page of records as JSON, with derived paging fields.
pub fn format_page_json(page: &PagedResult<Value>) -> serde_json::Result<String> {
    let output = serde_json::json!({
        "data": page.data,
        "totalCount": page.total_count,
        "page": page.page,
        "pageSize": page.page_size,
        "totalPages": page.total_pages(),
        "hasNextPage": page.has_next_page(),
    });
    serde_json::to_string_pretty(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_table_aligns_columns() {
        let records = vec![
            json!({"Nombre": "Ana", "Stock": 3}),
            json!({"Nombre": "Mariana", "Stock": 12}),
        ];
        let table = format_records_table(&records, false);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Nombre   Stock");
        assert_eq!(lines[1], "Ana      3");
        assert_eq!(lines[2], "Mariana  12");
    }

    #[test]
    fn test_records_table_unions_keys() {
        let records = vec![json!({"Nombre": "Ana"}), json!({"Region": "Norte"})];
        let table = format_records_table(&records, false);
        assert!(table.lines().next().unwrap().contains("Region"));
        assert!(table.contains("Norte"));
    }

    #[test]
    fn test_records_table_scalars() {
        let table = format_records_table(&[json!("Ana"), json!(2)], false);
        assert_eq!(table, "value\nAna\n2\n");
    }

    #[test]
    fn test_empty_records() {
        assert_eq!(format_records_table(&[], false), "No records found.\n");
    }

    #[test]
    fn test_page_table_footer() {
        let page = PagedResult {
            data: vec![json!({"Nombre": "Ana"})],
            total_count: 41,
            page: 1,
            page_size: 20,
        };
        let table = format_page_table(&page, false);
        assert!(table.ends_with("Page 1 of 3 (41 records) - more available\n"));
    }

    #[test]
    fn test_page_json_adds_derived_fields() {
        let page = PagedResult {
            data: vec![],
            total_count: 0,
            page: 0,
            page_size: 0,
        };
        let json: Value = serde_json::from_str(&format_page_json(&page).unwrap()).unwrap();
        assert_eq!(json["totalPages"], 0);
        assert_eq!(json["hasNextPage"], false);
    }
}
