//! Common helper functions for output formatting.

use owo_colors::OwoColorize;
use serde_json::Value;

/// Truncates a string to a maximum number of characters.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Renders a JSON value as a table cell.
///
/// Strings print without quotes, null prints empty, and nested values print
/// as compact JSON.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(_) => value.to_string(),
    }
}

/// Bold green heading, or plain text without colors.
pub fn heading(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.green().bold().to_string()
    } else {
        text.to_string()
    }
}

/// Dimmed text, or plain text without colors.
pub fn dimmed(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Highlights query text.
pub fn query_text(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}
