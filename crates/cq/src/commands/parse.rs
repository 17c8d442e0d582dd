//! Parse command implementation.
//!
//! Reads query text back into a filter descriptor and prints it with its
//! normalized text, written in the same case mode as the input.

use crudquery_core::{derive_includes, parse_query, serialize_filter_with, CaseSensitivity};

use super::{read_input, CommandContext, Result};
use crate::output::{format_parsed_json, format_parsed_table};

/// Executes the parse command.
pub fn execute(ctx: &CommandContext, text: &str) -> Result<()> {
    let text = if text == "-" {
        read_input(text)?
    } else {
        text.to_string()
    };

    let parsed = parse_query(text.trim())?;
    let descriptor = parsed.filter;
    let normalized = serialize_filter_with(
        &descriptor,
        parsed
            .case_sensitivity
            .unwrap_or(CaseSensitivity::CaseSensitive),
    )?;
    let includes = derive_includes(std::slice::from_ref(&descriptor));

    if ctx.json_output {
        println!(
            "{}",
            format_parsed_json(&descriptor, normalized.as_deref(), &includes)?
        );
    } else if !ctx.quiet {
        print!(
            "{}",
            format_parsed_table(&descriptor, normalized.as_deref(), &includes, ctx.use_colors)?
        );
    }

    Ok(())
}
