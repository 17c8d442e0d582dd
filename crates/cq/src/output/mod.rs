//! Output formatting utilities for the cq CLI.
//!
//! This module provides functions for formatting data as tables or JSON:
//!
//! - [`filters`] - Query text, parsed descriptors and dry-run requests
//! - [`records`] - Query results and pages
//! - [`helpers`] - Common formatting utilities (truncation, cells, colors)

mod filters;
pub mod helpers;
mod records;

pub use filters::{
    format_dry_run_json, format_dry_run_table, format_parsed_json, format_parsed_table,
    format_serialized_json, format_serialized_table,
};

pub use records::{format_page_json, format_page_table, format_records_json, format_records_table};
