//! Command implementations for the cq CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod completions;
pub mod config;
pub mod parse;
pub mod query;
pub mod serialize;

use std::fs;
use std::io::{self, Read};

use crudquery_core::FilterDescriptor;
use serde::Deserialize;

use crate::cli::Cli;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Filter could not be compiled, serialized or parsed.
    #[error("filter error: {0}")]
    Filter(#[from] crudquery_core::Error),

    /// Query client error (local build failure, remote rejection, network).
    #[error(transparent)]
    Client(#[from] crudquery_client::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON input or unserializable output.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<crudquery_core::InvalidFilterError> for CommandError {
    fn from(err: crudquery_core::InvalidFilterError) -> Self {
        CommandError::Filter(err.into())
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color,
            quiet: cli.quiet,
            verbose: cli.verbose,
        }
    }
}

/// Reads `source` as a file path, or stdin when it is `-`.
pub(crate) fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(source)?)
    }
}

/// A filter file holds either one descriptor or a top-level list.
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorInput {
    Many(Vec<FilterDescriptor>),
    One(FilterDescriptor),
}

/// Parses descriptor JSON into the list of top-level filters.
pub(crate) fn parse_descriptors(json: &str) -> Result<Vec<FilterDescriptor>> {
    Ok(match serde_json::from_str(json)? {
        DescriptorInput::Many(filters) => filters,
        DescriptorInput::One(filter) => vec![filter],
    })
}
