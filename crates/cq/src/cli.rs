//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the cq CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// cq - Serialize, parse and run crudquery filters
#[derive(Parser, Debug)]
#[command(name = "cq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Force JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Bearer token for the query endpoints (default: from config)
    #[arg(long, global = true, env = "CQ_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the query endpoints, including any `/api` prefix
    #[arg(long, global = true, env = "CQ_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serialize a JSON filter descriptor (or an array of them) to query text
    #[command(alias = "ser")]
    Serialize {
        /// JSON file to read, or `-` for stdin
        input: String,

        /// Fold text case, comparing `member.ToLower()` with lowercased text
        #[arg(short = 'i', long)]
        ignore_case: bool,
    },

    /// Parse query text into a filter descriptor
    Parse {
        /// Query text, or `-` for stdin
        text: String,
    },

    /// Run a query against a remote endpoint
    #[command(alias = "q")]
    Query(QueryArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Options for `cq query`.
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Record type name, as the endpoint expects it (e.g. `Producto`)
    pub type_name: String,

    /// JSON file holding a filter descriptor or an array of them
    #[arg(long, value_name = "FILE")]
    pub filter_file: Option<PathBuf>,

    /// Filter written in query text (repeatable, combined with AND)
    #[arg(short = 'w', long = "where", value_name = "TEXT", action = clap::ArgAction::Append)]
    pub where_: Vec<String>,

    /// Order by a property path
    #[arg(short, long, value_name = "PATH")]
    pub order: Option<String>,

    /// Sort descending
    #[arg(long, requires = "order")]
    pub desc: bool,

    /// Relationship path to load with the results (repeatable)
    #[arg(short, long, value_name = "PATH", action = clap::ArgAction::Append)]
    pub include: Vec<String>,

    /// Let the endpoint decide what to load
    #[arg(long, conflicts_with = "include")]
    pub auto_include: bool,

    /// Number of records to skip
    #[arg(long)]
    pub skip: Option<usize>,

    /// Maximum number of records to return
    #[arg(long)]
    pub take: Option<usize>,

    /// Free-text search term
    #[arg(short, long, value_name = "TERM")]
    pub search: Option<String>,

    /// Property path to search in (repeatable)
    #[arg(short, long, value_name = "PATH", action = clap::ArgAction::Append, requires = "search")]
    pub field: Vec<String>,

    /// Project each record to these property paths (repeatable)
    #[arg(long, value_name = "PATH", action = clap::ArgAction::Append)]
    pub select: Vec<String>,

    /// Request one page with the server-side total count
    #[arg(long)]
    pub paged: bool,

    /// Print the endpoint and payload without sending anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print config file path
    Path,

    /// Write a commented default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Shell types for completions
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["cq", "--verbose", "parse", "Stock > 0"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert!(!cli.json);

        let cli = Cli::parse_from(["cq", "--quiet", "--json", "parse", "Stock > 0"]);
        assert!(!cli.verbose);
        assert!(cli.quiet);
        assert!(cli.json);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["cq", "-q", "-v", "parse", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_connection_flags() {
        let cli = Cli::parse_from([
            "cq",
            "--token",
            "test-token",
            "--base-url",
            "https://erp.example.com/api",
            "query",
            "Producto",
        ]);
        assert_eq!(cli.token.as_deref(), Some("test-token"));
        assert_eq!(cli.base_url.as_deref(), Some("https://erp.example.com/api"));
    }

    #[test]
    fn test_serialize_alias_and_stdin() {
        let cli = Cli::parse_from(["cq", "ser", "-"]);
        match cli.command {
            Some(Commands::Serialize { input, ignore_case }) => {
                assert_eq!(input, "-");
                assert!(!ignore_case);
            }
            other => panic!("expected serialize, got {other:?}"),
        }

        let cli = Cli::parse_from(["cq", "serialize", "--ignore-case", "filters.json"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Serialize { ignore_case: true, .. })
        ));
    }

    #[test]
    fn test_query_args() {
        let cli = Cli::parse_from([
            "cq",
            "q",
            "Producto",
            "--where",
            "Stock > 0",
            "-w",
            "Precio < 10",
            "--order",
            "Precio",
            "--desc",
            "-i",
            "Region",
            "--skip",
            "20",
            "--take",
            "10",
            "--search",
            "ana",
            "--field",
            "Nombre",
            "--field",
            "Region.Nombre",
            "--select",
            "Nombre",
            "--paged",
        ]);
        let Some(Commands::Query(args)) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.type_name, "Producto");
        assert_eq!(args.where_, vec!["Stock > 0", "Precio < 10"]);
        assert_eq!(args.order.as_deref(), Some("Precio"));
        assert!(args.desc);
        assert_eq!(args.include, vec!["Region"]);
        assert_eq!(args.skip, Some(20));
        assert_eq!(args.take, Some(10));
        assert_eq!(args.search.as_deref(), Some("ana"));
        assert_eq!(args.field, vec!["Nombre", "Region.Nombre"]);
        assert_eq!(args.select, vec!["Nombre"]);
        assert!(args.paged);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_field_requires_search() {
        let result = Cli::try_parse_from(["cq", "query", "Producto", "--field", "Nombre"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_auto_include_conflicts_with_include() {
        let result = Cli::try_parse_from([
            "cq",
            "query",
            "Producto",
            "--include",
            "Region",
            "--auto-include",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::parse_from(["cq", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: Some(ConfigCommands::Init { force: true })
            })
        ));
    }

    #[test]
    fn test_completions_shell() {
        let cli = Cli::parse_from(["cq", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Zsh })
        ));
    }
}
