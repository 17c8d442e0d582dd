//! Command dispatch module for routing CLI commands to their handlers.
//!
//! Local commands never touch the network. Remote commands need a resolved
//! [`Connection`].

use crudquery_core::CaseSensitivity;

use crate::cli::{Cli, Commands, ConfigCommands, QueryArgs};
use crate::commands::query::Connection;
use crate::commands::{self, CommandContext, CommandError, Result};

/// Trait for commands that run without a connection.
pub trait LocalCommand {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// Trait for commands that talk to a query endpoint.
#[allow(async_fn_in_trait)]
pub trait RemoteCommand {
    async fn execute(&self, ctx: &CommandContext, connection: &Connection) -> Result<()>;
}

/// Commands that don't need a connection.
pub enum LocalDispatch<'a> {
    Serialize(&'a str, CaseSensitivity),
    Parse(&'a str),
    Config(&'a Option<ConfigCommands>),
    Completions(crate::cli::Shell),
    Help,
}

impl<'a> LocalDispatch<'a> {
    /// Returns None if the command needs a connection.
    pub fn try_from_cli(cli: &'a Cli) -> Option<Self> {
        match &cli.command {
            Some(Commands::Serialize { input, ignore_case }) => {
                let case = if *ignore_case {
                    CaseSensitivity::CaseInsensitive
                } else {
                    CaseSensitivity::CaseSensitive
                };
                Some(Self::Serialize(input, case))
            }
            Some(Commands::Parse { text }) => Some(Self::Parse(text)),
            Some(Commands::Config { command }) => Some(Self::Config(command)),
            Some(Commands::Completions { shell }) => Some(Self::Completions(*shell)),
            None => Some(Self::Help),
            Some(Commands::Query(_)) => None,
        }
    }
}

impl LocalCommand for LocalDispatch<'_> {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            Self::Serialize(input, case) => commands::serialize::execute(ctx, input, *case),
            Self::Parse(text) => commands::parse::execute(ctx, text),
            Self::Config(command) => dispatch_config(ctx, command),
            Self::Completions(shell) => {
                commands::completions::execute(*shell).map_err(CommandError::Io)
            }
            Self::Help => {
                if !ctx.quiet {
                    println!("cq - crudquery CLI");
                    println!("Use --help for usage information");
                }
                Ok(())
            }
        }
    }
}

fn dispatch_config(ctx: &CommandContext, command: &Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::execute_show(ctx),
        Some(ConfigCommands::Path) => commands::config::execute_path(ctx),
        Some(ConfigCommands::Init { force }) => commands::config::execute_init(ctx, *force),
    }
}

/// Commands that need a connection.
pub enum RemoteDispatch<'a> {
    Query(&'a QueryArgs),
}

impl<'a> RemoteDispatch<'a> {
    pub fn from_cli(cli: &'a Cli) -> Option<Self> {
        match &cli.command {
            Some(Commands::Query(args)) => Some(Self::Query(args)),
            _ => None,
        }
    }
}

impl RemoteCommand for RemoteDispatch<'_> {
    async fn execute(&self, ctx: &CommandContext, connection: &Connection) -> Result<()> {
        match self {
            Self::Query(args) => commands::query::execute(ctx, args, connection).await,
        }
    }
}
