use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod dispatch;
mod output;

use cli::Cli;
use commands::config::load_config;
use commands::query::Connection;
use commands::{CommandContext, CommandError};
use dispatch::{LocalCommand, LocalDispatch, RemoteCommand, RemoteDispatch};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": {
                        "code": error_code(&e),
                        "message": e.to_string(),
                    }
                });
                match serde_json::to_string_pretty(&error_json) {
                    Ok(text) => eprintln!("{text}"),
                    Err(_) => eprintln!("{error_json}"),
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(error_exit_code(&e))
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `--verbose` forces `debug`; otherwise `RUST_LOG` applies, defaulting to `warn`.
fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .try_init();
}

async fn run(cli: &Cli) -> commands::Result<()> {
    let ctx = CommandContext::from_cli(cli);

    if let Some(dispatch) = LocalDispatch::try_from_cli(cli) {
        return dispatch.execute(&ctx);
    }

    let connection = resolve_connection(cli)?;
    match RemoteDispatch::from_cli(cli) {
        Some(dispatch) => dispatch.execute(&ctx, &connection).await,
        None => Ok(()),
    }
}

/// Resolves the connection with priority: flag > env > config file.
fn resolve_connection(cli: &Cli) -> commands::Result<Connection> {
    let config = load_config()?;
    Connection::resolve(cli.base_url.as_deref(), cli.token.as_deref(), &config)
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    use crudquery_client::Error as ClientError;

    match e {
        CommandError::Filter(_) => "FILTER_ERROR",
        CommandError::Client(ClientError::Query(_) | ClientError::EmptyProjection) => {
            "FILTER_ERROR"
        }
        CommandError::Client(ClientError::Remote(_)) => "REMOTE_ERROR",
        CommandError::Client(ClientError::Decode(_)) => "DECODE_ERROR",
        CommandError::Client(ClientError::Network(_)) => "NETWORK_ERROR",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// Returns the exit code for an error.
fn error_exit_code(e: &CommandError) -> u8 {
    match e {
        CommandError::Filter(_) => 1,
        CommandError::Client(err) => u8::try_from(err.exit_code()).unwrap_or(1),
        CommandError::Config(_) => 5,
        CommandError::Io(_) => 3,
        CommandError::Json(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["cq"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    /// Runs `f` with CQ_CONFIG pointing at a config file holding `contents`,
    /// and with the connection env vars cleared.
    fn with_config<R>(contents: &str, f: impl FnOnce() -> R) -> R {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, contents).unwrap();

        let saved: Vec<(&str, Option<String>)> = ["CQ_CONFIG", "CQ_TOKEN", "CQ_BASE_URL"]
            .into_iter()
            .map(|key| (key, env::var(key).ok()))
            .collect();
        env::set_var("CQ_CONFIG", &config_path);
        env::remove_var("CQ_TOKEN");
        env::remove_var("CQ_BASE_URL");

        let result = f();

        for (key, value) in saved {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
        result
    }

    #[test]
    #[serial]
    fn test_resolve_connection_from_config() {
        let connection = with_config(
            "base_url = \"http://localhost/api\"\ntoken = \"config-token\"\n",
            || resolve_connection(&cli(&["query", "Producto"])),
        )
        .unwrap();
        assert_eq!(connection.base_url, "http://localhost/api");
        assert_eq!(connection.token.as_deref(), Some("config-token"));
    }

    #[test]
    #[serial]
    fn test_resolve_connection_flag_overrides_config() {
        let connection = with_config("base_url = \"http://localhost/api\"\n", || {
            resolve_connection(&cli(&[
                "--base-url",
                "http://other/api",
                "--token",
                "flag-token",
                "query",
                "Producto",
            ]))
        })
        .unwrap();
        assert_eq!(connection.base_url, "http://other/api");
        assert_eq!(connection.token.as_deref(), Some("flag-token"));
    }

    #[test]
    #[serial]
    fn test_resolve_connection_without_base_url() {
        let result = with_config("", || resolve_connection(&cli(&["query", "Producto"])));
        assert!(matches!(result, Err(CommandError::Config(_))));
    }

    #[test]
    fn test_error_codes_and_exit_codes() {
        let filter: CommandError = crudquery_core::InvalidFilterError::SearchNotLocal.into();
        assert_eq!(error_code(&filter), "FILTER_ERROR");
        assert_eq!(error_exit_code(&filter), 1);

        let remote: CommandError =
            crudquery_client::Error::from(crudquery_client::RemoteQueryError::new(400, "bad"))
                .into();
        assert_eq!(error_code(&remote), "REMOTE_ERROR");
        assert_eq!(error_exit_code(&remote), 2);

        let local: CommandError = crudquery_client::Error::EmptyProjection.into();
        assert_eq!(error_code(&local), "FILTER_ERROR");
        assert_eq!(error_exit_code(&local), 1);

        let config = CommandError::Config("missing".to_string());
        assert_eq!(error_code(&config), "CONFIG_ERROR");
        assert_eq!(error_exit_code(&config), 5);

        let io: CommandError = std::io::Error::other("gone").into();
        assert_eq!(error_exit_code(&io), 3);
    }
}
