//! Config command implementation.
//!
//! View and manage configuration settings.
//! Config file is located at ~/.config/cq/config.toml.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crudquery_core::CaseSensitivity;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CommandContext, CommandError, Result};

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Minimum token length to apply masking (show first and last N characters).
const TOKEN_MASK_MIN_LENGTH: usize = 8;

/// Number of characters to show at start/end of a masked token.
const TOKEN_MASK_VISIBLE_CHARS: usize = 4;

/// Default config file contents.
const DEFAULT_CONFIG: &str = r#"# cq - crudquery CLI configuration

# Config schema version (do not modify)
version = 1

# Base URL of the query endpoints, including any /api prefix
# (can also use CQ_BASE_URL env var)
# base_url = "https://erp.example.com/api"

# Bearer token (can also use CQ_TOKEN env var)
# token = "your-api-token-here"

# Per-request timeout in seconds
# timeout_secs = 30

[query]
# "insensitive" (default) or "sensitive"
# case_sensitivity = "insensitive"
"#;

/// Configuration file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Config schema version for migrations.
    /// Defaults to current version when not present in file.
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer token (optional, can use env var instead).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Query defaults.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Returns the current config version (used by serde default).
fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            base_url: None,
            token: None,
            timeout_secs: None,
            query: QueryConfig::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Query configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    /// `"sensitive"` or `"insensitive"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitivity: Option<String>,
}

impl QueryConfig {
    /// The configured case sensitivity, defaulting to case-insensitive.
    pub fn case_sensitivity(&self) -> Result<CaseSensitivity> {
        match self.case_sensitivity.as_deref() {
            None => Ok(CaseSensitivity::default()),
            Some(value) => parse_case_sensitivity(value),
        }
    }
}

/// Gets the config directory path.
/// Uses XDG-style paths: ~/.config/cq/ on all platforms.
fn get_config_dir() -> Result<PathBuf> {
    // Check for override env var first
    if let Ok(path) = env::var("CQ_CONFIG") {
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent() {
            return Ok(parent.to_path_buf());
        }
    }

    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("cq"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("cq"))
        .ok_or_else(|| {
            CommandError::Config("Could not determine config directory".to_string())
        })
}

/// Gets the config file path.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var("CQ_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let config_dir = get_config_dir()?;
    Ok(config_dir.join("config.toml"))
}

/// Loads the configuration from disk.
///
/// A missing file yields the default configuration.
pub fn load_config() -> Result<Config> {
    let path = get_config_path()?;

    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| CommandError::Config(format!("Failed to read config: {}", e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| CommandError::Config(format!("Failed to parse config: {}", e)))?;

    migrate_config(config)
}

/// Migrates config to current version if needed.
fn migrate_config(mut config: Config) -> Result<Config> {
    // Version 1 is the initial schema.
    config.version = CONFIG_VERSION;
    Ok(config)
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let config = load_config()?;
    let path = get_config_path()?;

    if ctx.json_output {
        let mut shown = serde_json::to_value(&config)?;
        if let Some(token) = &config.token {
            shown["token"] = serde_json::Value::String(mask_token(token));
        }
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": shown,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        use owo_colors::OwoColorize;

        let header = "Configuration";
        if ctx.use_colors {
            println!("{}\n", header.green().bold());
        } else {
            println!("{}\n", header);
        }

        println!("File: {}", path.display());
        println!("Exists: {}\n", path.exists());

        if path.exists() {
            println!("Settings:");
            if let Some(ref base_url) = config.base_url {
                println!("  base_url: {}", base_url);
            }
            if let Some(ref token) = config.token {
                println!("  token: {}", mask_token(token));
            }
            if let Some(timeout) = config.timeout_secs {
                println!("  timeout_secs: {}", timeout);
            }

            println!("\n[query]");
            if let Some(ref case) = config.query.case_sensitivity {
                println!("  case_sensitivity: {}", case);
            }
        } else {
            println!("(No config file exists. Run 'cq config init' to create one.)");
        }
    }

    Ok(())
}

/// Executes the config init command.
pub fn execute_init(ctx: &CommandContext, force: bool) -> Result<()> {
    let path = get_config_path()?;

    if path.exists() && !force {
        return Err(CommandError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            CommandError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    fs::write(&path, DEFAULT_CONFIG)
        .map_err(|e| CommandError::Config(format!("Failed to write config: {}", e)))?;

    if ctx.json_output {
        let output = serde_json::json!({
            "status": "success",
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("Created default config at: {}", path.display());
    }

    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

/// Masks a token for display, showing only the first and last N characters.
///
/// Uses character-based (not byte-based) indexing to safely handle
/// multi-byte UTF-8 characters.
fn mask_token(token: &str) -> String {
    let char_count = token.chars().count();
    if char_count > TOKEN_MASK_MIN_LENGTH {
        let prefix: String = token.chars().take(TOKEN_MASK_VISIBLE_CHARS).collect();
        let suffix: String = token
            .chars()
            .skip(char_count - TOKEN_MASK_VISIBLE_CHARS)
            .collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "****".to_string()
    }
}

/// Parses a case sensitivity setting.
fn parse_case_sensitivity(s: &str) -> Result<CaseSensitivity> {
    match s.to_lowercase().as_str() {
        "sensitive" | "case_sensitive" => Ok(CaseSensitivity::CaseSensitive),
        "insensitive" | "case_insensitive" => Ok(CaseSensitivity::CaseInsensitive),
        _ => Err(CommandError::Config(format!(
            "Invalid case_sensitivity value '{}'. Valid values: sensitive, insensitive",
            s
        ))),
    }
}
