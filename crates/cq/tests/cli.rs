//! End-to-end tests for the `cq` binary.
//!
//! Every scenario here runs offline: local commands and `query --dry-run`.
//! Each invocation gets its own config path so the user's config is never read.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

struct CliContext {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl CliContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cq").join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_cq"));
        command
            .args(["--no-color"])
            .args(args)
            .env("CQ_CONFIG", &self.config_path)
            .env_remove("CQ_TOKEN")
            .env_remove("CQ_BASE_URL")
            .env_remove("RUST_LOG");
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().unwrap()
    }

    fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        child.wait_with_output().unwrap()
    }

    fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_serialize_descriptor_file() {
    let cli = CliContext::new();
    let file = cli.write_file(
        "filter.json",
        r#"[
            {"property": "Precio", "operator": "GreaterThan", "value": 100},
            {
                "relationshipPath": "Etiquetas",
                "operator": "Related",
                "cardinality": "Many",
                "nestedFilters": [{"property": "Nombre", "operator": "Equals", "value": "oferta"}]
            }
        ]"#,
    );

    let json = stdout_json(&cli.run(&["--json", "serialize", path_str(&file)]));
    assert_eq!(
        json["filter"],
        r#"Precio > 100 && Etiquetas != null && Etiquetas.Any(x1 => x1.Nombre == "oferta")"#
    );
    assert_eq!(json["include"], serde_json::json!(["Etiquetas"]));
}

#[test]
fn test_serialize_from_stdin_human_output() {
    let cli = CliContext::new();
    let output = cli.run_with_stdin(
        &["serialize", "-"],
        r#"{"property": "Nombre", "operator": "Contains", "value": "ana"}"#,
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(r#"Filter: Nombre.Contains("ana")"#));
    assert!(stdout.contains("Include: (none)"));
}

#[test]
fn test_serialize_ignore_case_folds_text() {
    let cli = CliContext::new();
    let output = cli.run_with_stdin(
        &["--json", "serialize", "--ignore-case", "-"],
        r#"{"property": "Nombre", "operator": "Contains", "value": "Ana"}"#,
    );
    let json = stdout_json(&output);
    assert_eq!(json["filter"], r#"Nombre.ToLower().Contains("ana")"#);
}

#[test]
fn test_parse_keeps_case_folding() {
    let cli = CliContext::new();
    let json = stdout_json(&cli.run(&[
        "--json",
        "parse",
        r#"Nombre.ToLower() == "ana" && Stock > 0"#,
    ]));
    assert_eq!(json["normalized"], r#"(Nombre.ToLower() == "ana" && Stock > 0)"#);
    assert_eq!(json["descriptor"]["children"][0]["value"], "ana");
}

#[test]
fn test_parse_normalizes_text() {
    let cli = CliContext::new();
    let json = stdout_json(&cli.run(&["--json", "parse", "(Stock > 0) && Region != null"]));
    assert_eq!(json["normalized"], "(Stock > 0 && Region != null)");
}

#[test]
fn test_parse_error_exit_code_and_json_error() {
    let cli = CliContext::new();
    let output = cli.run(&["--json", "parse", "Stock >"]);
    assert_eq!(output.status.code(), Some(1));
    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "FILTER_ERROR");
}

#[test]
fn test_query_dry_run_prints_request() {
    let cli = CliContext::new();
    let json = stdout_json(&cli.run(&[
        "--json",
        "--base-url",
        "http://localhost:9/api",
        "query",
        "Producto",
        "--where",
        "Stock > 0",
        "--search",
        "ana",
        "--field",
        "Nombre",
        "--take",
        "5",
        "--paged",
        "--dry-run",
    ]));
    assert_eq!(
        json["endpoint"],
        "http://localhost:9/api/query/Producto/search-paged"
    );
    assert_eq!(json["body"]["searchTerm"], "ana");
    assert_eq!(json["body"]["baseQuery"]["filter"], "Stock > 0");
    assert_eq!(json["body"]["baseQuery"]["take"], 5);
}

#[test]
fn test_query_base_url_from_config() {
    let cli = CliContext::new();
    let init = cli.run(&["--quiet", "config", "init"]);
    assert!(init.status.success());
    let mut config = std::fs::read_to_string(&cli.config_path).unwrap();
    config = config.replace(
        "# base_url = \"https://erp.example.com/api\"",
        "base_url = \"https://erp.example.com/api\"",
    );
    std::fs::write(&cli.config_path, config).unwrap();

    let json = stdout_json(&cli.run(&["--json", "query", "Cliente", "--dry-run"]));
    assert_eq!(
        json["endpoint"],
        "https://erp.example.com/api/query/Cliente/query"
    );
    assert_eq!(json["body"]["filter"], Value::Null);
}

#[test]
fn test_query_without_base_url_is_config_error() {
    let cli = CliContext::new();
    let output = cli.run(&["query", "Producto", "--dry-run"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No base URL configured"));
}

#[test]
fn test_config_init_and_path() {
    let cli = CliContext::new();
    assert!(cli.run(&["config", "init"]).status.success());
    assert!(cli.config_path.exists());

    let again = cli.run(&["config", "init"]);
    assert_eq!(again.status.code(), Some(5));

    let json = stdout_json(&cli.run(&["--json", "config", "path"]));
    assert_eq!(json["path"], path_str(&cli.config_path));
    assert_eq!(json["exists"], true);
}
