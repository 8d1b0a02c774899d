//! Unit tests for CLI commands

use crate::cli::{run, Cli, Commands};
use clap::Parser;
use serde_json::Value;
use std::io::Write;

fn run_args(args: &[&str]) -> (i32, String) {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    let code = run(&cli, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

fn write_spec(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn test_dispatch_command_parses() {
    let cli = Cli::try_parse_from([
        "specrouter",
        "dispatch",
        "--path",
        "/auth/v1/tokens",
        "-H",
        "Authorization: Basic dXNlcjpwYXNz",
        "--env",
        "REMOTE_ADDR=10.0.0.1",
        "--debug",
    ])
    .unwrap();

    match cli.command {
        Commands::Dispatch {
            spec,
            method,
            path,
            headers,
            env,
            debug,
            ..
        } => {
            assert!(spec.spec.is_none());
            assert_eq!(method, "POST");
            assert_eq!(path, "/auth/v1/tokens");
            assert_eq!(headers, vec!["Authorization: Basic dXNlcjpwYXNz"]);
            assert_eq!(env, vec!["REMOTE_ADDR=10.0.0.1"]);
            assert!(debug);
        }
        other => panic!("Expected Dispatch command, got {other:?}"),
    }
}

#[test]
fn test_check_bundled_spec() {
    let (code, out) = run_args(&["specrouter", "check"]);
    assert_eq!(code, 0, "{out}");
    assert!(out.starts_with("ok: 1 operation(s), base path '/auth/v1'"));
}

#[test]
fn test_check_reports_issues() {
    let spec = write_spec(
        "swagger: '2.0'\ninfo: {title: t, version: '1'}\npaths:\n  /items/{id}:\n    get:\n      responses: {'200': {description: ok}}\n",
    );
    let (code, out) = run_args(&["specrouter", "check", "--spec", spec.path().to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(out.contains("issue(s) found"), "{out}");
}

#[test]
fn test_routes_with_vars() {
    let (code, out) = run_args(&["specrouter", "routes", "--var", "base_path=/api"]);
    assert_eq!(code, 0);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "POST /api/tokens -> specrouter.auth.controller:token_controller.post",
            "POST /tokens -> specrouter.auth.controller:token_controller.post",
        ]
    );

    let (_, out) = run_args(&["specrouter", "routes", "--no-bare"]);
    assert_eq!(out.lines().count(), 1);
}

#[test]
fn test_dispatch_issues_token() {
    let (code, out) = run_args(&[
        "specrouter",
        "dispatch",
        "--user",
        "user:pass",
        "--path",
        "/auth/v1/tokens",
        "-H",
        "Authorization: Basic dXNlcjpwYXNz",
        "--body",
        "{\"ttl\": 60}",
    ]);
    assert_eq!(code, 0);
    let printed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(printed["status"], 201);
    assert_eq!(printed["body"]["user"], "user");
    assert_eq!(printed["body"]["ttl"], 60);
}

#[test]
fn test_dispatch_without_credentials() {
    let (_, out) = run_args(&["specrouter", "dispatch", "--path", "/tokens"]);
    let printed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(printed["status"], 401);
    assert_eq!(printed["body"]["faultstring"], "Invalid or missing credentials");
}

#[test]
fn test_bad_pairs_are_rejected() {
    let cli = Cli::try_parse_from(["specrouter", "routes", "--var", "novalue"]).unwrap();
    let mut out = Vec::new();
    assert!(run(&cli, &mut out).is_err());
}
