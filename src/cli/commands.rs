use crate::auth::{default_template_vars, register_token_controller, AUTH_SPEC_TEMPLATE};
use crate::error::SpecLoadError;
use crate::registry::OperationRegistry;
use crate::router::RouteTable;
use crate::runtime_config::RouterConfig;
use crate::server::{Request, RouterHandle, SpecSource};
use crate::spec::{build_operations, TemplateVars};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use http::Method;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::PathBuf;

/// Command-line interface for specrouter
#[derive(Parser, Debug)]
#[command(name = "specrouter", version)]
#[command(about = "Swagger 2.0 driven request router", long_about = None)]
pub struct Cli {
    /// Router configuration file (YAML, TOML or JSON)
    #[arg(long, global = true, env = "SPECROUTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Template selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct SpecArgs {
    /// Spec template; defaults to the configured one, then the bundled auth spec
    #[arg(short, long)]
    pub spec: Option<PathBuf>,

    /// Template variable as `name=value` (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a spec template and print every issue found
    Check {
        #[command(flatten)]
        spec: SpecArgs,
    },
    /// Print the route table a spec produces
    Routes {
        #[command(flatten)]
        spec: SpecArgs,

        /// Only mount routes under the base path
        #[arg(long, default_value_t = false)]
        no_bare: bool,
    },
    /// Run a single request through the router and print the response
    Dispatch {
        #[command(flatten)]
        spec: SpecArgs,

        #[arg(short = 'X', long, default_value = "POST")]
        method: String,

        /// Request target, query string included
        #[arg(short, long)]
        path: String,

        /// Header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Raw request body
        #[arg(short, long)]
        body: Option<String>,

        /// Environment entry as `NAME=VALUE` (repeatable)
        #[arg(long = "env", value_name = "NAME=VALUE")]
        env: Vec<String>,

        /// Extra auth user as `name:password` (repeatable)
        #[arg(long = "user", value_name = "NAME:PASSWORD")]
        users: Vec<String>,

        /// Include diagnostics in error responses
        #[arg(long, default_value_t = false)]
        debug: bool,
    },
}

/// Parse the process arguments and run the selected command.
///
/// Returns the process exit code.
pub fn run_cli() -> Result<i32> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(&cli, &mut stdout.lock())
}

/// Run `cli`, writing command output to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => RouterConfig::from_file(path)?,
        None => RouterConfig::default(),
    };
    config.apply_env()?;

    match &cli.command {
        Commands::Check { spec } => check(&config, spec, out),
        Commands::Routes { spec, no_bare } => {
            let source = resolve_source(&config, spec)?;
            let doc = source.load()?;
            let mut options = config.router_options();
            if *no_bare {
                options.mount_bare = false;
            }
            let table = RouteTable::build(&doc, &options)?;
            for line in table.describe() {
                writeln!(out, "{line}")?;
            }
            Ok(0)
        }
        Commands::Dispatch {
            spec,
            method,
            path,
            headers,
            body,
            env,
            users,
            debug,
        } => {
            for user in users {
                let (name, password) = user
                    .split_once(':')
                    .ok_or_else(|| anyhow!("--user expects name:password, got '{user}'"))?;
                config.auth.users.insert(name.to_string(), password.to_string());
            }
            let mut registry = OperationRegistry::new();
            register_token_controller(&mut registry, &config.auth)?;

            let mut options = config.router_options();
            options.debug |= *debug;
            // Operations without a handler answer 500 instead of aborting startup
            options.strict_handlers = false;

            let handle = RouterHandle::new(resolve_source(&config, spec)?, registry, options)?;
            let request = build_request(method, path, headers, body.as_deref(), env)?;
            let response = handle.handle(&request);

            let mut shown_headers = Map::new();
            for (name, value) in &response.headers {
                shown_headers.insert(name.to_string(), Value::String(value.clone()));
            }
            let printed = json!({
                "status": response.status,
                "headers": shown_headers,
                "body": response.body,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&printed)?)?;
            Ok(0)
        }
    }
}

fn check(config: &RouterConfig, spec: &SpecArgs, out: &mut dyn Write) -> Result<i32> {
    let source = resolve_source(config, spec)?;
    let doc = match source.load() {
        Ok(doc) => doc,
        Err(SpecLoadError::Invalid(issues)) => {
            for issue in &issues {
                writeln!(out, "[{}] {}: {}", issue.kind, issue.location, issue.message)?;
            }
            writeln!(out, "{} issue(s) found", issues.len())?;
            return Ok(1);
        }
        Err(e) => {
            writeln!(out, "error: {e}")?;
            return Ok(1);
        }
    };
    match build_operations(&doc) {
        Ok(ops) => {
            writeln!(
                out,
                "ok: {} operation(s), base path '{}', version {}",
                ops.len(),
                doc.base_path(),
                doc.version()
            )?;
            Ok(0)
        }
        Err(e) => {
            writeln!(out, "error: {e}")?;
            Ok(1)
        }
    }
}

/// `--spec` wins over the configured path; with neither, the bundled auth
/// template is used.
fn resolve_source(config: &RouterConfig, args: &SpecArgs) -> Result<SpecSource> {
    let mut vars = config.template_vars.clone();
    for raw in &args.vars {
        let (name, value) = parse_pair(raw, '=', "--var")?;
        vars.insert(name.to_string(), Value::String(value.to_string()));
    }
    match args.spec.as_ref().or(config.spec_path.as_ref()) {
        Some(path) => Ok(SpecSource::file(path, vars)),
        None => {
            let mut merged: TemplateVars = default_template_vars();
            merged.extend(vars);
            Ok(SpecSource::inline(AUTH_SPEC_TEMPLATE, merged))
        }
    }
}

fn build_request(
    method: &str,
    target: &str,
    headers: &[String],
    body: Option<&str>,
    env: &[String],
) -> Result<Request> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{method}'"))?;
    let mut request = Request::new(method, target);
    for raw in headers {
        let (name, value) = parse_pair(raw, ':', "--header")?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(body) = body {
        if request.content_type().is_none() {
            request = request.with_header("Content-Type", "application/json");
        }
        request = request.with_body(body.as_bytes().to_vec());
    }
    for raw in env {
        let (name, value) = parse_pair(raw, '=', "--env")?;
        request = request.with_env(name, value);
    }
    Ok(request)
}

fn parse_pair<'a>(raw: &'a str, sep: char, flag: &str) -> Result<(&'a str, &'a str)> {
    match raw.split_once(sep) {
        Some((name, value)) if !name.trim().is_empty() => Ok((name, value)),
        _ => Err(anyhow!("{flag} expects NAME{sep}VALUE, got '{raw}'")),
    }
}
