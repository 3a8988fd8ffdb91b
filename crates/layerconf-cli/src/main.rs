//! Layerconf CLI - resolve layered configuration files
//!
//! Reads one or more configuration files, follows their parent chains,
//! applies environment overrides and `%{..}` / `@{..}` substitution, and
//! prints the resolved tree.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use layerconf_core::{ConfigError, ResolveOptions};
use layerconf_loader::{ReadOptions, read_config};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Layerconf - layered configuration resolver
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "layerconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration references, merged left to right
    #[arg(required = true)]
    paths: Vec<String>,

    /// Directory to search for relative references (repeatable)
    #[arg(long = "basedir", value_name = "DIR")]
    basedirs: Vec<PathBuf>,

    /// Reference or glob that may be missing (repeatable)
    #[arg(long, value_name = "PATTERN")]
    optional: Vec<String>,

    /// Key naming a file's parent
    #[arg(long, default_value = layerconf_core::options::DEFAULT_PARENT_FIELD)]
    parent_field: String,

    /// Disable parent resolution
    #[arg(long, conflicts_with = "parent_field")]
    no_parent: bool,

    /// Marker for environment variable expressions
    #[arg(long, default_value = layerconf_core::options::DEFAULT_ENV_MARKER)]
    env_marker: String,

    /// Disable environment substitution
    #[arg(long, conflicts_with = "env_marker")]
    no_env: bool,

    /// Marker for self-reference expressions
    #[arg(long, default_value = layerconf_core::options::DEFAULT_LOCAL_MARKER)]
    local_marker: String,

    /// Disable self-reference substitution
    #[arg(long, conflicts_with = "local_marker")]
    no_local: bool,

    /// Environment variable prefix for overrides (e.g. APP for APP_server_port)
    #[arg(long = "override", value_name = "PREFIX")]
    override_marker: Option<String>,

    /// Leave unresolved expressions as placeholders instead of failing
    #[arg(long)]
    skip_unresolved: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Print only the value at this dotted path
    #[arg(long, value_name = "PATH")]
    get: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Toml,
}

impl Cli {
    fn read_options(&self) -> ReadOptions {
        let resolve = ResolveOptions::default()
            .with_parent_field((!self.no_parent).then_some(self.parent_field.as_str()))
            .with_replace_env((!self.no_env).then_some(self.env_marker.as_str()))
            .with_replace_local((!self.no_local).then_some(self.local_marker.as_str()))
            .with_override(self.override_marker.as_deref())
            .with_skip_unresolved(self.skip_unresolved);
        let resolve = self
            .optional
            .iter()
            .fold(resolve, |options, pattern| options.with_optional(pattern.as_str()));

        ReadOptions {
            basedirs: self.basedirs.clone(),
            resolve,
        }
    }
}

fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Toml => {
            toml::to_string_pretty(value).context("value cannot be represented as TOML")?
        },
    };
    Ok(rendered.trim_end().to_owned())
}

fn run(cli: &Cli) -> Result<String> {
    let resolved = read_config(&cli.paths, &cli.read_options())?;

    match &cli.get {
        Some(path) => {
            let value = resolved
                .get(path.as_str())
                .ok_or_else(|| anyhow!("no value at '{path}'"))?;
            render(value, cli.format)
        },
        None => render(&resolved, cli.format),
    }
}

/// One-line error report: the taxonomy code when known, then every cause.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ConfigError>() {
        Some(config_err) => format!("error [{}]: {err:#}", config_err.kind()),
        None => format!("error: {err:#}"),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{}", describe(&err));
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use layerconf_core::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("layerconf").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_map_to_resolve_defaults() {
        let cli = parse(&["app"]);
        assert_eq!(cli.read_options(), ReadOptions::default());
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = parse(&[
            "--basedir",
            "/etc/app",
            "--basedir",
            "conf",
            "--optional",
            "local",
            "--optional",
            "envs/*",
            "--parent-field",
            "extends",
            "--no-env",
            "--local-marker",
            "$",
            "--override",
            "APP",
            "--skip-unresolved",
            "--format",
            "yaml",
            "app",
            "extra",
        ]);
        let options = cli.read_options();

        assert_eq!(cli.paths, vec!["app", "extra"]);
        assert_eq!(
            options.basedirs,
            vec![PathBuf::from("/etc/app"), PathBuf::from("conf")]
        );
        assert_eq!(options.resolve.optional, vec!["local", "envs/*"]);
        assert_eq!(options.resolve.parent_field(), Some("extends"));
        assert_eq!(options.resolve.replace_env, None);
        assert_eq!(options.resolve.replace_local.as_deref(), Some("$"));
        assert_eq!(options.resolve.override_marker(), Some("APP"));
        assert!(options.resolve.skip_unresolved);
        assert!(!options.resolve.freeze);
        assert_eq!(cli.format, OutputFormat::Yaml);
    }

    #[test]
    fn test_no_parent_disables_field() {
        let cli = parse(&["--no-parent", "--no-local", "app"]);
        let options = cli.read_options();
        assert_eq!(options.resolve.parent_field(), None);
        assert_eq!(options.resolve.replace_local, None);
    }

    #[test]
    fn test_paths_required() {
        assert!(Cli::try_parse_from(["layerconf"]).is_err());
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        let result = Cli::try_parse_from(["layerconf", "--no-env", "--env-marker", "$", "app"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_prints_value_and_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("base.yaml"), "server:\n  port: 8080\n").unwrap();
        std::fs::write(
            dir.path().join("app.json"),
            r#"{"__parent": "base", "name": "svc", "url": "http://host:@{server.port}"}"#,
        )
        .unwrap();
        let basedir = dir.path().display().to_string();

        let cli = parse(&["--no-env", "--basedir", &basedir, "--get", "url", "app"]);
        assert_eq!(run(&cli).unwrap(), "\"http://host:8080\"");

        let cli = parse(&["--no-env", "--basedir", &basedir, "--format", "toml", "app"]);
        let output = run(&cli).unwrap();
        assert!(output.contains("name = \"svc\""));
        assert!(output.contains("[server]"));
        assert!(!output.contains("__parent"));
    }

    #[test]
    fn test_run_surfaces_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let basedir = dir.path().display().to_string();
        let cli = parse(&["--basedir", &basedir, "missing"]);

        let err = run(&cli).unwrap_err();

        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(config_err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_error_report_includes_parser_cause() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "a: [unclosed").unwrap();
        let basedir = dir.path().display().to_string();
        let cli = parse(&["--basedir", &basedir, "bad"]);

        let err = run(&cli).unwrap_err();
        let report = describe(&err);

        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        let cause = std::error::Error::source(config_err).unwrap().to_string();
        assert!(report.starts_with("error [PARSE_ERROR]: Failed to parse configuration file: "));
        assert!(report.contains("bad.yaml"));
        assert!(report.contains(&cause), "{report}");
    }

    #[test]
    fn test_get_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.toml"), "a = 1\n").unwrap();
        let basedir = dir.path().display().to_string();
        let cli = parse(&["--basedir", &basedir, "--get", "b.c", "app"]);

        let err = run(&cli).unwrap_err();

        assert!(err.to_string().contains("b.c"));
    }

    #[test]
    fn test_render_formats() {
        let value = serde_json::json!({"a": {"b": [1, 2]}});
        assert_eq!(
            render(&value, OutputFormat::Json).unwrap(),
            "{\n  \"a\": {\n    \"b\": [\n      1,\n      2\n    ]\n  }\n}"
        );
        assert_eq!(render(&value, OutputFormat::Yaml).unwrap(), "a:\n  b:\n  - 1\n  - 2");
        assert!(render(&value, OutputFormat::Toml).unwrap().contains("b = ["));
    }
}
