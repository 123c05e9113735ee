//! scopeql-lint - configuration and scope expression checker
//!
//! Validates an engine configuration file, or a single scope expression, with
//! the strict scope parser. Exits non-zero when any issue is found.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scopeql_authz::config::EngineConfig;
use scopeql_authz::schema::OperationKind;
use scopeql_authz::ScopeExpression;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

/// scopeql configuration linter
#[derive(Parser)]
#[command(name = "scopeql-lint")]
#[command(about = "Check scopeql configuration files and scope expressions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "scopeql.toml", env = "SCOPEQL_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Lint the configuration file (default)
    Check,

    /// Lint one scope expression and print its canonical form
    Scope {
        expression: String,
    },

    /// List configured schemas and their operations
    Schemas,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},scopeql_authz=info", log_level).into()),
        )
        .with_target(true)
        .init();

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => check(&cli.config),
        Command::Scope { expression } => scope(&expression),
        Command::Schemas => schemas(&cli.config),
    }
}

fn load(path: &Path) -> Result<EngineConfig> {
    debug!("Loading configuration from {}", path.display());
    EngineConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn check(path: &Path) -> Result<ExitCode> {
    let config = load(path)?;
    let issues = config.lint();

    if issues.is_empty() {
        info!("{}: {} schemas, no issues", path.display(), config.schemas.len());
        println!("{}: ok", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    for issue in &issues {
        println!("{}: {}", path.display(), issue);
    }
    println!("{} issue(s) found", issues.len());
    Ok(ExitCode::FAILURE)
}

fn scope(expression: &str) -> Result<ExitCode> {
    let errors = ScopeExpression::lint(expression);
    if errors.is_empty() {
        println!("{}", ScopeExpression::parse(expression));
        return Ok(ExitCode::SUCCESS);
    }

    for error in &errors {
        println!("{}", error);
    }
    Ok(ExitCode::FAILURE)
}

fn schemas(path: &Path) -> Result<ExitCode> {
    let config = load(path)?;

    for (name, schema) in &config.schemas {
        let marker = if config.default_schema.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("{}{} scope='{}'", name, marker, schema.scope);
        for kind in OperationKind::ALL {
            for (operation, reference) in schema.operations(kind) {
                println!("  {} {} -> {}", kind, operation, reference);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
