//! CLI command definitions and dispatch.

pub mod access;
pub mod cache;
pub mod config;
pub mod menu;
pub mod roles;

use clap::{Parser, Subcommand};
use tracing::debug;

use vocab_auth::RbacEnforcer;
use vocab_core::config::AppConfig;
use vocab_core::error::AppError;

use crate::output::OutputFormat;

/// Inspect the vocabulary client's access-control catalog.
#[derive(Debug, Parser)]
#[command(name = "vocab", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List roles with levels and resolved permissions
    Roles(roles::RolesArgs),
    /// Check whether a role may open a page or holds a permission
    Check(access::CheckArgs),
    /// List the roles a role may manage
    Manageable(access::ManageableArgs),
    /// Filter a menu file for a role
    Menu(menu::MenuArgs),
    /// Run a role's queries through the permission cache and show its counters
    Cache(cache::CacheArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Roles(args) => roles::execute(args, &self.config, self.format),
            Commands::Check(args) => access::check(args, &self.config, self.format),
            Commands::Manageable(args) => access::manageable(args, &self.config, self.format),
            Commands::Menu(args) => menu::execute(args, &self.config, self.format).await,
            Commands::Cache(args) => cache::execute(args, &self.config, self.format),
            Commands::Config(args) => config::execute(args, &self.config, self.format),
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    debug!(path = config_path, "Loading configuration");
    AppConfig::load_from(config_path)
}

/// Helper: build the evaluator from the configured catalog
pub fn load_enforcer(config_path: &str) -> Result<RbacEnforcer, AppError> {
    let config = load_config(config_path)?;
    let enforcer = RbacEnforcer::from_config(&config.catalog)?;
    debug!(roles = enforcer.policies().roles().count(), pages = enforcer.pages().len(), "Catalog loaded");
    Ok(enforcer)
}
