//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use vocab_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,
    /// Validate configuration and catalog
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            match format {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => {
                    output::print_kv("api.base_url", &config.api.base_url);
                    output::print_kv("api.ws_base_url", &config.api.ws_base_url);
                    output::print_kv("cache.enabled", &config.cache.enabled.to_string());
                    output::print_kv("cache.max_capacity", &config.cache.max_capacity.to_string());
                    output::print_kv(
                        "cache.default_ttl_seconds",
                        &config.cache.default_ttl_seconds.to_string(),
                    );
                    output::print_kv("sync.enabled", &config.sync.enabled.to_string());
                    output::print_kv(
                        "sync.max_reconnect_attempts",
                        &config.sync.max_reconnect_attempts.to_string(),
                    );
                    output::print_kv("sync.menu_positions", &config.sync.menu_positions.join(", "));
                    output::print_kv("guard.login_path", &config.guard.login_path);
                    output::print_kv("storage.provider", &config.storage.provider);
                    output::print_kv(
                        "catalog.path",
                        config.catalog.path.as_deref().unwrap_or("(built-in)"),
                    );
                    output::print_kv("catalog.unknown_page", &config.catalog.unknown_page);
                    output::print_kv("logging.level", &config.logging.level);
                }
            }
        }
        ConfigCommand::Validate => {
            let config = super::load_config(config_path)?;
            let enforcer = vocab_auth::RbacEnforcer::from_config(&config.catalog)?;
            output::print_verdict(true, &format!("Configuration '{}' is valid", config_path));
            output::print_kv("roles", &enforcer.policies().roles().count().to_string());
            output::print_kv("pages", &enforcer.pages().len().to_string());
        }
    }

    Ok(())
}
