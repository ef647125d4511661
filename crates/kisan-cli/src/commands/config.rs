//! Config command - View and manage Kisan configuration
//!
//! Provides the `kisan config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Prints the configuration file location

use anyhow::{Context, Result};
use clap::Subcommand;
use kisan_core::config::{Config, API_URL_ENV};
use tracing::info;

use super::CliContext;
use crate::output::OutputFormatter;

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("api.base_url", "Portal server URL"),
    ("api.timeout_secs", "Request timeout in seconds"),
    ("session.backend", "file|keyring|memory"),
    ("session.file", "Session file path (file backend)"),
    ("session.keyring_service", "Keyring service name"),
    ("session.keyring_user", "Keyring entry name"),
    ("logging.level", "trace|debug|info|warn|error"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "api.base_url")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => {
                let path = ctx.config_path.display().to_string();
                if ctx.is_json() {
                    ctx.formatter()
                        .print_json(&serde_json::json!({ "config_path": path }));
                } else {
                    println!("{path}");
                }
                Ok(())
            }
        }
    }

    fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        if std::env::var_os(API_URL_ENV).is_some() {
            formatter.info(&format!("api.base_url overridden by {API_URL_ENV}"));
        }
        formatter.info("");
        let yaml = serde_yaml::to_string(&ctx.config)
            .context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CliContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        // Start from the file, not the effective config, so env overrides are not persisted
        let mut config = Config::load_or_default(&ctx.config_path);

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = config.set_value(key, value) {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{key}': {e:#}"));
                print_supported_keys(&*formatter);
            }
            return Ok(());
        }

        let errors: Vec<String> = config
            .validate()
            .iter()
            .filter(|e| e.field == key)
            .map(|e| e.message.clone())
            .collect();
        if !errors.is_empty() {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{key}': {}", errors.join("; ")));
            }
            return Ok(());
        }

        config
            .save(&ctx.config_path)
            .context("Failed to write configuration file")?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {key} = {value}"));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = &ctx.config_path;

        let config = match Config::load(config_path) {
            Ok(config) => config.with_env_overrides(),
            Err(_) if !config_path.exists() => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": ["Configuration file not found. Using defaults."],
                    }));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info(
                        "Using default configuration. Run 'kisan config set <key> <value>' to create one.",
                    );
                }
                return Ok(());
            }
            Err(e) => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [format!("{e:#}")],
                    }));
                } else {
                    formatter.error(&format!("{e:#}"));
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");
        let errors = config.validate();

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }
}

fn print_supported_keys(formatter: &dyn OutputFormatter) {
    formatter.info("");
    formatter.info("Supported keys:");
    for (key, help) in SUPPORTED_KEYS {
        formatter.info(&format!("  {key:<26} - {help}"));
    }
}
