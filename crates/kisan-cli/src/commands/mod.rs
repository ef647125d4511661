//! CLI subcommands and the context they share

pub mod admin;
pub mod applications;
pub mod auth;
pub mod completions;
pub mod config;
pub mod profile;
pub mod programs;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use kisan_api::{
    client::ApiClient, credentials::open_store, review::ReviewCoordinator,
    session::SessionManager, workflow::ApplicationWorkflow, ApiError,
};
use kisan_core::{config::Config, ports::ICredentialStore};
use tracing::{debug, warn};

use crate::output::{formatter_for, OutputFormat, OutputFormatter};

/// Settings resolved from global flags and the configuration file
pub struct CliContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CliContext {
    pub fn new(format: OutputFormat, quiet: bool, config_path: PathBuf, config: Config) -> Self {
        Self {
            format,
            quiet,
            config_path,
            config,
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        formatter_for(self.format, self.quiet)
    }

    fn store(&self) -> Arc<dyn ICredentialStore> {
        open_store(&self.config.session)
    }

    /// Session manager backed by the configured credential store
    pub fn session(&self) -> Result<Arc<SessionManager>> {
        let client = ApiClient::from_config(&self.config.api)
            .context("Failed to create HTTP client")?;
        debug!(base_url = %client.base_url(), backend = %self.config.session.backend, "Opening session");
        Ok(Arc::new(SessionManager::new(client, self.store())))
    }

    pub fn workflow(&self) -> Result<ApplicationWorkflow> {
        Ok(ApplicationWorkflow::new(self.session()?))
    }

    pub fn reviews(&self) -> Result<ReviewCoordinator> {
        Ok(ReviewCoordinator::new(self.workflow()?))
    }

    /// Clears the stored session when `error` means the user must log in
    /// again; returns whether it did
    pub fn expire_session_if_needed(&self, error: &anyhow::Error) -> bool {
        let expired = error
            .chain()
            .filter_map(|cause| cause.downcast_ref::<ApiError>())
            .any(ApiError::requires_login);
        if expired {
            if let Err(e) = self.store().clear() {
                warn!(error = %e, "Failed to clear stored session");
            }
        }
        expired
    }
}

/// Prints `value` as JSON, or each line of `human` otherwise
pub(crate) fn emit<T: serde::Serialize>(
    ctx: &CliContext,
    value: &T,
    human: impl FnOnce(&dyn OutputFormatter),
) -> Result<()> {
    let fmt = ctx.formatter();
    if ctx.is_json() {
        let json = serde_json::to_value(value).context("Failed to serialize output")?;
        fmt.print_json(&json);
    } else {
        human(&*fmt);
    }
    Ok(())
}
