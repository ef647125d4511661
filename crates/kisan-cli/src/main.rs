//! Kisan CLI - Command-line client for the subsidy portal
//!
//! Provides commands for:
//! - Farmer accounts (register, login, password recovery, profile)
//! - Browsing subsidy programs and checking eligibility
//! - Submitting and tracking applications
//! - Reviewing applications as an administrator

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    admin::AdminCommand,
    applications::{ApplicationsCommand, ApplyCommand},
    auth::AuthCommand,
    completions::CompletionsCommand,
    config::ConfigCommand,
    profile::ProfileCommand,
    programs::ProgramsCommand,
    CliContext,
};
use kisan_core::config::Config;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "kisan", version, about = "Client for the Kisan farmer subsidy portal")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Account and session commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Update the logged-in user's profile
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Browse subsidy programs
    #[command(subcommand)]
    Programs(ProgramsCommand),
    /// Submit a new application
    Apply(ApplyCommand),
    /// View your applications
    #[command(subcommand)]
    Applications(ApplicationsCommand),
    /// Review applications (administrators)
    #[command(subcommand)]
    Admin(AdminCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path).with_env_overrides();

    // RUST_LOG wins, then -v, then the configured level
    let filter = match cli.verbose {
        0 if cli.quiet => "warn".to_string(),
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext::new(format, cli.quiet, config_path, config);

    let result = match &cli.command {
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
        Commands::Profile(cmd) => cmd.execute(&ctx).await,
        Commands::Programs(cmd) => cmd.execute(&ctx).await,
        Commands::Apply(cmd) => cmd.execute(&ctx).await,
        Commands::Applications(cmd) => cmd.execute(&ctx).await,
        Commands::Admin(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    };

    if let Err(e) = &result {
        if ctx.expire_session_if_needed(e) {
            let fmt = get_formatter(cli.json);
            fmt.error("Your session has expired. Run 'kisan auth login' to sign in again.");
            std::process::exit(1);
        }
    }

    result
}
