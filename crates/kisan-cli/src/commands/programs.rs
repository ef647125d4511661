//! Programs command - Browse the subsidy program catalog
//!
//! Provides the `kisan programs` CLI subcommands which:
//! 1. `list`  - Lists active programs, optionally filtered by crop, season
//!    and land size.
//! 2. `show`  - Shows one program.
//! 3. `match` - Lists the programs the logged-in farmer is eligible for.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use kisan_api::programs::{ProgramCatalog, ProgramFilter};
use kisan_core::domain::{Acreage, Crop, Program, ProgramId, Season};
use tracing::info;

use super::{emit, CliContext};
use crate::output::OutputFormatter;

#[derive(Debug, Subcommand)]
pub enum ProgramsCommand {
    /// List active programs
    List(FilterArgs),
    /// Show one program
    Show {
        /// Program ID
        id: ProgramId,
    },
    /// List programs you are eligible for
    Match(FilterArgs),
}

/// Catalog filter flags
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Crop name or ID (e.g. wheat or 2)
    #[arg(long)]
    crop: Option<Crop>,
    /// Season: any, kharif, rabi, zaid
    #[arg(long)]
    season: Option<Season>,
    /// Land size in acres
    #[arg(long)]
    land_size: Option<f64>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<ProgramFilter> {
        let land_size = self
            .land_size
            .map(Acreage::new)
            .transpose()
            .context("Invalid --land-size")?;
        Ok(ProgramFilter {
            crop: self.crop,
            season: self.season,
            land_size,
        })
    }
}

impl ProgramsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let catalog = ProgramCatalog::new(ctx.session()?);
        match self {
            ProgramsCommand::List(args) => {
                let filter = args.to_filter()?;
                let programs = catalog
                    .list(&filter)
                    .await
                    .context("Failed to list programs")?;
                print_programs(ctx, &programs)
            }
            ProgramsCommand::Show { id } => {
                let program = catalog.get(*id).await.context("Failed to fetch program")?;
                emit(ctx, &program, |fmt| print_program(fmt, &program))
            }
            ProgramsCommand::Match(args) => {
                let filter = args.to_filter()?;
                let programs = catalog
                    .match_for_me(&filter)
                    .await
                    .context("Failed to match programs")?;
                info!(count = programs.len(), "Matched programs");
                print_programs(ctx, &programs)
            }
        }
    }
}

fn print_programs(ctx: &CliContext, programs: &[Program]) -> Result<()> {
    emit(ctx, &programs, |fmt| {
        if programs.is_empty() {
            fmt.info("No programs found.");
            return;
        }
        fmt.success(&format!("{} program(s)", programs.len()));
        for program in programs {
            fmt.info("");
            print_program(fmt, program);
        }
    })
}

fn print_program(fmt: &dyn OutputFormatter, program: &Program) {
    fmt.info(&format!("#{} {}", program.id, program.title));
    if !program.authority.is_empty() {
        fmt.info(&format!("  Authority:  {}", program.authority));
    }
    fmt.info(&format!(
        "  Season:     {}",
        program.season.unwrap_or_default()
    ));
    fmt.info(&format!("  Land size:  {}", program.land_range()));
    if !program.is_active {
        fmt.info("  (inactive)");
    }
    if !program.description.is_empty() {
        fmt.info(&format!("  {}", program.description));
    }
}
