//! Application commands - Submit and track subsidy applications

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use kisan_core::domain::{
    Acreage, Application, ApplicationId, Crop, NewApplication, ProgramId, Season,
};

use super::{emit, CliContext};
use crate::output::OutputFormatter;

/// Submit a new application
#[derive(Debug, Args)]
pub struct ApplyCommand {
    /// Program to apply to
    #[arg(long)]
    program: ProgramId,
    /// Crop name or ID (e.g. wheat or 2)
    #[arg(long)]
    crop: String,
    /// Land size in acres
    #[arg(long)]
    acreage: f64,
    /// Season: kharif, rabi, zaid or any
    #[arg(long, default_value = "any")]
    season: String,
}

impl ApplyCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let crop: Crop = self.crop.parse().context("Invalid --crop")?;
        let season: Season = self.season.parse().context("Invalid --season")?;
        let acreage = Acreage::new(self.acreage).context("Invalid --acreage")?;
        let submission = NewApplication::new(self.program, crop, acreage, season);

        let created = ctx
            .workflow()?
            .submit(&submission)
            .await
            .context("Submission failed")?;
        emit(ctx, &created, |fmt| {
            fmt.success(&format!("Application #{} submitted", created.id));
            print_application(fmt, &created);
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum ApplicationsCommand {
    /// List your applications
    List,
    /// Show one of your applications
    Show {
        /// Application ID
        id: ApplicationId,
    },
}

impl ApplicationsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let workflow = ctx.workflow()?;
        match self {
            ApplicationsCommand::List => {
                let applications = workflow
                    .list_mine()
                    .await
                    .context("Failed to list applications")?;
                print_applications(ctx, &applications)
            }
            ApplicationsCommand::Show { id } => {
                let application = workflow
                    .get_mine(*id)
                    .await
                    .context("Failed to fetch application")?;
                emit(ctx, &application, |fmt| print_application(fmt, &application))
            }
        }
    }
}

pub(crate) fn print_applications(ctx: &CliContext, applications: &[Application]) -> Result<()> {
    emit(ctx, &applications, |fmt| {
        if applications.is_empty() {
            fmt.info("No applications found.");
            return;
        }
        fmt.success(&format!("{} application(s)", applications.len()));
        fmt.info("");
        fmt.info(&format!(
            "{:<6} {:<8} {:<10} {:>8} {:<8} {:<13}",
            "ID", "PROGRAM", "CROP", "ACRES", "SEASON", "STATUS"
        ));
        for application in applications {
            fmt.info(&format!(
                "{:<6} {:<8} {:<10} {:>8.2} {:<8} {:<13}",
                application.id.to_string(),
                application.program_id.to_string(),
                crop_label(application),
                application.acreage,
                application.season.to_string(),
                application.status.to_string(),
            ));
        }
    })
}

pub(crate) fn print_application(fmt: &dyn OutputFormatter, application: &Application) {
    fmt.info(&format!("Application: #{}", application.id));
    fmt.info(&format!("Program:     #{}", application.program_id));
    fmt.info(&format!("Crop:        {}", crop_label(application)));
    fmt.info(&format!("Acreage:     {:.2}", application.acreage));
    fmt.info(&format!("Season:      {}", application.season));
    fmt.info(&format!("Status:      {}", application.status));
    if let Some(score) = application.score {
        fmt.info(&format!("Score:       {score:.1}"));
    }
    if let Some(remarks) = &application.remarks {
        fmt.info(&format!("Remarks:     {remarks}"));
    }
}

fn crop_label(application: &Application) -> String {
    application
        .crop()
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| format!("crop {}", application.crop_id))
}
