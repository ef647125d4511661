//! Admin commands - Review and decide subsidy applications
//!
//! Provides the `kisan admin` CLI subcommands which:
//! 1. `list`    - Lists all applications, optionally by status.
//! 2. `show`    - Shows the full case file without changing anything.
//! 3. `review`  - Opens the case (marking it under review) and optionally
//!    decides it in the same step.
//! 4. `approve` / `reject` - Quick decisions from the queue.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use kisan_api::review::{CaseReview, ReviewCoordinator};
use kisan_core::domain::{Application, ApplicationId, ApplicationStatus, CaseFile};
use tracing::info;

use super::{applications::print_application, applications::print_applications, emit, CliContext};
use crate::output::OutputFormatter;

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// List applications
    List {
        /// Only applications in this status (pending, under_review, approved, rejected)
        #[arg(long)]
        status: Option<ApplicationStatus>,
    },
    /// Show an application's case file
    Show {
        /// Application ID
        id: ApplicationId,
    },
    /// Open an application for review and optionally decide it
    Review {
        /// Application ID
        id: ApplicationId,
        /// Approve after opening
        #[arg(long, conflicts_with = "reject")]
        approve: bool,
        /// Reject after opening (requires --remarks)
        #[arg(long)]
        reject: bool,
        /// Remarks sent with the decision
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Approve an application
    Approve {
        /// Application ID
        id: ApplicationId,
    },
    /// Reject an application
    Reject {
        /// Application ID
        id: ApplicationId,
        /// Reason shown to the farmer
        #[arg(long)]
        remarks: String,
    },
}

impl AdminCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let reviews = ctx.reviews()?;
        match self {
            AdminCommand::List { status } => {
                let applications = reviews
                    .set_filter(*status)
                    .await
                    .context("Failed to list applications")?;
                print_applications(ctx, &applications)
            }
            AdminCommand::Show { id } => {
                let case_file = reviews
                    .workflow()
                    .get_details(*id)
                    .await
                    .context("Failed to fetch case file")?;
                emit(ctx, &case_file, |fmt| print_case_file(fmt, &case_file))
            }
            AdminCommand::Review {
                id,
                approve,
                reject,
                remarks,
            } => {
                self.execute_review(ctx, &reviews, *id, *approve, *reject, remarks.as_deref())
                    .await
            }
            AdminCommand::Approve { id } => {
                reviews.refresh().await.context("Failed to load review queue")?;
                let decided = reviews
                    .quick_approve(*id)
                    .await
                    .context("Approval failed")?;
                print_decision(ctx, &decided)
            }
            AdminCommand::Reject { id, remarks } => {
                reviews.refresh().await.context("Failed to load review queue")?;
                let decided = reviews
                    .quick_reject(*id, remarks)
                    .await
                    .context("Rejection failed")?;
                print_decision(ctx, &decided)
            }
        }
    }

    async fn execute_review(
        &self,
        ctx: &CliContext,
        reviews: &ReviewCoordinator,
        id: ApplicationId,
        approve: bool,
        reject: bool,
        remarks: Option<&str>,
    ) -> Result<()> {
        // Fail before opening so a bad invocation leaves the status untouched
        if reject && remarks.map_or(true, |r| r.trim().is_empty()) {
            bail!("--reject requires --remarks explaining the reason");
        }

        reviews.refresh().await.context("Failed to load review queue")?;
        let review = reviews.open(id).await.context("Failed to open case")?;
        info!(application_id = %id, started = review.review_started, "Review opened");

        if !approve && !reject {
            return print_review(ctx, &review);
        }

        let decided = if approve {
            reviews
                .approve(&review, remarks.map(str::to_string))
                .await
                .context("Approval failed")?
        } else {
            reviews
                .reject(&review, remarks.unwrap_or_default())
                .await
                .context("Rejection failed")?
        };
        print_decision(ctx, &decided)
    }
}

fn print_review(ctx: &CliContext, review: &CaseReview) -> Result<()> {
    let json = serde_json::json!({
        "review_started": review.review_started,
        "reviewer": review.reviewer.as_ref().map(|u| &u.email),
        "case_file": review.case_file,
    });
    emit(ctx, &json, |fmt| {
        if !review.review_started && !review.case_file.application.is_decided() {
            fmt.warn("Could not mark the application under review");
        }
        print_case_file(fmt, &review.case_file);
    })
}

fn print_decision(ctx: &CliContext, application: &Application) -> Result<()> {
    emit(ctx, application, |fmt| {
        fmt.success(&format!(
            "Application #{} is now {}",
            application.id, application.status
        ));
        print_application(fmt, application);
    })
}

fn print_case_file(fmt: &dyn OutputFormatter, case_file: &CaseFile) {
    print_application(fmt, &case_file.application);

    fmt.info("");
    fmt.info(&format!(
        "Applicant:   {} <{}>",
        case_file.user.name, case_file.user.email
    ));
    if let Some(aadhar) = &case_file.user.aadhar {
        fmt.info(&format!("Aadhaar:     {aadhar}"));
    }
    fmt.info(&format!(
        "Program:     {} ({})",
        case_file.program.title,
        case_file.program.land_range()
    ));
    if case_file.acreage_out_of_range() {
        fmt.warn("Acreage is outside the program's land-size limits");
    }

    fmt.info("");
    if case_file.documents.is_empty() {
        fmt.info("No documents uploaded.");
    }
    for document in &case_file.documents {
        fmt.info(&format!("Document:    {:?} {}", document.kind, document.file_path));
    }
}
