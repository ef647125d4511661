//! Profile command - Update the logged-in user's details

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use kisan_core::domain::ProfileUpdate;

use super::{auth::print_user, emit, CliContext};

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Change one or more profile fields
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        dob: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        aadhar: Option<String>,
    },
}

impl ProfileCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ProfileCommand::Update {
                name,
                email,
                phone,
                gender,
                dob,
                state,
                district,
                aadhar,
            } => {
                let patch = ProfileUpdate {
                    name: name.clone(),
                    email: email.clone(),
                    phone: phone.clone(),
                    gender: gender.clone(),
                    dob: dob.clone(),
                    state: state.clone(),
                    district: district.clone(),
                    aadhar: aadhar.clone(),
                };
                self.execute_update(ctx, &patch).await
            }
        }
    }

    async fn execute_update(&self, ctx: &CliContext, patch: &ProfileUpdate) -> Result<()> {
        let session = ctx.session()?;
        let Some(current) = session.current_user().await else {
            bail!("Not logged in. Run 'kisan auth login' first.");
        };

        let user = session
            .update_profile(current.id, patch)
            .await
            .context("Profile update failed")?;
        emit(ctx, &user, |fmt| {
            fmt.success("Profile updated");
            print_user(fmt, &user);
        })
    }
}
