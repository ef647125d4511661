//! Auth commands - Account registration, login and password recovery
//!
//! Provides the `kisan auth` CLI subcommands which:
//! 1. `register` - Creates a farmer account and logs it in.
//! 2. `login`    - Exchanges email and password for a stored session.
//! 3. `logout`   - Drops the stored session.
//! 4. `status`   - Shows who is logged in.
//! 5. `forgot-password` / `reset-password` - Password recovery.

use anyhow::{Context, Result};
use clap::Subcommand;
use kisan_api::ApiError;
use kisan_core::domain::{RegistrationProfile, User};
use tracing::info;

use super::{emit, CliContext};
use crate::output::OutputFormatter;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Register a new farmer account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Ten-digit mobile number
        #[arg(long)]
        phone: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        district: String,
        #[arg(long)]
        gender: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<String>,
        /// Twelve-digit Aadhaar number
        #[arg(long)]
        aadhar: Option<String>,
    },
    /// Remove the stored session
    Logout,
    /// Show the logged-in user
    Status,
    /// Request a password reset token
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password using a reset token
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
    },
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AuthCommand::Login { email, password } => {
                self.execute_login(ctx, email, password).await
            }
            AuthCommand::Register {
                name,
                email,
                password,
                phone,
                state,
                district,
                gender,
                dob,
                aadhar,
            } => {
                let profile = RegistrationProfile {
                    name: name.clone(),
                    email: email.clone(),
                    password: password.clone(),
                    phone: phone.clone(),
                    gender: gender.clone(),
                    dob: dob.clone(),
                    state: state.clone(),
                    district: district.clone(),
                    aadhar: aadhar.clone(),
                    doc_path: None,
                };
                self.execute_register(ctx, &profile).await
            }
            AuthCommand::Logout => self.execute_logout(ctx).await,
            AuthCommand::Status => self.execute_status(ctx).await,
            AuthCommand::ForgotPassword { email } => self.execute_forgot(ctx, email).await,
            AuthCommand::ResetPassword { token, password } => {
                self.execute_reset(ctx, token, password).await
            }
        }
    }

    async fn execute_login(&self, ctx: &CliContext, email: &str, password: &str) -> Result<()> {
        let session = ctx.session()?;
        info!(base_url = %session.client().base_url(), "Logging in");

        let user = session.login(email, password).await.context("Login failed")?;
        emit(ctx, &user, |fmt| {
            fmt.success(&format!("Logged in as {} ({})", user.name, user.email));
            print_user(fmt, &user);
        })
    }

    async fn execute_register(&self, ctx: &CliContext, profile: &RegistrationProfile) -> Result<()> {
        let session = ctx.session()?;

        match session.register(profile).await {
            Ok(user) => emit(ctx, &user, |fmt| {
                fmt.success(&format!("Registered and logged in as {}", user.email));
                print_user(fmt, &user);
            }),
            Err(ApiError::Registration { user, message }) => {
                let fmt = ctx.formatter();
                fmt.warn(&format!("Account {} was created but login failed: {message}", user.email));
                fmt.info("Run 'kisan auth login' to sign in.");
                Err(ApiError::Registration { user, message }).context("Registration incomplete")
            }
            Err(e) => Err(e).context("Registration failed"),
        }
    }

    async fn execute_logout(&self, ctx: &CliContext) -> Result<()> {
        let session = ctx.session()?;
        if !session.is_authenticated().await {
            ctx.formatter().info("Not logged in. Nothing to log out.");
            return Ok(());
        }
        session.logout().await.context("Failed to clear session")?;
        ctx.formatter().success("Logged out");
        Ok(())
    }

    async fn execute_status(&self, ctx: &CliContext) -> Result<()> {
        let session = ctx.session()?;
        let user = session.current_user().await;
        let authenticated = session.is_authenticated().await;

        let status = serde_json::json!({
            "authenticated": authenticated,
            "base_url": session.client().base_url(),
            "user": user,
        });
        emit(ctx, &status, |fmt| match &user {
            Some(user) => {
                fmt.success(&format!("Logged in as {} ({})", user.name, user.email));
                print_user(fmt, user);
            }
            None if authenticated => fmt.success("Logged in (profile not cached)"),
            None => fmt.info("Not logged in. Run 'kisan auth login'."),
        })
    }

    async fn execute_forgot(&self, ctx: &CliContext, email: &str) -> Result<()> {
        let session = ctx.session()?;
        let ticket = session
            .forgot_password(email)
            .await
            .context("Password reset request failed")?;
        emit(ctx, &ticket, |fmt| {
            fmt.success(&ticket.msg);
            if let Some(token) = &ticket.token {
                fmt.info(&format!("Reset token: {token}"));
            }
        })
    }

    async fn execute_reset(&self, ctx: &CliContext, token: &str, password: &str) -> Result<()> {
        let session = ctx.session()?;
        let message = session
            .reset_password(token, password)
            .await
            .context("Password reset failed")?;
        emit(ctx, &serde_json::json!({ "message": message }), |fmt| {
            fmt.success(&message)
        })
    }
}

pub(crate) fn print_user(fmt: &dyn OutputFormatter, user: &User) {
    fmt.info(&format!("ID:       {}", user.id));
    fmt.info(&format!("Role:     {}", user.role));
    if let Some(phone) = &user.phone {
        fmt.info(&format!("Phone:    {phone}"));
    }
    let region = [user.district.as_deref(), user.state.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
    if !region.is_empty() {
        fmt.info(&format!("Region:   {region}"));
    }
}
