//! Application workflow
//!
//! Farmer submission and reads, and the admin status transitions:
//!
//! | From                     | To             | Who   | Notes                       |
//! |--------------------------|----------------|-------|-----------------------------|
//! | (new)                    | `pending`      | farmer| program must exist          |
//! | `pending`/`under_review` | `under_review` | admin | no-op if already in review  |
//! | non-terminal             | `approved`     | admin | remarks optional            |
//! | non-terminal             | `rejected`     | admin | remarks required, local check |
//!
//! The server is the authority on the current status. A refused transition
//! surfaces as [`ApiError::Conflict`] and callers re-fetch instead of
//! guessing.

use std::sync::Arc;

use kisan_core::domain::{
    Application, ApplicationId, ApplicationStatus, CaseFile, DomainError, NewApplication, Program,
    StatusChange, Transition,
};
use tracing::{debug, info, warn};

use crate::{client::with_query, session::SessionManager, ApiError, ApiResult};

/// Submission, reads and status transitions for subsidy applications
#[derive(Clone)]
pub struct ApplicationWorkflow {
    session: Arc<SessionManager>,
}

impl ApplicationWorkflow {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// The session manager requests go through
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    // ------------------------------------------------------------------
    // Farmer operations
    // ------------------------------------------------------------------

    /// Submits a new application; it starts out `pending`
    ///
    /// # Errors
    ///
    /// An unknown or inactive program is reported as
    /// [`ApiError::Validation`] and nothing is posted.
    pub async fn submit(&self, application: &NewApplication) -> ApiResult<Application> {
        let program_id = application.program_id;

        let program = match self
            .session
            .get::<Option<Program>>(&format!("/programs/{program_id}"))
            .await
        {
            Ok(program) => program,
            Err(ApiError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let Some(program) = program.filter(|p| p.is_active) else {
            debug!(%program_id, "Refusing submission for unknown program");
            return Err(DomainError::UnknownProgram(program_id.to_string()).into());
        };

        if !program.admits_land_size(application.acreage.acres()) {
            warn!(
                %program_id,
                acreage = application.acreage.acres(),
                range = %program.land_range(),
                "Acreage outside program limits, submitting anyway"
            );
        }

        let created: Application = self.session.post("/applications", application).await?;
        info!(
            application_id = %created.id,
            %program_id,
            status = %created.status,
            "Application submitted"
        );
        Ok(created)
    }

    /// Lists the logged-in farmer's applications, newest first
    pub async fn list_mine(&self) -> ApiResult<Vec<Application>> {
        self.session.get("/applications").await
    }

    /// Fetches one of the logged-in farmer's applications
    pub async fn get_mine(&self, id: ApplicationId) -> ApiResult<Application> {
        self.session.get(&format!("/applications/{id}")).await
    }

    // ------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------

    /// Lists all applications, optionally only those in `status`
    pub async fn list_all(&self, status: Option<ApplicationStatus>) -> ApiResult<Vec<Application>> {
        self.ensure_admin().await?;
        let path = with_query(
            "/applications/admin/list",
            &[("status", status.map(|s| s.name().to_string()))],
        );
        self.session.get(&path).await
    }

    /// Fetches the full case file for manual verification
    pub async fn get_details(&self, id: ApplicationId) -> ApiResult<CaseFile> {
        self.ensure_admin().await?;
        self.session
            .get(&format!("/applications/admin/{id}/details"))
            .await
    }

    /// Moves the application into review
    ///
    /// Succeeds without change if the application is already under review.
    pub async fn start_review(
        &self,
        id: ApplicationId,
        note: Option<String>,
    ) -> ApiResult<Application> {
        match self.transition(id, &StatusChange::start_review(note)).await {
            Err(ApiError::Conflict(message)) => {
                let current = self.get_details(id).await?.application;
                match current.status.transition(ApplicationStatus::UnderReview) {
                    Ok(Transition::NoOp) => {
                        debug!(application_id = %id, "Application already under review");
                        Ok(current)
                    }
                    _ => Err(ApiError::Conflict(message)),
                }
            }
            outcome => outcome,
        }
    }

    /// Approves the application
    pub async fn approve(&self, id: ApplicationId, remarks: Option<String>) -> ApiResult<Application> {
        self.transition(id, &StatusChange::approve(remarks)).await
    }

    /// Rejects the application
    ///
    /// # Errors
    ///
    /// Blank remarks are reported as [`ApiError::Validation`] without any
    /// request being sent.
    pub async fn reject(&self, id: ApplicationId, remarks: &str) -> ApiResult<Application> {
        let change = StatusChange::reject(remarks)?;
        self.transition(id, &change).await
    }

    /// Sends a status change to the server
    pub async fn transition(
        &self,
        id: ApplicationId,
        change: &StatusChange,
    ) -> ApiResult<Application> {
        self.ensure_admin().await?;

        let target = change.status();
        debug!(
            application_id = %id,
            %target,
            has_remarks = change.remarks().is_some(),
            "Sending status change"
        );
        let outcome: ApiResult<Application> = self
            .session
            .post(&format!("/applications/admin/{id}/status"), change)
            .await;
        let updated = match outcome {
            Ok(updated) => updated,
            Err(ApiError::Rejected {
                status: 400,
                message,
            })
            | Err(ApiError::Conflict(message)) => {
                warn!(application_id = %id, %target, %message, "Transition refused");
                return Err(ApiError::Conflict(message));
            }
            Err(e) => return Err(e),
        };

        if updated.status != target {
            warn!(
                application_id = %id,
                requested = %target,
                actual = %updated.status,
                "Server returned a different status than requested"
            );
        }
        info!(application_id = %id, status = %updated.status, "Application status changed");
        Ok(updated)
    }

    /// Refuses admin operations for a logged-in user known not to be an
    /// administrator; otherwise the server decides
    async fn ensure_admin(&self) -> ApiResult<()> {
        match self.session.current_user().await {
            Some(user) if !user.is_admin() => Err(ApiError::Forbidden(
                "administrator role required".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
