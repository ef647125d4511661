//! Admin review coordinator
//!
//! Drives the manual verification flow of the admin console:
//!
//! 1. [`ReviewCoordinator::open`] marks the application `under_review`
//!    (failures are logged and tolerated) and fetches its case file.
//! 2. [`ReviewCoordinator::approve`] or [`ReviewCoordinator::reject`]
//!    decides it. Rejection remarks are checked before anything is sent,
//!    and the case is re-read so a decided application is refused locally.
//! 3. After every server round trip the queue is re-read from the server.
//!
//! The quick decisions of the queue view ([`ReviewCoordinator::quick_approve`],
//! [`ReviewCoordinator::quick_reject`]) follow the same rules without
//! opening the case file.

use kisan_core::domain::{
    Application, ApplicationId, ApplicationStatus, CaseFile, StatusChange, User,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{workflow::ApplicationWorkflow, ApiError, ApiResult};

/// Note recorded when an administrator opens a case
pub const START_REVIEW_NOTE: &str = "Admin started manual verification";

/// Remarks sent when approving from the review panel without remarks
pub const REVIEW_APPROVAL_REMARKS: &str = "Approved after manual verification";

/// Remarks sent when approving straight from the queue
pub const QUICK_APPROVAL_REMARKS: &str = "Approved from list view";

/// An opened case, ready for a decision
#[derive(Debug, Clone)]
pub struct CaseReview {
    /// Case file as fetched after the review started
    pub case_file: CaseFile,
    /// Administrator performing the review, if the profile is cached
    pub reviewer: Option<User>,
    /// Whether the `under_review` transition went through
    pub review_started: bool,
}

impl CaseReview {
    pub fn application_id(&self) -> ApplicationId {
        self.case_file.application.id
    }

    pub fn status(&self) -> ApplicationStatus {
        self.case_file.application.status
    }
}

/// Coordinates the admin review of applications
pub struct ReviewCoordinator {
    workflow: ApplicationWorkflow,
    filter: RwLock<Option<ApplicationStatus>>,
    queue: RwLock<Vec<Application>>,
}

impl ReviewCoordinator {
    pub fn new(workflow: ApplicationWorkflow) -> Self {
        Self {
            workflow,
            filter: RwLock::new(None),
            queue: RwLock::new(Vec::new()),
        }
    }

    pub fn workflow(&self) -> &ApplicationWorkflow {
        &self.workflow
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    /// Current status filter of the queue
    pub async fn filter(&self) -> Option<ApplicationStatus> {
        *self.filter.read().await
    }

    /// Changes the status filter and reloads the queue
    pub async fn set_filter(
        &self,
        filter: Option<ApplicationStatus>,
    ) -> ApiResult<Vec<Application>> {
        *self.filter.write().await = filter;
        self.refresh().await
    }

    /// Last loaded queue
    pub async fn queue(&self) -> Vec<Application> {
        self.queue.read().await.clone()
    }

    /// Reloads the queue from the server using the current filter
    pub async fn refresh(&self) -> ApiResult<Vec<Application>> {
        let filter = self.filter().await;
        let applications = self.workflow.list_all(filter).await?;
        debug!(count = applications.len(), ?filter, "Review queue loaded");
        *self.queue.write().await = applications.clone();
        Ok(applications)
    }

    async fn refresh_quietly(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Failed to refresh review queue");
        }
    }

    async fn queued_status(&self, id: ApplicationId) -> Option<ApplicationStatus> {
        self.queue
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.status)
    }

    // ------------------------------------------------------------------
    // Review panel
    // ------------------------------------------------------------------

    /// Starts the review of `id` and loads its case file
    ///
    /// A failed `under_review` transition does not stop the review; the
    /// case-file fetch decides the outcome. Applications the queue already
    /// shows as decided are opened read-only.
    pub async fn open(&self, id: ApplicationId) -> ApiResult<CaseReview> {
        let decided = self
            .queued_status(id)
            .await
            .is_some_and(|status| status.is_terminal());

        let review_started = if decided {
            debug!(application_id = %id, "Opening decided application without starting review");
            false
        } else {
            let started = match self
                .workflow
                .start_review(id, Some(START_REVIEW_NOTE.to_string()))
                .await
            {
                Ok(_) => true,
                Err(e) => {
                    warn!(application_id = %id, error = %e, "Could not mark application under review");
                    false
                }
            };
            self.refresh_quietly().await;
            started
        };

        let case_file = self.workflow.get_details(id).await?;
        let reviewer = self.workflow.session().current_user().await;

        info!(
            application_id = %id,
            status = %case_file.application.status,
            documents = case_file.documents.len(),
            "Case opened for review"
        );

        Ok(CaseReview {
            case_file,
            reviewer,
            review_started,
        })
    }

    /// Approves the opened case; blank remarks use the default text
    pub async fn approve(
        &self,
        review: &CaseReview,
        remarks: Option<String>,
    ) -> ApiResult<Application> {
        let remarks = remarks
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| REVIEW_APPROVAL_REMARKS.to_string());
        let known = self.latest_status(review).await;
        self.decide(
            review.application_id(),
            Some(known),
            StatusChange::approve(Some(remarks)),
        )
        .await
    }

    /// Rejects the opened case
    ///
    /// # Errors
    ///
    /// Blank remarks are reported as [`ApiError::Validation`]; nothing is
    /// sent and the queue is left as is.
    pub async fn reject(&self, review: &CaseReview, remarks: &str) -> ApiResult<Application> {
        let change = StatusChange::reject(remarks)?;
        let known = self.latest_status(review).await;
        self.decide(review.application_id(), Some(known), change)
            .await
    }

    /// Re-reads the status of an opened case before deciding it
    ///
    /// Falls back to the queue, then to the status seen when the case was
    /// opened, if the case file cannot be fetched.
    async fn latest_status(&self, review: &CaseReview) -> ApplicationStatus {
        let id = review.application_id();
        match self.workflow.get_details(id).await {
            Ok(case_file) => case_file.application.status,
            Err(e) => {
                warn!(application_id = %id, error = %e, "Could not re-read case before deciding");
                self.queued_status(id).await.unwrap_or(review.status())
            }
        }
    }

    // ------------------------------------------------------------------
    // Queue view decisions
    // ------------------------------------------------------------------

    /// Approves `id` directly from the queue
    pub async fn quick_approve(&self, id: ApplicationId) -> ApiResult<Application> {
        let known = self.queued_status(id).await;
        self.decide(
            id,
            known,
            StatusChange::approve(Some(QUICK_APPROVAL_REMARKS.to_string())),
        )
        .await
    }

    /// Rejects `id` directly from the queue with the given reason
    pub async fn quick_reject(&self, id: ApplicationId, reason: &str) -> ApiResult<Application> {
        let change = StatusChange::reject(reason)?;
        let known = self.queued_status(id).await;
        self.decide(id, known, change).await
    }

    /// Sends a decision, then reloads the queue whatever the outcome
    ///
    /// A decision on an application last seen in a terminal status is
    /// refused locally, since decided applications never change again.
    async fn decide(
        &self,
        id: ApplicationId,
        known: Option<ApplicationStatus>,
        change: StatusChange,
    ) -> ApiResult<Application> {
        let outcome = match known.map(|status| status.transition(change.status())) {
            Some(Err(e)) => {
                debug!(application_id = %id, error = %e, "Decision refused locally");
                Err(ApiError::Conflict(e.to_string()))
            }
            _ => self.workflow.transition(id, &change).await,
        };

        self.refresh_quietly().await;
        outcome
    }
}

