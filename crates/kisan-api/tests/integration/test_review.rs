//! Integration tests for the admin review flow

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kisan_api::{
    review::{ReviewCoordinator, REVIEW_APPROVAL_REMARKS},
    workflow::ApplicationWorkflow,
    ApiError,
};
use kisan_core::domain::{ApplicationId, ApplicationStatus, DomainError};

use crate::common;

fn coordinator(server: &MockServer) -> ReviewCoordinator {
    let session = common::session_for(common::admin_json(), "admin-token", Some("r1"));
    let (manager, _store) = common::manager_for(server, Some(session));
    ReviewCoordinator::new(ApplicationWorkflow::new(manager))
}

async fn mount_queue(server: &MockServer, applications: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/applications/admin/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(applications))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_details(server: &MockServer, id: i64, status: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/applications/admin/{id}/details")))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::case_file_json(id, status)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn open_starts_review_and_loads_case_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_json(json!({
            "status": "under_review",
            "remarks": "Admin started manual verification"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::application_json(7, "under_review", None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_details(&server, 7, "under_review").await;
    mount_queue(
        &server,
        json!([common::application_json(7, "under_review", None)]),
        1,
    )
    .await;

    let coordinator = coordinator(&server);
    let review = coordinator.open(ApplicationId::new(7)).await.expect("open failed");

    assert!(review.review_started);
    assert_eq!(review.status(), ApplicationStatus::UnderReview);
    assert_eq!(review.case_file.documents.len(), 2);
    assert_eq!(
        review.reviewer.as_ref().map(|u| u.id.get()),
        Some(common::ADMIN_ID)
    );
    assert_eq!(coordinator.queue().await.len(), 1);
}

#[tokio::test]
async fn open_tolerates_failed_start_review() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "db down" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_details(&server, 7, "pending").await;
    mount_queue(&server, json!([common::application_json(7, "pending", None)]), 1).await;

    let review = coordinator(&server)
        .open(ApplicationId::new(7))
        .await
        .expect("open should survive a failed transition");

    assert!(!review.review_started);
    assert_eq!(review.status(), ApplicationStatus::Pending);
}

#[tokio::test]
async fn blank_remarks_reject_locally() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_partial_json(json!({ "status": "under_review" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::application_json(7, "under_review", None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_partial_json(json!({ "status": "rejected" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_details(&server, 7, "under_review").await;
    // Only the refresh after opening; a refused rejection reloads nothing
    mount_queue(
        &server,
        json!([common::application_json(7, "under_review", None)]),
        1,
    )
    .await;

    let coordinator = coordinator(&server);
    let review = coordinator.open(ApplicationId::new(7)).await.expect("open failed");

    let err = coordinator.reject(&review, " ").await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(DomainError::MissingRemarks)
    ));
}

#[tokio::test]
async fn approve_uses_default_remarks_and_refreshes_queue() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_partial_json(json!({ "status": "under_review" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::application_json(7, "under_review", None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_json(json!({
            "status": "approved",
            "remarks": REVIEW_APPROVAL_REMARKS
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::application_json(
            7,
            "approved",
            Some(REVIEW_APPROVAL_REMARKS),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_details(&server, 7, "under_review").await;
    mount_queue(
        &server,
        json!([common::application_json(7, "under_review", None)]),
        2,
    )
    .await;

    let coordinator = coordinator(&server);
    let review = coordinator.open(ApplicationId::new(7)).await.expect("open failed");

    let approved = coordinator
        .approve(&review, Some("   ".to_string()))
        .await
        .expect("approve failed");
    assert_eq!(approved.status, ApplicationStatus::Approved);
    assert_eq!(approved.remarks.as_deref(), Some(REVIEW_APPROVAL_REMARKS));
}

#[tokio::test]
async fn second_decision_on_opened_case_is_refused_locally() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_partial_json(json!({ "status": "under_review" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::application_json(7, "under_review", None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_partial_json(json!({ "status": "approved" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::application_json(
            7,
            "approved",
            Some(REVIEW_APPROVAL_REMARKS),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_partial_json(json!({ "status": "rejected" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    // Opening and approving see the case under review; afterwards it is decided
    Mock::given(method("GET"))
        .and(path("/applications/admin/7/details"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::case_file_json(7, "under_review")),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_details(&server, 7, "approved").await;
    mount_queue(
        &server,
        json!([common::application_json(7, "approved", None)]),
        3,
    )
    .await;

    let coordinator = coordinator(&server);
    let review = coordinator.open(ApplicationId::new(7)).await.expect("open failed");

    coordinator
        .approve(&review, None)
        .await
        .expect("approve failed");

    let err = coordinator.reject(&review, "Too late").await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert!(err.should_resync());
}

#[tokio::test]
async fn quick_approve_of_decided_application_is_refused_locally() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/9/status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_queue(
        &server,
        json!([common::application_json(9, "approved", Some("Eligible"))]),
        2,
    )
    .await;

    let coordinator = coordinator(&server);
    coordinator.refresh().await.expect("queue load failed");

    let err = coordinator
        .quick_approve(ApplicationId::new(9))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert!(err.should_resync());
}

#[tokio::test]
async fn quick_reject_sends_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/3/status"))
        .and(body_json(json!({ "status": "rejected", "remarks": "Duplicate land record" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::application_json(
            3,
            "rejected",
            Some("Duplicate land record"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_queue(&server, json!([common::application_json(3, "pending", None)]), 2).await;

    let coordinator = coordinator(&server);
    coordinator
        .set_filter(Some(ApplicationStatus::Pending))
        .await
        .expect("queue load failed");

    let rejected = coordinator
        .quick_reject(ApplicationId::new(3), "Duplicate land record")
        .await
        .expect("reject failed");
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    assert_eq!(coordinator.filter().await, Some(ApplicationStatus::Pending));
}
