//! Integration tests for submission and admin status transitions

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kisan_api::{workflow::ApplicationWorkflow, ApiError};
use kisan_core::domain::{
    Acreage, ApplicationId, ApplicationStatus, Crop, DomainError, NewApplication, ProgramId,
    Season,
};

use crate::common;

fn farmer_workflow(server: &MockServer) -> ApplicationWorkflow {
    let session = common::session_for(common::farmer_json(), "farmer-token", Some("r1"));
    let (manager, _store) = common::manager_for(server, Some(session));
    ApplicationWorkflow::new(manager)
}

fn admin_workflow(server: &MockServer) -> ApplicationWorkflow {
    let session = common::session_for(common::admin_json(), "admin-token", Some("r1"));
    let (manager, _store) = common::manager_for(server, Some(session));
    ApplicationWorkflow::new(manager)
}

async fn forbid_any_transition(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/applications/admin/\d+/status$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn submit_creates_pending_application() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/programs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::program_json(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications"))
        .and(body_json(json!({
            "program_id": 1,
            "crop_id": 2,
            "acreage": 2.5,
            "season": "Rabi"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(common::application_json(11, "pending", None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let workflow = farmer_workflow(&server);
    let submission = NewApplication::new(
        ProgramId::new(1),
        Crop::Wheat,
        Acreage::new(2.5).unwrap(),
        Season::Rabi,
    );

    let created = workflow.submit(&submission).await.expect("submit failed");
    assert_eq!(created.id, ApplicationId::new(11));
    assert_eq!(created.status, ApplicationStatus::Pending);
    assert_eq!(created.crop(), Some(Crop::Wheat));
}

#[tokio::test]
async fn acreage_outside_program_limits_is_still_submitted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/programs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::program_json(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications"))
        .and(body_partial_json(json!({ "acreage": 12.0 })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(common::application_json(12, "pending", None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let workflow = farmer_workflow(&server);
    let submission = NewApplication::new(
        ProgramId::new(1),
        Crop::Wheat,
        Acreage::new(12.0).unwrap(),
        Season::Rabi,
    );

    let created = workflow.submit(&submission).await.expect("submit failed");
    assert_eq!(created.id, ApplicationId::new(12));
}

#[tokio::test]
async fn submit_for_unknown_program_posts_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/programs/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let workflow = farmer_workflow(&server);
    let submission = NewApplication::new(
        ProgramId::new(99),
        Crop::Rice,
        Acreage::new(1.0).unwrap(),
        Season::Kharif,
    );

    let err = workflow.submit(&submission).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(DomainError::UnknownProgram(ref id)) if id == "99"
    ));
}

#[tokio::test]
async fn duplicate_submission_surfaces_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/programs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::program_json(1)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "You already have an application in progress for this program."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let workflow = farmer_workflow(&server);
    let submission = NewApplication::from_form(ProgramId::new(1), 2, 2.5, "Rabi").unwrap();

    let err = workflow.submit(&submission).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Request rejected (400): You already have an application in progress for this program."
    );
}

#[tokio::test]
async fn blank_rejection_never_reaches_server() {
    let server = MockServer::start().await;
    forbid_any_transition(&server).await;

    let workflow = admin_workflow(&server);

    for remarks in ["", "   ", "\n\t"] {
        let err = workflow
            .reject(ApplicationId::new(7), remarks)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(DomainError::MissingRemarks)
        ));
    }
}

#[tokio::test]
async fn reject_then_further_transition_conflicts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_json(json!({ "status": "rejected", "remarks": "Land record mismatch" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::application_json(
            7,
            "rejected",
            Some("Land record mismatch"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .and(body_partial_json(json!({ "status": "approved" })))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "detail": "Application already decided" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let workflow = admin_workflow(&server);

    let rejected = workflow
        .reject(ApplicationId::new(7), "  Land record mismatch ")
        .await
        .expect("reject failed");
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    assert_eq!(rejected.remarks.as_deref(), Some("Land record mismatch"));

    let err = workflow
        .approve(ApplicationId::new(7), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(ref m) if m == "Application already decided"));
    assert!(err.should_resync());
}

#[tokio::test]
async fn start_review_twice_is_a_no_op() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "detail": "Already under review" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/applications/admin/7/details"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::case_file_json(7, "under_review")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let workflow = admin_workflow(&server);
    let current = workflow
        .start_review(ApplicationId::new(7), None)
        .await
        .expect("start review should be idempotent");
    assert_eq!(current.status, ApplicationStatus::UnderReview);
}

#[tokio::test]
async fn start_review_of_decided_application_conflicts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications/admin/7/status"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "detail": "Application already decided" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/applications/admin/7/details"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::case_file_json(7, "approved")),
        )
        .mount(&server)
        .await;

    let err = admin_workflow(&server)
        .start_review(ApplicationId::new(7), None)
        .await
        .unwrap_err();
    assert!(err.should_resync());
}

#[tokio::test]
async fn admin_list_sends_status_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications/admin/list"))
        .and(query_param("status", "under_review"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::application_json(7, "under_review", None)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let listed = admin_workflow(&server)
        .list_all(Some(ApplicationStatus::UnderReview))
        .await
        .expect("list failed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_id.map(|u| u.get()), Some(common::FARMER_ID));
}

#[tokio::test]
async fn farmer_cannot_use_admin_operations() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications/admin/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    forbid_any_transition(&server).await;

    let workflow = farmer_workflow(&server);
    assert!(matches!(
        workflow.list_all(None).await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        workflow.approve(ApplicationId::new(7), None).await,
        Err(ApiError::Forbidden(_))
    ));
}
