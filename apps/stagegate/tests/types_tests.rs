//! Unit tests for API types serialization/deserialization.

#![allow(clippy::unwrap_used, clippy::panic)]

use stagegate::api::{
    EligibilityJson, ErrorResponse, HealthResponse, StatusUpdateRequest, SubmissionsQuery,
    SubmitRequest, SubmitResponse, VerificationRequest,
};
use stagegate_core::{
    Denial, Eligibility, StageId, StagegateError, SubmissionStatus, TeamId, VerificationStatus,
};

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: "0.4.2".to_string(),
    };

    let json = serde_json::to_string(&health).unwrap();
    assert!(json.contains("\"status\":\"ok\""));
    assert!(json.contains("\"version\":\"0.4.2\""));
}

// =============================================================================
// ERROR AND DENIAL BODIES
// =============================================================================

#[test]
fn test_denial_codes_are_snake_case() {
    let body = ErrorResponse::denied(Denial::NotPassedPrevious);
    let json = serde_json::to_string(&body).unwrap();
    assert!(json.contains("\"code\":\"not_passed_previous\""));
}

#[test]
fn test_plain_error_omits_code() {
    let json = serde_json::to_string(&ErrorResponse::new("Team not found")).unwrap();
    assert_eq!(json, r#"{"error":"Team not found"}"#);
}

#[test]
fn test_submit_response_denied() {
    let response = SubmitResponse::denied(Denial::PassedDeadline);
    assert!(!response.success);
    assert!(response.submission.is_none());

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"reason\":\"passed_deadline\""));
}

#[test]
fn test_eligibility_json() {
    let allowed = EligibilityJson::from(Eligibility::Allowed(StageId(7)));
    assert!(allowed.allowed);
    assert_eq!(allowed.stage_id, Some(StageId(7)));
    assert!(allowed.reason.is_none());

    let denied = EligibilityJson::from(Eligibility::Denied(Denial::SubmissionProcessing));
    assert!(!denied.allowed);
    assert_eq!(denied.reason, Some(Denial::SubmissionProcessing));
}

// =============================================================================
// REQUEST TESTS
// =============================================================================

#[test]
fn test_submit_request_deserialization() {
    let request: SubmitRequest =
        serde_json::from_str(r#"{"payload":"https://drive.example/doc"}"#).unwrap();
    assert_eq!(request.payload, "https://drive.example/doc");
}

#[test]
fn test_status_update_request_parse() {
    let request = StatusUpdateRequest {
        status: "Passed".to_string(),
    };
    assert_eq!(request.parse().unwrap(), SubmissionStatus::Passed);

    let bad = StatusUpdateRequest {
        status: "approved".to_string(),
    };
    assert!(matches!(bad.parse(), Err(StagegateError::InvalidArgument(_))));
}

#[test]
fn test_verification_request_parse() {
    let request = VerificationRequest {
        status: "rejected".to_string(),
    };
    assert_eq!(request.parse().unwrap(), VerificationStatus::Rejected);
}

#[test]
fn test_submissions_query_to_filter() {
    let team = TeamId::new_v4();
    let query = SubmissionsQuery {
        stage_id: Some(3),
        status: Some("failed".to_string()),
        team_id: Some(team.to_string()),
    };

    let filter = query.to_filter().unwrap();
    assert_eq!(filter.stage_id, Some(StageId(3)));
    assert_eq!(filter.status, Some(SubmissionStatus::Failed));
    assert_eq!(filter.team_id, Some(team));
}

#[test]
fn test_empty_submissions_query_matches_everything() {
    let filter = SubmissionsQuery::default().to_filter().unwrap();
    assert_eq!(filter, stagegate_core::SubmissionFilter::default());
}

#[test]
fn test_submissions_query_rejects_bad_team() {
    let query = SubmissionsQuery {
        team_id: Some("team-7".to_string()),
        ..SubmissionsQuery::default()
    };
    assert!(query.to_filter().is_err());
}
