//! Integration tests for the Stagegate HTTP API.
//!
//! Uses axum-test to drive the router without starting a real server.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::json;
use stagegate::api::{
    AppState, ErrorResponse, HealthResponse, ProgressResponse, StagesResponse, StatusResponse,
    SubmissionListResponse, SubmitResponse, TeamResponse, create_router,
};
use stagegate::config::SecurityConfig;
use stagegate_core::{
    Denial, EntryState, Registry, Snapshot, Stage, StageId, StagegateError, SubmissionRecord,
    SubmissionStatus, Team, TeamId, Track, TrackCategory, TrackId, VerificationStatus,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn no_limits() -> SecurityConfig {
    SecurityConfig {
        rate_limit: 0,
        ..SecurityConfig::default()
    }
}

fn server_with(registry: Registry, security: SecurityConfig) -> TestServer {
    let state = AppState::with_security(registry, security);
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server() -> TestServer {
    server_with(Registry::new(), no_limits())
}

/// Design track 1 (stages 101..103) and business track 2 (201..203).
/// The first two stages close in the future, the last never closes.
fn competition() -> Registry {
    let registry = Registry::new();
    for (track, category) in [(1u64, TrackCategory::Design), (2, TrackCategory::Business)] {
        let id = TrackId(track);
        registry
            .insert_track(&Track::new(id, format!("Track {}", track), category))
            .unwrap();
        let deadlines = [Some(Duration::days(10)), Some(Duration::days(20)), None];
        for (offset, (name, deadline)) in ["Proposal", "Semifinal", "Final"]
            .iter()
            .zip(deadlines)
            .enumerate()
        {
            let mut stage = Stage::new(
                StageId(track * 100 + offset as u64 + 1),
                id,
                *name,
                offset as u32 + 1,
            );
            if let Some(delta) = deadline {
                stage = stage.with_deadline(Utc::now() + delta);
            }
            registry.insert_stage(&stage).unwrap();
        }
    }
    registry
}

fn add_team(registry: &Registry, track: u64, verification: VerificationStatus) -> TeamId {
    let id = TeamId::new_v4();
    registry
        .insert_team(
            &Team::new(id, format!("Team {}", id), TrackId(track)).with_verification(verification),
        )
        .unwrap();
    id
}

fn submission_path(team: TeamId) -> String {
    format!("/teams/{}/submissions", team)
}

fn link() -> serde_json::Value {
    json!({ "payload": "https://drive.example/doc" })
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_empty() {
    let server = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.backend, "memory");
    assert_eq!(status.total_teams, 0);
    assert!(status.tracks.is_empty());
}

#[tokio::test]
async fn test_status_counts_verified_teams() {
    let registry = competition();
    add_team(&registry, 1, VerificationStatus::Verified);
    add_team(&registry, 1, VerificationStatus::Unverified);
    add_team(&registry, 2, VerificationStatus::Processing);
    let server = server_with(registry, no_limits());

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.total_teams, 3);
    assert_eq!(status.verified_teams, 1);
    assert_eq!(status.tracks.len(), 2);
    assert_eq!(status.tracks[0].teams, 2);
}

// =============================================================================
// CATALOG & PROGRESS
// =============================================================================

#[tokio::test]
async fn test_track_stages_in_order() {
    let server = server_with(competition(), no_limits());

    let response = server.get("/tracks/2/stages").await;

    response.assert_status_ok();
    let body: StagesResponse = response.json();
    assert_eq!(body.track.category, TrackCategory::Business);
    let names: Vec<&str> = body.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Proposal", "Semifinal", "Final"]);
}

#[tokio::test]
async fn test_unknown_track_is_404() {
    let server = server_with(competition(), no_limits());
    server
        .get("/tracks/99/stages")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_progress_unverified_design_team_is_at_payment() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Unverified);
    let server = server_with(registry, no_limits());

    let response = server.get(&format!("/teams/{}/progress", team)).await;

    response.assert_status_ok();
    let body: ProgressResponse = response.json();
    assert_eq!(body.progress.current_stage_name, "Payment");
    assert_eq!(body.progress.current_stage_id, None);
    assert_eq!(body.progress.next_stage_name.as_deref(), Some("Proposal"));
    assert!(!body.eligibility.allowed);
    assert_eq!(body.eligibility.reason, Some(Denial::UnverifiedAccount));
}

#[tokio::test]
async fn test_progress_verified_team_can_submit_first_stage() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());

    let body: ProgressResponse = server
        .get(&format!("/teams/{}/progress", team))
        .await
        .json();
    assert_eq!(body.progress.current_stage_id, Some(StageId(101)));
    assert!(body.eligibility.allowed);
    assert_eq!(body.eligibility.stage_id, Some(StageId(101)));
}

#[tokio::test]
async fn test_progress_unknown_team_is_404() {
    let server = server_with(competition(), no_limits());
    let response = server
        .get(&format!("/teams/{}/progress", TeamId::new_v4()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_team_id_is_400() {
    let server = server_with(competition(), no_limits());
    let response = server.get("/teams/not-a-uuid/progress").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert!(body.error.contains("not-a-uuid"));
}

// =============================================================================
// SUBMISSIONS
// =============================================================================

#[tokio::test]
async fn test_submit_accepted_then_processing_conflict() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());

    let first = server.post(&submission_path(team)).json(&link()).await;
    first.assert_status(StatusCode::CREATED);
    let body: SubmitResponse = first.json();
    assert!(body.success);
    let record = body.submission.unwrap();
    assert_eq!(record.stage_id, StageId(101));
    assert_eq!(record.status, SubmissionStatus::Processing);

    let second = server.post(&submission_path(team)).json(&link()).await;
    second.assert_status(StatusCode::CONFLICT);
    let body: SubmitResponse = second.json();
    assert!(!body.success);
    assert_eq!(body.reason, Some(Denial::SubmissionProcessing));
}

#[tokio::test]
async fn test_submit_unverified_is_403() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Unverified);
    let server = server_with(registry, no_limits());

    let response = server.post(&submission_path(team)).json(&link()).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: SubmitResponse = response.json();
    assert_eq!(body.reason, Some(Denial::UnverifiedAccount));
}

#[tokio::test]
async fn test_business_proposal_allowed_before_payment() {
    let registry = competition();
    let team = add_team(&registry, 2, VerificationStatus::Unverified);
    let server = server_with(registry, no_limits());

    let response = server.post(&submission_path(team)).json(&link()).await;
    response.assert_status(StatusCode::CREATED);
    let body: SubmitResponse = response.json();
    assert_eq!(body.submission.unwrap().stage_id, StageId(201));
}

#[tokio::test]
async fn test_submit_after_deadline_is_410() {
    let registry = Registry::new();
    registry
        .insert_track(&Track::new(TrackId(5), "Closed", TrackCategory::General))
        .unwrap();
    registry
        .insert_stage(
            &Stage::new(StageId(501), TrackId(5), "Proposal", 1)
                .with_deadline(Utc::now() - Duration::hours(1)),
        )
        .unwrap();
    let team = add_team(&registry, 5, VerificationStatus::Unverified);
    let server = server_with(registry, no_limits());

    let response = server.post(&submission_path(team)).json(&link()).await;
    response.assert_status(StatusCode::GONE);
    let body: SubmitResponse = response.json();
    assert_eq!(body.reason, Some(Denial::PassedDeadline));
}

#[tokio::test]
async fn test_submit_invalid_link_is_400() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());

    let response = server
        .post(&submission_path(team))
        .json(&json!({ "payload": "ftp://files.example/doc" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_unknown_team_is_404() {
    let server = server_with(competition(), no_limits());
    let response = server
        .post(&submission_path(TeamId::new_v4()))
        .json(&link())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_submissions_with_filters() {
    let registry = competition();
    let alpha = add_team(&registry, 1, VerificationStatus::Verified);
    let beta = add_team(&registry, 2, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());

    server.post(&submission_path(alpha)).json(&link()).await;
    server.post(&submission_path(beta)).json(&link()).await;
    server
        .put(&format!("/teams/{}/stages/201/status", beta))
        .json(&json!({ "status": "passed" }))
        .await
        .assert_status_ok();

    let all: SubmissionListResponse = server.get("/submissions").await.json();
    assert_eq!(all.count, 2);

    let processing: SubmissionListResponse = server
        .get("/submissions")
        .add_query_param("status", "processing")
        .await
        .json();
    assert_eq!(processing.count, 1);
    assert_eq!(processing.submissions[0].team_id, alpha);

    let by_stage: SubmissionListResponse = server
        .get("/submissions")
        .add_query_param("stage_id", 201)
        .await
        .json();
    assert_eq!(by_stage.count, 1);
    assert_eq!(by_stage.submissions[0].status, SubmissionStatus::Passed);

    let by_team: SubmissionListResponse = server
        .get("/submissions")
        .add_query_param("team_id", beta.to_string())
        .await
        .json();
    assert_eq!(by_team.count, 1);
}

#[tokio::test]
async fn test_list_submissions_bad_status_is_400() {
    let server = create_test_server();
    server
        .get("/submissions")
        .add_query_param("status", "approved")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// ADMINISTRATION
// =============================================================================

#[tokio::test]
async fn test_failed_verdict_blocks_until_override() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());
    let verdict = format!("/teams/{}/stages/101/status", team);

    server.post(&submission_path(team)).json(&link()).await;
    let record: SubmissionRecord = server
        .put(&verdict)
        .json(&json!({ "status": "failed" }))
        .await
        .json();
    assert_eq!(record.status, SubmissionStatus::Failed);

    let denied = server.post(&submission_path(team)).json(&link()).await;
    denied.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    server
        .put(&verdict)
        .json(&json!({ "status": "passed" }))
        .await
        .assert_status_ok();
    let accepted = server.post(&submission_path(team)).json(&link()).await;
    accepted.assert_status(StatusCode::CREATED);
    let body: SubmitResponse = accepted.json();
    assert_eq!(body.submission.unwrap().stage_id, StageId(102));
}

#[tokio::test]
async fn test_verdict_without_submission_is_404() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());

    server
        .put(&format!("/teams/{}/stages/101/status", team))
        .json(&json!({ "status": "passed" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verdict_must_be_passed_or_failed() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());
    server.post(&submission_path(team)).json(&link()).await;
    let verdict = format!("/teams/{}/stages/101/status", team);

    for status in ["processing", "approved"] {
        server
            .put(&verdict)
            .json(&json!({ "status": status }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_finished_track_is_412() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());

    for stage in [101, 102, 103] {
        server
            .post(&submission_path(team))
            .json(&link())
            .await
            .assert_status(StatusCode::CREATED);
        server
            .put(&format!("/teams/{}/stages/{}/status", team, stage))
            .json(&json!({ "status": "passed" }))
            .await
            .assert_status_ok();
    }

    let response = server.post(&submission_path(team)).json(&link()).await;
    response.assert_status(StatusCode::PRECONDITION_FAILED);
    let body: SubmitResponse = response.json();
    assert_eq!(body.reason, Some(Denial::NoRemainingStage));
}

#[tokio::test]
async fn test_verification_unlocks_submission() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Processing);
    let server = server_with(registry, no_limits());

    server
        .post(&submission_path(team))
        .json(&link())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .put(&format!("/teams/{}/verification", team))
        .json(&json!({ "status": "verified" }))
        .await;
    response.assert_status_ok();
    let body: TeamResponse = response.json();
    assert_eq!(body.team.verification, VerificationStatus::Verified);

    server
        .post(&submission_path(team))
        .json(&link())
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_payment_proof_appears_on_payment_entry() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Unverified);
    let server = server_with(registry, no_limits());

    let response = server
        .put(&format!("/teams/{}/payment-proof", team))
        .json(&json!({ "link": "https://drive.example/receipt" }))
        .await;
    response.assert_status_ok();
    let body: TeamResponse = response.json();
    assert_eq!(
        body.team.payment_proof.as_deref(),
        Some("https://drive.example/receipt")
    );
    assert_eq!(body.team.verification, VerificationStatus::Unverified);

    let progress: ProgressResponse = server
        .get(&format!("/teams/{}/progress", team))
        .await
        .json();
    assert_eq!(progress.progress.current_stage_name, "Payment");
    assert_eq!(
        progress.progress.current().map(|entry| &entry.state),
        Some(&EntryState::Payment {
            verification: VerificationStatus::Unverified,
            proof: Some("https://drive.example/receipt".to_string()),
        })
    );
}

#[tokio::test]
async fn test_payment_proof_rejects_bad_link_and_unknown_team() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Unverified);
    let server = server_with(registry, no_limits());

    server
        .put(&format!("/teams/{}/payment-proof", team))
        .json(&json!({ "link": "receipt.pdf" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .put(&format!("/teams/{}/payment-proof", TeamId::new_v4()))
        .json(&json!({ "link": "https://drive.example/receipt" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_verification_status_is_400() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Processing);
    let server = server_with(registry, no_limits());

    server
        .put(&format!("/teams/{}/verification", team))
        .json(&json!({ "status": "paid" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// ROUTING & BODIES
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let server = create_test_server();
    server.get("/unknown").await.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = create_test_server();

    // /health is GET only
    let response = server.post("/health").await;
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let registry = competition();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    let server = server_with(registry, no_limits());

    let response = server
        .post(&submission_path(team))
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

fn create_auth_test_server(api_key: &str) -> TestServer {
    server_with(
        Registry::new(),
        SecurityConfig {
            api_key: Some(api_key.to_string()),
            ..no_limits()
        },
    )
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("secret");
    server
        .get("/status")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_always_allowed() {
    let server = create_auth_test_server("secret");
    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, api_key.parse::<HeaderValue>().unwrap())
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let server = server_with(
        Registry::new(),
        SecurityConfig {
            rate_limit: 1,
            ..SecurityConfig::default()
        },
    );

    server.get("/health").await.assert_status_ok();
    server
        .get("/health")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

// =============================================================================
// FILE BACKEND
// =============================================================================

/// Design track 1 in a file-backed registry, plus one verified team.
fn file_competition(path: &std::path::Path) -> (Registry, TeamId) {
    let registry = Registry::with_file(path).unwrap();
    registry
        .insert_track(&Track::new(TrackId(1), "Track 1", TrackCategory::Design))
        .unwrap();
    registry
        .insert_stage(&Stage::new(StageId(101), TrackId(1), "Proposal", 1))
        .unwrap();
    let team = add_team(&registry, 1, VerificationStatus::Verified);
    (registry, team)
}

fn snapshot_submissions(path: &std::path::Path) -> Vec<SubmissionRecord> {
    let data = std::fs::read(path).unwrap();
    Snapshot::from_json(&data).unwrap().submissions
}

#[tokio::test]
async fn test_file_backend_persists_each_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stagegate.json");
    let (registry, team) = file_competition(&path);
    let server = server_with(registry, no_limits());

    server
        .post(&submission_path(team))
        .json(&link())
        .await
        .assert_status(StatusCode::CREATED);

    let submissions = snapshot_submissions(&path);
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].team_id, team);
    assert_eq!(submissions[0].status, SubmissionStatus::Processing);
}

#[tokio::test]
async fn test_failed_save_rejects_submission_without_committing() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir(&data_dir).unwrap();
    let path = data_dir.join("stagegate.json");
    let (registry, team) = file_competition(&path);
    let server = server_with(registry, no_limits());

    std::fs::remove_dir_all(&data_dir).unwrap();
    server
        .post(&submission_path(team))
        .json(&link())
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let listed: SubmissionListResponse = server.get("/submissions").await.json();
    assert_eq!(listed.count, 0);
    let progress: ProgressResponse = server
        .get(&format!("/teams/{}/progress", team))
        .await
        .json();
    assert!(progress.eligibility.allowed);

    std::fs::create_dir(&data_dir).unwrap();
    server
        .post(&submission_path(team))
        .json(&link())
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(snapshot_submissions(&path).len(), 1);
}

#[tokio::test]
async fn test_file_backend_refuses_second_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stagegate.json");
    let (registry, _) = file_competition(&path);
    let _server = server_with(registry, no_limits());

    let second = Registry::with_file(&path);
    assert!(matches!(second, Err(StagegateError::StoreFailure(_))));
}
