//! # HTTP Handlers
//!
//! Each handler translates one request into one `Registry` call.
//! Every error-to-status decision lives in `error_status`.

use super::AppState;
use super::types::{
    EligibilityJson, ErrorResponse, HealthResponse, PaymentProofRequest, ProgressResponse,
    StagesResponse, StatusResponse, StatusUpdateRequest, SubmissionListResponse,
    SubmissionsQuery, SubmitRequest, SubmitResponse, TeamResponse, VerificationRequest,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use stagegate_core::{
    Denial, StageId, StagegateError, SubmissionOutcome, SubmissionRecord, TeamId, TrackId,
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP status for each denial reason.
pub fn denial_status(denial: Denial) -> StatusCode {
    match denial {
        Denial::UnverifiedAccount => StatusCode::FORBIDDEN,
        Denial::NotPassedPrevious => StatusCode::UNPROCESSABLE_ENTITY,
        Denial::SubmissionProcessing => StatusCode::CONFLICT,
        Denial::PassedDeadline => StatusCode::GONE,
        Denial::NoRemainingStage => StatusCode::PRECONDITION_FAILED,
    }
}

/// HTTP status for each engine error.
pub fn error_status(err: &StagegateError) -> StatusCode {
    match err {
        StagegateError::Denied(denial) => denial_status(*denial),
        StagegateError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        err if err.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Engine error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub StagegateError);

impl From<StagegateError> for ApiError {
    fn from(err: StagegateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = error_status(&self.0);
        let body = match self.0 {
            StagegateError::Denied(denial) => ErrorResponse::denied(denial),
            err if status.is_server_error() => {
                tracing::error!(error = %err, "request failed");
                ErrorResponse::new("Internal error")
            }
            err => ErrorResponse::new(err.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_team(raw: &str) -> Result<TeamId, StagegateError> {
    raw.parse()
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// GET /health - Liveness probe, never authenticated.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// GET /status - Registration summary.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let summary = state.registry.summary()?;
    Ok(Json(StatusResponse::new(state.backend_name(), summary)))
}

// =============================================================================
// CATALOG & PROGRESS
// =============================================================================

/// GET /tracks/{track_id}/stages - Stages of a track in order.
pub async fn stages_handler(
    State(state): State<AppState>,
    Path(track_id): Path<u64>,
) -> ApiResult<Json<StagesResponse>> {
    let track = state.registry.track(TrackId(track_id))?;
    let stages = state.registry.stages(track.id)?;
    Ok(Json(StagesResponse { track, stages }))
}

/// GET /teams/{team_id}/progress - Current and next stage, plus eligibility.
pub async fn progress_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Json<ProgressResponse>> {
    let team = parse_team(&team_id)?;
    let (progress, eligibility) = state.registry.progress(team)?;
    Ok(Json(ProgressResponse {
        progress,
        eligibility: EligibilityJson::from(eligibility),
    }))
}

// =============================================================================
// SUBMISSIONS
// =============================================================================

/// POST /teams/{team_id}/submissions - Submit to the next open stage.
///
/// 201 with the `processing` record, or the denial's status with its code.
pub async fn submit_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let team = parse_team(&team_id)?;
    match state.registry.create_submission(team, &request.payload)? {
        SubmissionOutcome::Accepted(record) => {
            Ok((StatusCode::CREATED, Json(SubmitResponse::success(record))))
        }
        SubmissionOutcome::Denied(denial) => Ok((
            denial_status(denial),
            Json(SubmitResponse::denied(denial)),
        )),
    }
}

/// GET /submissions - Filtered submission list for the admin dashboard.
pub async fn list_submissions_handler(
    State(state): State<AppState>,
    Query(query): Query<SubmissionsQuery>,
) -> ApiResult<Json<SubmissionListResponse>> {
    let filter = query.to_filter()?;
    let submissions = state.registry.list_submissions(&filter)?;
    Ok(Json(SubmissionListResponse::from(submissions)))
}

// =============================================================================
// ADMINISTRATION
// =============================================================================

/// PUT /teams/{team_id}/stages/{stage_id}/status - Record a verdict.
pub async fn judge_handler(
    State(state): State<AppState>,
    Path((team_id, stage_id)): Path<(String, u64)>,
    Json(request): Json<StatusUpdateRequest>,
) -> ApiResult<Json<SubmissionRecord>> {
    let team = parse_team(&team_id)?;
    let status = request.parse()?;
    let record = state
        .registry
        .update_submission_status(team, StageId(stage_id), status)?;
    Ok(Json(record))
}

/// PUT /teams/{team_id}/verification - Record a payment verification.
pub async fn verification_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(request): Json<VerificationRequest>,
) -> ApiResult<Json<TeamResponse>> {
    let team = parse_team(&team_id)?;
    let status = request.parse()?;
    let team = state.registry.update_verification_status(team, status)?;
    Ok(Json(TeamResponse { team }))
}

/// PUT /teams/{team_id}/payment-proof - Record the payment-proof link.
pub async fn payment_proof_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(request): Json<PaymentProofRequest>,
) -> ApiResult<Json<TeamResponse>> {
    let team = parse_team(&team_id)?;
    let team = state.registry.record_payment_proof(team, &request.link)?;
    Ok(Json(TeamResponse { team }))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_denial_has_a_distinct_status() {
        let denials = [
            Denial::UnverifiedAccount,
            Denial::NotPassedPrevious,
            Denial::SubmissionProcessing,
            Denial::PassedDeadline,
            Denial::NoRemainingStage,
        ];
        let mut statuses: Vec<u16> = denials.iter().map(|d| denial_status(*d).as_u16()).collect();
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses, vec![403, 409, 410, 412, 422]);
    }

    #[test]
    fn test_error_status_mapping() {
        let team = TeamId::new_v4();
        assert_eq!(
            error_status(&StagegateError::TeamNotFound(team)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&StagegateError::SubmissionNotFound(team, StageId(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&StagegateError::InvalidArgument("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&StagegateError::StoreFailure("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&StagegateError::Denied(Denial::PassedDeadline)),
            StatusCode::GONE
        );
    }
}
