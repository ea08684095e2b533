//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use serde::{Deserialize, Serialize};
use stagegate_core::{
    Denial, Eligibility, ProgressView, Stage, StageId, StagegateError, SubmissionFilter,
    SubmissionRecord, SubmissionStatus, Summary, Team, TeamId, Track, TrackSummary,
    VerificationStatus,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response produced by a handler.
///
/// `code` carries the denial reason for rejected submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Denial>,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: None,
        }
    }

    pub fn denied(denial: Denial) -> Self {
        Self {
            error: format!("Submission denied: {}", denial),
            code: Some(denial),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Registration summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub backend: String,
    pub total_teams: usize,
    pub verified_teams: usize,
    pub tracks: Vec<TrackSummary>,
}

impl StatusResponse {
    pub fn new(backend: &str, summary: Summary) -> Self {
        Self {
            backend: backend.to_string(),
            total_teams: summary.total_teams,
            verified_teams: summary.verified_teams,
            tracks: summary.per_track,
        }
    }
}

// =============================================================================
// CATALOG RESPONSE
// =============================================================================

/// A track with its stages in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesResponse {
    pub track: Track,
    pub stages: Vec<Stage>,
}

// =============================================================================
// PROGRESS RESPONSE
// =============================================================================

/// Whether the team could submit right now, and where to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityJson {
    pub allowed: bool,
    pub stage_id: Option<StageId>,
    pub reason: Option<Denial>,
}

impl From<Eligibility> for EligibilityJson {
    fn from(eligibility: Eligibility) -> Self {
        match eligibility {
            Eligibility::Allowed(stage) => Self {
                allowed: true,
                stage_id: Some(stage),
                reason: None,
            },
            Eligibility::Denied(denial) => Self {
                allowed: false,
                stage_id: None,
                reason: Some(denial),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub progress: ProgressView,
    pub eligibility: EligibilityJson,
}

// =============================================================================
// SUBMISSIONS
// =============================================================================

/// New submission for the team's next open stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Deliverable link (`http`/`https`).
    pub payload: String,
}

/// Submission attempt result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub submission: Option<SubmissionRecord>,
    pub reason: Option<Denial>,
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn success(record: SubmissionRecord) -> Self {
        Self {
            success: true,
            submission: Some(record),
            reason: None,
            error: None,
        }
    }

    pub fn denied(denial: Denial) -> Self {
        Self {
            success: false,
            submission: None,
            reason: Some(denial),
            error: Some(format!("Submission denied: {}", denial)),
        }
    }
}

/// Query string of `GET /submissions`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionsQuery {
    pub stage_id: Option<u64>,
    pub status: Option<String>,
    pub team_id: Option<String>,
}

impl SubmissionsQuery {
    /// Parse the string fields into a typed filter.
    pub fn to_filter(&self) -> Result<SubmissionFilter, StagegateError> {
        Ok(SubmissionFilter {
            stage_id: self.stage_id.map(StageId),
            status: self
                .status
                .as_deref()
                .map(str::parse::<SubmissionStatus>)
                .transpose()?,
            team_id: self
                .team_id
                .as_deref()
                .map(str::parse::<TeamId>)
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionListResponse {
    pub count: usize,
    pub submissions: Vec<SubmissionRecord>,
}

impl From<Vec<SubmissionRecord>> for SubmissionListResponse {
    fn from(submissions: Vec<SubmissionRecord>) -> Self {
        Self {
            count: submissions.len(),
            submissions,
        }
    }
}

// =============================================================================
// ADMINISTRATION
// =============================================================================

/// Administrator verdict on a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

impl StatusUpdateRequest {
    pub fn parse(&self) -> Result<SubmissionStatus, StagegateError> {
        self.status.parse()
    }
}

/// Administrator payment verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub status: String,
}

impl VerificationRequest {
    pub fn parse(&self) -> Result<VerificationStatus, StagegateError> {
        self.status.parse()
    }
}

/// Link to the team's payment proof (validated by the registry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProofRequest {
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamResponse {
    pub team: Team,
}
