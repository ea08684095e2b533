//! # Core Type Definitions
//!
//! This module contains all core types for the Stagegate engine:
//! - Identifiers (`TrackId`, `StageId`, `TeamId`)
//! - Catalog entities (`Track`, `Stage`) and payment placement rules
//! - Team verification and submission state (`Team`, `SubmissionRecord`)
//! - Business-rule denials (`Denial`) and errors (`StagegateError`)
//!
//! ## Boundary Validation
//!
//! Every status value is a closed enum. Free-text values coming from HTTP or
//! the CLI are parsed with `FromStr` and rejected as `InvalidArgument` when
//! they do not name a known variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a competition track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

/// Identifier of a persisted stage.
/// The payment pseudo-stage never has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId(pub u64);

/// Stable identity of a registered team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub Uuid);

impl TeamId {
    /// Generate a fresh random team id.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TeamId {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| StagegateError::InvalidArgument(format!("invalid team id '{}': {}", s, e)))
    }
}

// =============================================================================
// TRACK
// =============================================================================

/// Classification of a track, decided when the track is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackCategory {
    /// Payment is verified before the first deliverable.
    Design,
    /// Teams submit an initial proposal before payment is required.
    Business,
    /// No payment milestone in the stage sequence.
    General,
}

impl TrackCategory {
    /// Payment placement used when a track carries no explicit override.
    #[must_use]
    pub const fn default_placement(self) -> PaymentPlacement {
        match self {
            Self::Design => PaymentPlacement::At(0),
            Self::Business => PaymentPlacement::At(1),
            Self::General => PaymentPlacement::Omitted,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Business => "business",
            Self::General => "general",
        }
    }
}

impl fmt::Display for TrackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackCategory {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "design" => Ok(Self::Design),
            "business" => Ok(Self::Business),
            "general" => Ok(Self::General),
            other => Err(StagegateError::InvalidArgument(format!(
                "unknown track category '{}'",
                other
            ))),
        }
    }
}

/// Where the payment pseudo-stage sits in a track's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPlacement {
    /// The track has no payment milestone.
    Omitted,
    /// Inserted before the real stage at this index (clamped to the end).
    At(usize),
}

/// A competition track: a named, categorized sequence of stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub category: TrackCategory,
    /// Explicit override of the category's default placement.
    pub payment_placement: Option<PaymentPlacement>,
}

impl Track {
    #[must_use]
    pub fn new(id: TrackId, name: impl Into<String>, category: TrackCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            payment_placement: None,
        }
    }

    /// Override the category default placement.
    #[must_use]
    pub fn with_payment_placement(mut self, placement: PaymentPlacement) -> Self {
        self.payment_placement = Some(placement);
        self
    }

    /// Effective payment placement for this track.
    #[must_use]
    pub fn placement(&self) -> PaymentPlacement {
        self.payment_placement
            .unwrap_or_else(|| self.category.default_placement())
    }

    /// Index of the first real stage that requires a verified team.
    ///
    /// Stages before the payment milestone are open to unverified teams.
    /// Without a payment milestone every stage requires verification.
    #[must_use]
    pub fn verification_gate(&self) -> usize {
        match self.placement() {
            PaymentPlacement::Omitted => 0,
            PaymentPlacement::At(position) => position,
        }
    }
}

// =============================================================================
// STAGE
// =============================================================================

/// One sequential milestone within a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub track_id: TrackId,
    pub name: String,
    /// Strictly increasing and unique within the track.
    pub order: u32,
    /// `None` means the stage never closes.
    pub deadline: Option<DateTime<Utc>>,
}

impl Stage {
    #[must_use]
    pub fn new(id: StageId, track_id: TrackId, name: impl Into<String>, order: u32) -> Self {
        Self {
            id,
            track_id,
            name: name.into(),
            order,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

// =============================================================================
// TEAM
// =============================================================================

/// Payment verification status of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    /// Payment proof uploaded, waiting for an administrator.
    Processing,
    Verified,
    Rejected,
}

impl VerificationStatus {
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Processing => "processing",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unverified" => Ok(Self::Unverified),
            "processing" => Ok(Self::Processing),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(StagegateError::InvalidArgument(format!(
                "unknown verification status '{}'",
                other
            ))),
        }
    }
}

/// A registered team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub track_id: TrackId,
    pub verification: VerificationStatus,
    /// Payment-proof link uploaded by the account owner.
    pub payment_proof: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Create an unverified team registered now.
    #[must_use]
    pub fn new(id: TeamId, name: impl Into<String>, track_id: TrackId) -> Self {
        Self {
            id,
            name: name.into(),
            track_id,
            verification: VerificationStatus::Unverified,
            payment_proof: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_verification(mut self, verification: VerificationStatus) -> Self {
        self.verification = verification;
        self
    }

    #[must_use]
    pub fn with_payment_proof(mut self, link: impl Into<String>) -> Self {
        self.payment_proof = Some(link.into());
        self
    }
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// Judging status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Processing,
    Passed,
    Failed,
}

impl SubmissionStatus {
    /// Passed and failed are the only values an administrator may set.
    #[must_use]
    pub const fn is_verdict(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = StagegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            other => Err(StagegateError::InvalidArgument(format!(
                "unknown submission status '{}'",
                other
            ))),
        }
    }
}

/// The persisted outcome of a team's attempt at a stage.
///
/// Exactly one record exists per (team, stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub team_id: TeamId,
    pub stage_id: StageId,
    pub status: SubmissionStatus,
    /// Link to the submitted document.
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRecord {
    /// A fresh `processing` record.
    #[must_use]
    pub fn processing(
        team_id: TeamId,
        stage_id: StageId,
        payload: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            team_id,
            stage_id,
            status: SubmissionStatus::Processing,
            payload: payload.into(),
            created_at: at,
            updated_at: at,
        }
    }
}

/// Filter for listing submissions. Empty fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFilter {
    pub stage_id: Option<StageId>,
    pub status: Option<SubmissionStatus>,
    pub team_id: Option<TeamId>,
}

impl SubmissionFilter {
    #[must_use]
    pub fn matches(&self, record: &SubmissionRecord) -> bool {
        self.stage_id.is_none_or(|id| record.stage_id == id)
            && self.status.is_none_or(|status| record.status == status)
            && self.team_id.is_none_or(|id| record.team_id == id)
    }
}

// =============================================================================
// DENIAL
// =============================================================================

/// Business-rule rejection of a submission attempt.
///
/// These are expected outcomes, not faults. Codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    /// Team is rejected, or the target stage requires a verified team.
    UnverifiedAccount,
    /// The team failed the stage it would submit to.
    NotPassedPrevious,
    /// A submission for the stage is already being judged.
    SubmissionProcessing,
    /// The target stage's deadline is over.
    PassedDeadline,
    /// Every stage of the track is already passed.
    NoRemainingStage,
}

impl Denial {
    /// Stable symbolic code for clients.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnverifiedAccount => "unverified_account",
            Self::NotPassedPrevious => "not_passed_previous",
            Self::SubmissionProcessing => "submission_processing",
            Self::PassedDeadline => "passed_deadline",
            Self::NoRemainingStage => "no_remaining_stage",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Stagegate engine.
///
/// - Denials are carried as `Denied` only when a caller converts an outcome
///   into a `Result`; the engine itself returns them as values.
/// - Store failures abort the unit of work; nothing is partially written.
#[derive(Debug, Error)]
pub enum StagegateError {
    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Stage not found: {0}")]
    StageNotFound(StageId),

    /// The track has no persisted stages.
    #[error("Track {0} has no stages")]
    NoStages(TrackId),

    /// The stage is the last one of its track.
    #[error("No stage follows stage {0}")]
    NoNextStage(StageId),

    #[error("No submission for team {0} at stage {1}")]
    SubmissionNotFound(TeamId, StageId),

    #[error("Submission denied: {0}")]
    Denied(Denial),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store failed.
    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl StagegateError {
    /// True for every "referenced thing does not exist" variant.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TeamNotFound(_)
                | Self::TrackNotFound(_)
                | Self::StageNotFound(_)
                | Self::NoStages(_)
                | Self::NoNextStage(_)
                | Self::SubmissionNotFound(..)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_default_placement() {
        assert_eq!(
            TrackCategory::Design.default_placement(),
            PaymentPlacement::At(0)
        );
        assert_eq!(
            TrackCategory::Business.default_placement(),
            PaymentPlacement::At(1)
        );
        assert_eq!(
            TrackCategory::General.default_placement(),
            PaymentPlacement::Omitted
        );
    }

    #[test]
    fn explicit_placement_overrides_category() {
        let track = Track::new(TrackId(1), "UI/UX", TrackCategory::Design)
            .with_payment_placement(PaymentPlacement::At(2));
        assert_eq!(track.placement(), PaymentPlacement::At(2));
        assert_eq!(track.verification_gate(), 2);

        let general = Track::new(TrackId(2), "Open", TrackCategory::General);
        assert_eq!(general.verification_gate(), 0);
    }

    #[test]
    fn status_parsing_is_closed() {
        assert_eq!(
            "Passed".parse::<SubmissionStatus>().expect("parse"),
            SubmissionStatus::Passed
        );
        assert!(matches!(
            "lolos".parse::<SubmissionStatus>(),
            Err(StagegateError::InvalidArgument(_))
        ));
        assert_eq!(
            " verified ".parse::<VerificationStatus>().expect("parse"),
            VerificationStatus::Verified
        );
        assert!("approved".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn only_passed_and_failed_are_verdicts() {
        assert!(SubmissionStatus::Passed.is_verdict());
        assert!(SubmissionStatus::Failed.is_verdict());
        assert!(!SubmissionStatus::Processing.is_verdict());
    }

    #[test]
    fn denial_codes_are_distinct() {
        let codes = [
            Denial::UnverifiedAccount,
            Denial::NotPassedPrevious,
            Denial::SubmissionProcessing,
            Denial::PassedDeadline,
            Denial::NoRemainingStage,
        ]
        .map(Denial::code);
        let unique: std::collections::BTreeSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn filter_matches_all_fields() {
        let team = TeamId::new_v4();
        let record = SubmissionRecord::processing(team, StageId(3), "https://x", Utc::now());

        assert!(SubmissionFilter::default().matches(&record));
        assert!(
            SubmissionFilter {
                stage_id: Some(StageId(3)),
                status: Some(SubmissionStatus::Processing),
                team_id: Some(team),
            }
            .matches(&record)
        );
        assert!(
            !SubmissionFilter {
                status: Some(SubmissionStatus::Passed),
                ..SubmissionFilter::default()
            }
            .matches(&record)
        );
    }

    #[test]
    fn team_id_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<TeamId>().is_err());
        let id = TeamId::new_v4();
        assert_eq!(id.to_string().parse::<TeamId>().expect("parse"), id);
    }
}
