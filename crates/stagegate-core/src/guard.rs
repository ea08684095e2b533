//! # Submission Eligibility Guard
//!
//! Decides whether a team may submit right now, and records the submission
//! when it may.
//!
//! The submission target is the first real stage whose record is not
//! `passed`. It differs from the displayed current entry only while the
//! payment milestone is pending, so a business team can hand in its
//! proposal before paying.
//!
//! ## Rules (first match wins)
//!
//! 1. Team `rejected` → `UnverifiedAccount`
//! 2. No target left → `NoRemainingStage`
//! 3. Target `failed` → `NotPassedPrevious`
//! 4. Target `processing` → `SubmissionProcessing`
//! 5. Target deadline over → `PassedDeadline`
//! 6. Target at or past the verification gate, team not verified → `UnverifiedAccount`
//! 7. Allow
//!
//! The check and the write of the `processing` record run inside one unit of
//! work, so concurrent attempts for the same team cannot both be accepted.

use crate::catalog::StageCatalog;
use crate::resolver::{ProgressResolver, ProgressView};
use crate::store::{ProgressReader, UnitOfWork};
use crate::validation::validate_link;
use crate::{
    Denial, StageId, StagegateError, SubmissionRecord, SubmissionStatus, TeamId,
    VerificationStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    /// A submission to this stage would be accepted.
    Allowed(StageId),
    Denied(Denial),
}

impl Eligibility {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// The `processing` record that was written.
    Accepted(SubmissionRecord),
    Denied(Denial),
}

impl SubmissionOutcome {
    /// Convert a denial into `StagegateError::Denied`.
    pub fn into_result(self) -> Result<SubmissionRecord, StagegateError> {
        match self {
            Self::Accepted(record) => Ok(record),
            Self::Denied(denial) => Err(StagegateError::Denied(denial)),
        }
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Evaluate the rules against a resolved view.
///
/// `gate` is the index, among real stages, of the first stage that requires
/// a verified team.
#[must_use]
pub fn evaluate(view: &ProgressView, gate: usize, now: DateTime<Utc>) -> Eligibility {
    if view.verification == VerificationStatus::Rejected {
        return Eligibility::Denied(Denial::UnverifiedAccount);
    }

    let Some((index, target)) = view.real_stages().find(|(_, entry)| !entry.is_passed()) else {
        return Eligibility::Denied(Denial::NoRemainingStage);
    };

    match target.submission_status() {
        Some(SubmissionStatus::Failed) => return Eligibility::Denied(Denial::NotPassedPrevious),
        Some(SubmissionStatus::Processing) => {
            return Eligibility::Denied(Denial::SubmissionProcessing);
        }
        Some(SubmissionStatus::Passed) | None => {}
    }

    if target.is_closed_at(now) {
        return Eligibility::Denied(Denial::PassedDeadline);
    }

    if index >= gate && !view.verification.is_verified() {
        return Eligibility::Denied(Denial::UnverifiedAccount);
    }

    match target.stage_id {
        Some(stage_id) => Eligibility::Allowed(stage_id),
        None => Eligibility::Denied(Denial::NoRemainingStage),
    }
}

/// Check eligibility without writing anything.
pub fn check<R: ProgressReader + ?Sized>(
    reader: &R,
    team: TeamId,
    now: DateTime<Utc>,
) -> Result<Eligibility, StagegateError> {
    let view = ProgressResolver::new(reader).resolve(team)?;
    check_resolved(reader, &view, now)
}

/// Check eligibility for a view already resolved from `reader`.
pub fn check_resolved<R: ProgressReader + ?Sized>(
    reader: &R,
    view: &ProgressView,
    now: DateTime<Utc>,
) -> Result<Eligibility, StagegateError> {
    if view.real_stages().next().is_none() {
        return Err(StagegateError::NoStages(view.track_id));
    }
    let gate = StageCatalog::new(reader)
        .track(view.track_id)?
        .verification_gate();
    Ok(evaluate(view, gate, now))
}

/// Check eligibility and, when allowed, write a `processing` record for the
/// target stage. Must run inside the caller's unit of work.
pub fn submit<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    team: TeamId,
    payload: &str,
    now: DateTime<Utc>,
) -> Result<SubmissionOutcome, StagegateError> {
    let payload = validate_link(payload)?;

    match check(&*unit, team, now)? {
        Eligibility::Denied(denial) => {
            tracing::info!(team = %team, reason = denial.code(), "submission denied");
            Ok(SubmissionOutcome::Denied(denial))
        }
        Eligibility::Allowed(stage_id) => {
            let record = SubmissionRecord::processing(team, stage_id, payload, now);
            unit.put_submission(&record)?;
            tracing::info!(team = %team, stage = %stage_id, "submission accepted");
            Ok(SubmissionOutcome::Accepted(record))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
