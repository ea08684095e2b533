//! # Status Transitions
//!
//! Administrator-driven changes, plus the team's own payment-proof link.
//! No eligibility re-check happens here.
//!
//! ```text
//!  (none) --submit--> processing --pass--> passed
//!                     processing --fail--> failed
//!                     passed/failed --override--> passed/failed
//! ```

use crate::store::UnitOfWork;
use crate::validation::validate_link;
use crate::{
    StageId, StagegateError, SubmissionRecord, SubmissionStatus, Team, TeamId,
    VerificationStatus,
};
use chrono::{DateTime, Utc};

/// Set the verdict on an existing submission record.
///
/// Only `passed` and `failed` are accepted. The record must exist.
pub fn judge_submission<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    team: TeamId,
    stage: StageId,
    status: SubmissionStatus,
    now: DateTime<Utc>,
) -> Result<SubmissionRecord, StagegateError> {
    if !status.is_verdict() {
        return Err(StagegateError::InvalidArgument(format!(
            "status must be passed or failed, got {}",
            status
        )));
    }
    if unit.team(team)?.is_none() {
        return Err(StagegateError::TeamNotFound(team));
    }
    if unit.stage(stage)?.is_none() {
        return Err(StagegateError::StageNotFound(stage));
    }

    let mut record = unit
        .submission(team, stage)?
        .ok_or(StagegateError::SubmissionNotFound(team, stage))?;
    let previous = record.status;
    record.status = status;
    record.updated_at = now;
    unit.put_submission(&record)?;

    tracing::info!(
        team = %team,
        stage = %stage,
        from = previous.as_str(),
        to = status.as_str(),
        "submission judged"
    );
    Ok(record)
}

/// Set a team's payment verification status.
pub fn set_verification<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    team: TeamId,
    status: VerificationStatus,
) -> Result<Team, StagegateError> {
    let mut found = unit.team(team)?.ok_or(StagegateError::TeamNotFound(team))?;
    let previous = found.verification;
    found.verification = status;
    unit.put_team(&found)?;

    tracing::info!(
        team = %team,
        from = previous.as_str(),
        to = status.as_str(),
        "verification updated"
    );
    Ok(found)
}

/// Store the link to a team's payment proof.
///
/// Replaces any earlier link. The verification status is left to the
/// administrator.
pub fn record_payment_proof<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    team: TeamId,
    link: &str,
) -> Result<Team, StagegateError> {
    let link = validate_link(link)?;
    let mut found = unit.team(team)?.ok_or(StagegateError::TeamNotFound(team))?;
    found.payment_proof = Some(link.to_string());
    unit.put_team(&found)?;

    tracing::info!(team = %team, "payment proof recorded");
    Ok(found)
}
