//! # Progress Resolver
//!
//! Computes where a team stands in its track.
//!
//! The sequence shown to a team is the track's real stages in `order`, with
//! a synthesized payment entry inserted at the track's payment placement.
//! The payment entry is never persisted: its status is the team's
//! verification status and its payload is the team's payment-proof link.
//!
//! ## Scan
//!
//! | Condition | Current entry |
//! |-----------|---------------|
//! | team not verified, payment entry present | the payment entry |
//! | otherwise | first entry that is not passed |
//! | every entry passed | last entry (terminal) |
//!
//! Resolution is a pure read over one snapshot.

use crate::catalog::StageCatalog;
use crate::primitives::PAYMENT_STAGE_NAME;
use crate::store::ProgressReader;
use crate::{
    PaymentPlacement, Stage, StageId, StagegateError, SubmissionRecord, SubmissionStatus, Team,
    TeamId, Track, TrackId, VerificationStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// VIEW TYPES
// =============================================================================

/// Status carried by one entry of the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryState {
    /// The synthesized payment milestone.
    Payment {
        verification: VerificationStatus,
        proof: Option<String>,
    },
    /// A real stage and the team's record for it, if any.
    Submission {
        status: Option<SubmissionStatus>,
        payload: Option<String>,
    },
}

/// One entry of a team's stage sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    /// `None` for the payment entry.
    pub stage_id: Option<StageId>,
    pub name: String,
    pub deadline: Option<DateTime<Utc>>,
    pub state: EntryState,
}

impl StageEntry {
    fn payment(team: &Team, deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            stage_id: None,
            name: PAYMENT_STAGE_NAME.to_string(),
            deadline,
            state: EntryState::Payment {
                verification: team.verification,
                proof: team.payment_proof.clone(),
            },
        }
    }

    fn stage(stage: &Stage, record: Option<&SubmissionRecord>) -> Self {
        Self {
            stage_id: Some(stage.id),
            name: stage.name.clone(),
            deadline: stage.deadline,
            state: EntryState::Submission {
                status: record.map(|r| r.status),
                payload: record.map(|r| r.payload.clone()),
            },
        }
    }

    #[must_use]
    pub fn is_payment(&self) -> bool {
        matches!(self.state, EntryState::Payment { .. })
    }

    /// Passed stage, or verified payment.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        match &self.state {
            EntryState::Payment { verification, .. } => verification.is_verified(),
            EntryState::Submission { status, .. } => *status == Some(SubmissionStatus::Passed),
        }
    }

    /// True when `now` is strictly after the deadline.
    #[must_use]
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }

    /// Recorded submission status; `None` for payment or unsubmitted stages.
    #[must_use]
    pub fn submission_status(&self) -> Option<SubmissionStatus> {
        match &self.state {
            EntryState::Payment { .. } => None,
            EntryState::Submission { status, .. } => *status,
        }
    }

    /// Short status label for display.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        match &self.state {
            EntryState::Payment { verification, .. } => verification.as_str(),
            EntryState::Submission { status, .. } => {
                status.map(SubmissionStatus::as_str).unwrap_or("open")
            }
        }
    }
}

/// Where a team stands in its track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressView {
    pub team_id: TeamId,
    pub track_id: TrackId,
    pub track_name: String,
    pub verification: VerificationStatus,
    /// Index of the current entry in `stages`.
    pub current_index: usize,
    /// `None` when the current entry is the payment milestone.
    pub current_stage_id: Option<StageId>,
    pub current_stage_name: String,
    pub next_stage_name: Option<String>,
    pub next_stage_deadline: Option<DateTime<Utc>>,
    /// Every entry is passed; nothing further can be submitted.
    pub terminal: bool,
    pub stages: Vec<StageEntry>,
}

impl ProgressView {
    #[must_use]
    pub fn current(&self) -> Option<&StageEntry> {
        self.stages.get(self.current_index)
    }

    #[must_use]
    pub fn next(&self) -> Option<&StageEntry> {
        if self.terminal {
            return None;
        }
        self.stages.get(self.current_index.saturating_add(1))
    }

    /// Real stages only, paired with their index among real stages.
    pub fn real_stages(&self) -> impl Iterator<Item = (usize, &StageEntry)> {
        self.stages
            .iter()
            .filter(|entry| !entry.is_payment())
            .enumerate()
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Computes progress views from one consistent snapshot.
pub struct ProgressResolver<'a, R: ProgressReader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: ProgressReader + ?Sized> ProgressResolver<'a, R> {
    #[must_use]
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Resolve the current and next entry for a team.
    ///
    /// Fails with `TeamNotFound`, `TrackNotFound`, or `NoStages` when the
    /// track has neither real stages nor a payment milestone.
    pub fn resolve(&self, team_id: TeamId) -> Result<ProgressView, StagegateError> {
        let team = self
            .reader
            .team(team_id)?
            .ok_or(StagegateError::TeamNotFound(team_id))?;
        let catalog = StageCatalog::new(self.reader);
        let track = catalog.track(team.track_id)?;
        let stages = catalog.stages(track.id)?;
        let records: BTreeMap<StageId, SubmissionRecord> = self
            .reader
            .submissions_for_team(team.id)?
            .into_iter()
            .map(|record| (record.stage_id, record))
            .collect();

        let entries = build_sequence(&track, &team, &stages, &records);
        let last = entries
            .len()
            .checked_sub(1)
            .ok_or(StagegateError::NoStages(track.id))?;

        let payment = entries.iter().position(StageEntry::is_payment);
        let first_open = entries.iter().position(|entry| !entry.is_passed());

        let (current_index, terminal) = match (payment, first_open) {
            (Some(index), _) if !team.verification.is_verified() => (index, false),
            (_, Some(index)) => (index, false),
            (_, None) => (last, true),
        };

        let current = entries
            .get(current_index)
            .ok_or(StagegateError::NoStages(track.id))?;
        let next = if terminal {
            None
        } else {
            entries.get(current_index.saturating_add(1))
        };

        tracing::debug!(
            team = %team.id,
            track = %track.id,
            current = %current.name,
            terminal,
            "resolved progress"
        );

        Ok(ProgressView {
            team_id: team.id,
            track_id: track.id,
            track_name: track.name.clone(),
            verification: team.verification,
            current_index,
            current_stage_id: current.stage_id,
            current_stage_name: current.name.clone(),
            next_stage_name: next.map(|entry| entry.name.clone()),
            next_stage_deadline: next.and_then(|entry| entry.deadline),
            terminal,
            stages: entries,
        })
    }
}

/// Real stages in order with the payment entry inserted at the track's
/// placement. A placement past the end appends the payment entry.
///
/// The payment entry takes the deadline of the real stage that follows it.
fn build_sequence(
    track: &Track,
    team: &Team,
    stages: &[Stage],
    records: &BTreeMap<StageId, SubmissionRecord>,
) -> Vec<StageEntry> {
    let mut entries: Vec<StageEntry> = stages
        .iter()
        .map(|stage| StageEntry::stage(stage, records.get(&stage.id)))
        .collect();

    if let PaymentPlacement::At(position) = track.placement() {
        let position = position.min(stages.len());
        let deadline = stages.get(position).and_then(|stage| stage.deadline);
        entries.insert(position, StageEntry::payment(team, deadline));
    }

    entries
}

// =============================================================================
// TESTS
// =============================================================================
