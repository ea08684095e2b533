//! # Registry
//!
//! The public entry point of the engine: a storage backend plus every
//! operation callers (HTTP handlers, CLI commands) are allowed to perform.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)
//! - `File`: `FileStore` (in memory, saved to a JSON snapshot on every commit)
//!
//! Every read runs against one snapshot and every mutation inside one unit
//! of work.

use crate::catalog::{StageCatalog, register_stage, register_team, register_track};
use crate::formats::seed::SeedDocument;
use crate::formats::snapshot::Snapshot;
use crate::guard::{self, Eligibility, SubmissionOutcome};
use crate::resolver::{ProgressResolver, ProgressView};
use crate::storage::{FileStore, RedbStore};
use crate::store::{ProgressReader, ProgressStore, UnitOfWork};
use crate::transition;
use crate::{
    MemoryStore, Stage, StageId, StagegateError, SubmissionFilter, SubmissionRecord,
    SubmissionStatus, Team, TeamId, Track, TrackId, VerificationStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Registry.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed tables using redb (ACID, persistent).
    Persistent(RedbStore),
    /// In-memory tables mirrored to a locked JSON snapshot.
    File(FileStore),
}

impl StorageBackend {
    /// Short backend label for status output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Persistent(_) => "redb",
            Self::File(_) => "file",
        }
    }
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl ProgressStore for StorageBackend {
    fn read<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&dyn ProgressReader) -> Result<T, StagegateError>,
    {
        match self {
            Self::InMemory(store) => store.read(f),
            Self::Persistent(store) => store.read(f),
            Self::File(store) => store.read(f),
        }
    }

    fn write<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, StagegateError>,
    {
        match self {
            Self::InMemory(store) => store.write(f),
            Self::Persistent(store) => store.write(f),
            Self::File(store) => store.write(f),
        }
    }
}

// =============================================================================
// REPORT TYPES
// =============================================================================

/// Registered team count for one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_id: TrackId,
    pub name: String,
    pub teams: usize,
    pub verified_teams: usize,
}

/// Registration totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_teams: usize,
    pub verified_teams: usize,
    pub per_track: Vec<TrackSummary>,
}

/// Number of records inserted by a seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub tracks: usize,
    pub stages: usize,
    pub teams: usize,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The stage progression and submission-eligibility engine.
///
/// `Registry` is `Sync`: share it behind an `Arc` and call it from any
/// number of threads. Concurrent submissions for the same team are
/// serialized by the backend's unit of work.
#[derive(Debug, Default)]
pub struct Registry {
    backend: StorageBackend,
}

impl Registry {
    /// Create a registry with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry over an existing in-memory store.
    #[must_use]
    pub fn with_memory(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Create a registry with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, StagegateError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Create a registry backed by a JSON snapshot file.
    ///
    /// Locks the file for the registry's lifetime; fails if another
    /// registry already holds it.
    pub fn with_file(path: impl AsRef<Path>) -> Result<Self, StagegateError> {
        Ok(Self {
            backend: StorageBackend::File(FileStore::open(path)?),
        })
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// True when commits reach disk (redb or snapshot file).
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !matches!(self.backend, StorageBackend::InMemory(_))
    }

    /// Snapshot of a memory-resident registry. `None` for redb storage.
    pub fn snapshot(&self) -> Result<Option<Snapshot>, StagegateError> {
        match &self.backend {
            StorageBackend::InMemory(store) => store.snapshot().map(Some),
            StorageBackend::File(store) => store.snapshot().map(Some),
            StorageBackend::Persistent(_) => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Progress
    // -------------------------------------------------------------------------

    /// Where the team stands in its track.
    pub fn current_stage(&self, team: TeamId) -> Result<ProgressView, StagegateError> {
        self.backend
            .read(|reader| ProgressResolver::new(reader).resolve(team))
    }

    /// Progress and eligibility of a team, both from one snapshot.
    pub fn progress(&self, team: TeamId) -> Result<(ProgressView, Eligibility), StagegateError> {
        self.progress_at(team, Utc::now())
    }

    pub fn progress_at(
        &self,
        team: TeamId,
        now: DateTime<Utc>,
    ) -> Result<(ProgressView, Eligibility), StagegateError> {
        self.backend.read(|reader| {
            let view = ProgressResolver::new(reader).resolve(team)?;
            let eligibility = guard::check_resolved(reader, &view, now)?;
            Ok((view, eligibility))
        })
    }

    /// Preview whether a submission would be accepted now.
    pub fn check_eligibility(&self, team: TeamId) -> Result<Eligibility, StagegateError> {
        self.check_eligibility_at(team, Utc::now())
    }

    pub fn check_eligibility_at(
        &self,
        team: TeamId,
        now: DateTime<Utc>,
    ) -> Result<Eligibility, StagegateError> {
        self.backend.read(|reader| guard::check(reader, team, now))
    }

    // -------------------------------------------------------------------------
    // Submissions
    // -------------------------------------------------------------------------

    /// Submit a deliverable link for the team's next open stage.
    pub fn create_submission(
        &self,
        team: TeamId,
        payload: &str,
    ) -> Result<SubmissionOutcome, StagegateError> {
        self.create_submission_at(team, payload, Utc::now())
    }

    /// `create_submission` with an explicit clock.
    pub fn create_submission_at(
        &self,
        team: TeamId,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome, StagegateError> {
        self.backend
            .write(|unit| guard::submit(unit, team, payload, now))
    }

    /// Administrator verdict on a submission.
    pub fn update_submission_status(
        &self,
        team: TeamId,
        stage: StageId,
        status: SubmissionStatus,
    ) -> Result<SubmissionRecord, StagegateError> {
        let now = Utc::now();
        self.backend
            .write(|unit| transition::judge_submission(unit, team, stage, status, now))
    }

    pub fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StagegateError> {
        self.backend.read(|reader| reader.submissions(filter))
    }

    // -------------------------------------------------------------------------
    // Teams
    // -------------------------------------------------------------------------

    /// Administrator payment verification.
    pub fn update_verification_status(
        &self,
        team: TeamId,
        status: VerificationStatus,
    ) -> Result<Team, StagegateError> {
        self.backend
            .write(|unit| transition::set_verification(unit, team, status))
    }

    /// Record the link to the team's payment proof.
    ///
    /// The link becomes the payload of the payment entry in `current_stage`.
    pub fn record_payment_proof(&self, team: TeamId, link: &str) -> Result<Team, StagegateError> {
        self.backend
            .write(|unit| transition::record_payment_proof(unit, team, link))
    }

    pub fn team(&self, id: TeamId) -> Result<Team, StagegateError> {
        self.backend
            .read(|reader| reader.team(id)?.ok_or(StagegateError::TeamNotFound(id)))
    }

    pub fn teams(&self) -> Result<Vec<Team>, StagegateError> {
        self.backend.read(|reader| reader.teams())
    }

    /// Registration totals per track.
    pub fn summary(&self) -> Result<Summary, StagegateError> {
        self.backend.read(|reader| {
            let teams = reader.teams()?;
            let per_track = reader
                .tracks()?
                .into_iter()
                .map(|track| {
                    let track_id = track.id;
                    let members: Vec<&Team> = teams
                        .iter()
                        .filter(|team| team.track_id == track_id)
                        .collect();
                    TrackSummary {
                        track_id,
                        name: track.name,
                        teams: members.len(),
                        verified_teams: members
                            .iter()
                            .filter(|team| team.verification.is_verified())
                            .count(),
                    }
                })
                .collect();

            Ok(Summary {
                total_teams: teams.len(),
                verified_teams: teams
                    .iter()
                    .filter(|team| team.verification.is_verified())
                    .count(),
                per_track,
            })
        })
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub fn track(&self, id: TrackId) -> Result<Track, StagegateError> {
        self.backend.read(|reader| StageCatalog::new(reader).track(id))
    }

    pub fn tracks(&self) -> Result<Vec<Track>, StagegateError> {
        self.backend.read(|reader| reader.tracks())
    }

    /// Stages of a track ordered by `order`.
    pub fn stages(&self, track: TrackId) -> Result<Vec<Stage>, StagegateError> {
        self.backend
            .read(|reader| StageCatalog::new(reader).stages(track))
    }

    pub fn stage(&self, id: StageId) -> Result<Stage, StagegateError> {
        self.backend
            .read(|reader| StageCatalog::new(reader).stage_by_id(id))
    }

    pub fn first_stage(&self, track: TrackId) -> Result<Stage, StagegateError> {
        self.backend
            .read(|reader| StageCatalog::new(reader).first_stage(track))
    }

    pub fn next_stage(&self, current: StageId) -> Result<Stage, StagegateError> {
        self.backend
            .read(|reader| StageCatalog::new(reader).next_stage(current))
    }

    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    pub fn insert_track(&self, track: &Track) -> Result<(), StagegateError> {
        self.backend.write(|unit| register_track(unit, track))
    }

    pub fn insert_stage(&self, stage: &Stage) -> Result<(), StagegateError> {
        self.backend.write(|unit| register_stage(unit, stage))
    }

    pub fn insert_team(&self, team: &Team) -> Result<(), StagegateError> {
        self.backend.write(|unit| register_team(unit, team))
    }

    /// Insert tracks, then stages, then teams in one unit of work.
    ///
    /// Any invalid record aborts the whole seed.
    pub fn seed(&self, document: SeedDocument) -> Result<SeedReport, StagegateError> {
        let report = self.backend.write(|unit| {
            let mut report = SeedReport::default();
            for track in &document.tracks {
                register_track(unit, track)?;
                report.tracks = report.tracks.saturating_add(1);
            }
            for stage in &document.stages {
                register_stage(unit, stage)?;
                report.stages = report.stages.saturating_add(1);
            }
            for team in document.teams {
                register_team(unit, &team.into_team())?;
                report.teams = report.teams.saturating_add(1);
            }
            Ok(report)
        })?;

        tracing::info!(
            tracks = report.tracks,
            stages = report.stages,
            teams = report.teams,
            "seed applied"
        );
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================
