//! # In-Memory Store
//!
//! The default `ProgressStore` backend.
//!
//! All data lives in `BTreeMap` tables for deterministic ordering. A single
//! `RwLock` guards the tables:
//! - `read` holds the read guard for the whole closure (one consistent view)
//! - `write` holds the write guard for the whole unit of work and applies
//!   changes to a staged copy, which replaces the live tables only on `Ok`

use crate::formats::snapshot::Snapshot;
use crate::store::{ProgressReader, ProgressStore, UnitOfWork};
use crate::{
    Stage, StageId, StagegateError, SubmissionFilter, SubmissionRecord, Team, TeamId, Track,
    TrackId,
};
use std::collections::BTreeMap;
use std::sync::RwLock;

// =============================================================================
// TABLES
// =============================================================================

/// The four tables of the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    tracks: BTreeMap<TrackId, Track>,
    stages: BTreeMap<StageId, Stage>,
    teams: BTreeMap<TeamId, Team>,
    submissions: BTreeMap<(TeamId, StageId), SubmissionRecord>,
}

impl ProgressReader for Tables {
    fn track(&self, id: TrackId) -> Result<Option<Track>, StagegateError> {
        Ok(self.tracks.get(&id).cloned())
    }

    fn tracks(&self) -> Result<Vec<Track>, StagegateError> {
        Ok(self.tracks.values().cloned().collect())
    }

    fn stage(&self, id: StageId) -> Result<Option<Stage>, StagegateError> {
        Ok(self.stages.get(&id).cloned())
    }

    fn stages(&self, track: TrackId) -> Result<Vec<Stage>, StagegateError> {
        let mut stages: Vec<Stage> = self
            .stages
            .values()
            .filter(|stage| stage.track_id == track)
            .cloned()
            .collect();
        stages.sort_by_key(|stage| (stage.order, stage.id));
        Ok(stages)
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, StagegateError> {
        Ok(self.teams.get(&id).cloned())
    }

    fn teams(&self) -> Result<Vec<Team>, StagegateError> {
        Ok(self.teams.values().cloned().collect())
    }

    fn submission(
        &self,
        team: TeamId,
        stage: StageId,
    ) -> Result<Option<SubmissionRecord>, StagegateError> {
        Ok(self.submissions.get(&(team, stage)).cloned())
    }

    fn submissions_for_team(&self, team: TeamId) -> Result<Vec<SubmissionRecord>, StagegateError> {
        Ok(self
            .submissions
            .range((team, StageId(0))..=(team, StageId(u64::MAX)))
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StagegateError> {
        Ok(self
            .submissions
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}

impl UnitOfWork for Tables {
    fn put_track(&mut self, track: &Track) -> Result<(), StagegateError> {
        self.tracks.insert(track.id, track.clone());
        Ok(())
    }

    fn put_stage(&mut self, stage: &Stage) -> Result<(), StagegateError> {
        self.stages.insert(stage.id, stage.clone());
        Ok(())
    }

    fn put_team(&mut self, team: &Team) -> Result<(), StagegateError> {
        self.teams.insert(team.id, team.clone());
        Ok(())
    }

    fn put_submission(&mut self, record: &SubmissionRecord) -> Result<(), StagegateError> {
        self.submissions
            .insert((record.team_id, record.stage_id), record.clone());
        Ok(())
    }
}

impl From<Snapshot> for Tables {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            tracks: snapshot.tracks.into_iter().map(|t| (t.id, t)).collect(),
            stages: snapshot.stages.into_iter().map(|s| (s.id, s)).collect(),
            teams: snapshot.teams.into_iter().map(|t| (t.id, t)).collect(),
            submissions: snapshot
                .submissions
                .into_iter()
                .map(|r| ((r.team_id, r.stage_id), r))
                .collect(),
        }
    }
}

impl From<&Tables> for Snapshot {
    fn from(tables: &Tables) -> Self {
        Snapshot::new(
            tables.tracks.values().cloned().collect(),
            tables.stages.values().cloned().collect(),
            tables.teams.values().cloned().collect(),
            tables.submissions.values().cloned().collect(),
        )
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Thread-safe in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a previously taken snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            tables: RwLock::new(Tables::from(snapshot)),
        }
    }

    /// Copy the current contents into a serializable snapshot.
    pub fn snapshot(&self) -> Result<Snapshot, StagegateError> {
        let tables = self.tables.read().map_err(|e| poisoned(&e))?;
        Ok(Snapshot::from(&*tables))
    }
}

fn poisoned(e: &dyn std::fmt::Display) -> StagegateError {
    StagegateError::StoreFailure(format!("memory store lock poisoned: {}", e))
}

impl ProgressStore for MemoryStore {
    fn read<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&dyn ProgressReader) -> Result<T, StagegateError>,
    {
        let tables = self.tables.read().map_err(|e| poisoned(&e))?;
        f(&*tables)
    }

    fn write<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, StagegateError>,
    {
        let mut tables = self.tables.write().map_err(|e| poisoned(&e))?;
        let mut staged = tables.clone();
        let result = f(&mut staged)?;
        *tables = staged;
        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
