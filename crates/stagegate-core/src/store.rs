//! # Storage Ports
//!
//! The engine never touches a concrete database. Every component receives
//! either a `ProgressReader` (one consistent snapshot) or a `UnitOfWork`
//! (a read-modify-write scope that commits as a whole or not at all).
//!
//! Backends implement `ProgressStore`, which hands out those scopes:
//! - `MemoryStore` (BTreeMap tables behind a `RwLock`)
//! - `RedbStore` (redb read/write transactions)
//! - `FileStore` (in-memory tables saved to a JSON snapshot before commit)

use crate::{
    Stage, StageId, StagegateError, SubmissionFilter, SubmissionRecord, Team, TeamId, Track,
    TrackId,
};

// =============================================================================
// READER
// =============================================================================

/// Read access to one consistent view of the store.
///
/// Listing methods return rows in a deterministic order:
/// stages by `order`, teams and submissions by key.
pub trait ProgressReader {
    fn track(&self, id: TrackId) -> Result<Option<Track>, StagegateError>;

    fn tracks(&self) -> Result<Vec<Track>, StagegateError>;

    fn stage(&self, id: StageId) -> Result<Option<Stage>, StagegateError>;

    /// All stages of a track ordered by `order`.
    fn stages(&self, track: TrackId) -> Result<Vec<Stage>, StagegateError>;

    fn team(&self, id: TeamId) -> Result<Option<Team>, StagegateError>;

    fn teams(&self) -> Result<Vec<Team>, StagegateError>;

    /// The single record for (team, stage), if any.
    fn submission(
        &self,
        team: TeamId,
        stage: StageId,
    ) -> Result<Option<SubmissionRecord>, StagegateError>;

    /// Every record of one team, ordered by stage id.
    fn submissions_for_team(&self, team: TeamId) -> Result<Vec<SubmissionRecord>, StagegateError>;

    /// Every record matching `filter`.
    fn submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StagegateError>;
}

// =============================================================================
// UNIT OF WORK
// =============================================================================

/// A read-modify-write scope.
///
/// Writes are raw upserts keyed by id; business validation happens in the
/// components that open the unit. Nothing written here is visible to other
/// callers until the enclosing `ProgressStore::write` commits.
pub trait UnitOfWork: ProgressReader {
    fn put_track(&mut self, track: &Track) -> Result<(), StagegateError>;

    fn put_stage(&mut self, stage: &Stage) -> Result<(), StagegateError>;

    fn put_team(&mut self, team: &Team) -> Result<(), StagegateError>;

    /// Insert or overwrite the record for (record.team_id, record.stage_id).
    fn put_submission(&mut self, record: &SubmissionRecord) -> Result<(), StagegateError>;
}

// =============================================================================
// STORE
// =============================================================================

/// A storage backend that hands out snapshots and units of work.
///
/// `write` is serialized across callers: two units of work never interleave.
/// The unit commits when the closure returns `Ok` and is discarded when it
/// returns `Err`.
pub trait ProgressStore {
    fn read<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&dyn ProgressReader) -> Result<T, StagegateError>;

    fn write<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, StagegateError>;
}
