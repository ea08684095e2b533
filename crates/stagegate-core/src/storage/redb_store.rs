//! # redb-backed Progress Storage
//!
//! A disk-backed `ProgressStore` using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Row values are postcard-encoded. A read closure runs against one
//! `ReadTransaction`; a unit of work runs against one `WriteTransaction`,
//! committed on `Ok` and aborted on `Err`. redb admits a single write
//! transaction at a time, which serializes every check-then-write.

use crate::store::{ProgressReader, ProgressStore, UnitOfWork};
use crate::{
    Stage, StageId, StagegateError, SubmissionFilter, SubmissionRecord, Team, TeamId, Track,
    TrackId,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for tracks: TrackId(u64) -> serialized Track bytes
const TRACKS: TableDefinition<u64, &[u8]> = TableDefinition::new("tracks");

/// Table for stages: StageId(u64) -> serialized Stage bytes
const STAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("stages");

/// Table for teams: TeamId(u128) -> serialized Team bytes
const TEAMS: TableDefinition<u128, &[u8]> = TableDefinition::new("teams");

/// Table for submissions: (team_id, stage_id) -> serialized SubmissionRecord.
/// The team id leads the key so one team's records form a contiguous range.
const SUBMISSIONS: TableDefinition<(u128, u64), &[u8]> = TableDefinition::new("submissions");

fn store_err(e: impl std::fmt::Display) -> StagegateError {
    StagegateError::StoreFailure(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StagegateError> {
    postcard::to_allocvec(value).map_err(|e| StagegateError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StagegateError> {
    postcard::from_bytes(bytes).map_err(|e| StagegateError::SerializationError(e.to_string()))
}

// =============================================================================
// STORE
// =============================================================================

/// A disk-backed progress store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a progress database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StagegateError> {
        let db = Database::create(path.as_ref()).map_err(store_err)?;

        // Create every table up front so read transactions never miss one.
        {
            let write_txn = db.begin_write().map_err(store_err)?;
            let _ = write_txn.open_table(TRACKS).map_err(store_err)?;
            let _ = write_txn.open_table(STAGES).map_err(store_err)?;
            let _ = write_txn.open_table(TEAMS).map_err(store_err)?;
            let _ = write_txn.open_table(SUBMISSIONS).map_err(store_err)?;
            write_txn.commit().map_err(store_err)?;
        }

        tracing::debug!(path = %path.as_ref().display(), "opened redb store");
        Ok(Self { db })
    }
}

impl ProgressStore for RedbStore {
    fn read<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&dyn ProgressReader) -> Result<T, StagegateError>,
    {
        let view = ReadView {
            txn: self.db.begin_read().map_err(store_err)?,
        };
        f(&view)
    }

    fn write<T, F>(&self, f: F) -> Result<T, StagegateError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, StagegateError>,
    {
        let mut view = WriteView {
            txn: self.db.begin_write().map_err(store_err)?,
        };

        match f(&mut view) {
            Ok(value) => {
                view.txn.commit().map_err(store_err)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = view.txn.abort() {
                    tracing::warn!(error = %abort_err, "failed to abort redb transaction");
                }
                Err(e)
            }
        }
    }
}

// =============================================================================
// TRANSACTION VIEWS
// =============================================================================

struct ReadView {
    txn: ReadTransaction,
}

struct WriteView {
    txn: WriteTransaction,
}

/// Both transaction kinds expose `open_table` with tables implementing
/// `ReadableTable`, so the reader is written once.
macro_rules! impl_progress_reader {
    ($view:ty) => {
        impl ProgressReader for $view {
            fn track(&self, id: TrackId) -> Result<Option<Track>, StagegateError> {
                let table = self.txn.open_table(TRACKS).map_err(store_err)?;
                let row = table.get(id.0).map_err(store_err)?;
                row.map(|data| decode(data.value())).transpose()
            }

            fn tracks(&self) -> Result<Vec<Track>, StagegateError> {
                let table = self.txn.open_table(TRACKS).map_err(store_err)?;
                let mut tracks = Vec::new();
                for entry in table.iter().map_err(store_err)? {
                    let (_, value) = entry.map_err(store_err)?;
                    tracks.push(decode(value.value())?);
                }
                Ok(tracks)
            }

            fn stage(&self, id: StageId) -> Result<Option<Stage>, StagegateError> {
                let table = self.txn.open_table(STAGES).map_err(store_err)?;
                let row = table.get(id.0).map_err(store_err)?;
                row.map(|data| decode(data.value())).transpose()
            }

            fn stages(&self, track: TrackId) -> Result<Vec<Stage>, StagegateError> {
                let table = self.txn.open_table(STAGES).map_err(store_err)?;
                let mut stages = Vec::new();
                for entry in table.iter().map_err(store_err)? {
                    let (_, value) = entry.map_err(store_err)?;
                    let stage: Stage = decode(value.value())?;
                    if stage.track_id == track {
                        stages.push(stage);
                    }
                }
                stages.sort_by_key(|stage| (stage.order, stage.id));
                Ok(stages)
            }

            fn team(&self, id: TeamId) -> Result<Option<Team>, StagegateError> {
                let table = self.txn.open_table(TEAMS).map_err(store_err)?;
                let row = table.get(id.0.as_u128()).map_err(store_err)?;
                row.map(|data| decode(data.value())).transpose()
            }

            fn teams(&self) -> Result<Vec<Team>, StagegateError> {
                let table = self.txn.open_table(TEAMS).map_err(store_err)?;
                let mut teams = Vec::new();
                for entry in table.iter().map_err(store_err)? {
                    let (_, value) = entry.map_err(store_err)?;
                    teams.push(decode(value.value())?);
                }
                Ok(teams)
            }

            fn submission(
                &self,
                team: TeamId,
                stage: StageId,
            ) -> Result<Option<SubmissionRecord>, StagegateError> {
                let table = self.txn.open_table(SUBMISSIONS).map_err(store_err)?;
                let row = table
                    .get((team.0.as_u128(), stage.0))
                    .map_err(store_err)?;
                row.map(|data| decode(data.value())).transpose()
            }

            fn submissions_for_team(
                &self,
                team: TeamId,
            ) -> Result<Vec<SubmissionRecord>, StagegateError> {
                let key = team.0.as_u128();
                let table = self.txn.open_table(SUBMISSIONS).map_err(store_err)?;
                let mut records = Vec::new();
                for entry in table
                    .range((key, 0u64)..=(key, u64::MAX))
                    .map_err(store_err)?
                {
                    let (_, value) = entry.map_err(store_err)?;
                    records.push(decode(value.value())?);
                }
                Ok(records)
            }

            fn submissions(
                &self,
                filter: &SubmissionFilter,
            ) -> Result<Vec<SubmissionRecord>, StagegateError> {
                if let Some(team) = filter.team_id {
                    let records = self.submissions_for_team(team)?;
                    return Ok(records.into_iter().filter(|r| filter.matches(r)).collect());
                }

                let table = self.txn.open_table(SUBMISSIONS).map_err(store_err)?;
                let mut records = Vec::new();
                for entry in table.iter().map_err(store_err)? {
                    let (_, value) = entry.map_err(store_err)?;
                    let record: SubmissionRecord = decode(value.value())?;
                    if filter.matches(&record) {
                        records.push(record);
                    }
                }
                Ok(records)
            }
        }
    };
}

impl_progress_reader!(ReadView);
impl_progress_reader!(WriteView);

impl UnitOfWork for WriteView {
    fn put_track(&mut self, track: &Track) -> Result<(), StagegateError> {
        let bytes = encode(track)?;
        let mut table = self.txn.open_table(TRACKS).map_err(store_err)?;
        table
            .insert(track.id.0, bytes.as_slice())
            .map_err(store_err)?;
        Ok(())
    }

    fn put_stage(&mut self, stage: &Stage) -> Result<(), StagegateError> {
        let bytes = encode(stage)?;
        let mut table = self.txn.open_table(STAGES).map_err(store_err)?;
        table
            .insert(stage.id.0, bytes.as_slice())
            .map_err(store_err)?;
        Ok(())
    }

    fn put_team(&mut self, team: &Team) -> Result<(), StagegateError> {
        let bytes = encode(team)?;
        let mut table = self.txn.open_table(TEAMS).map_err(store_err)?;
        table
            .insert(team.id.0.as_u128(), bytes.as_slice())
            .map_err(store_err)?;
        Ok(())
    }

    fn put_submission(&mut self, record: &SubmissionRecord) -> Result<(), StagegateError> {
        let bytes = encode(record)?;
        let mut table = self.txn.open_table(SUBMISSIONS).map_err(store_err)?;
        table
            .insert(
                (record.team_id.0.as_u128(), record.stage_id.0),
                bytes.as_slice(),
            )
            .map_err(store_err)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
