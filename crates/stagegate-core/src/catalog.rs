//! # Stage Catalog
//!
//! Ordered stage lookups over a `ProgressReader`, plus the checked
//! registration path used at competition setup.
//!
//! Stages are created once and read-only afterwards. Registration enforces:
//! - the owning track exists
//! - `order` is unique within the track
//! - team names are unique (case-insensitive)

use crate::store::{ProgressReader, UnitOfWork};
use crate::validation::{validate_link, validate_name};
use crate::{Stage, StageId, StagegateError, Team, Track, TrackId};

// =============================================================================
// READ SIDE
// =============================================================================

/// Stage lookups bound to one snapshot.
pub struct StageCatalog<'a, R: ProgressReader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: ProgressReader + ?Sized> StageCatalog<'a, R> {
    #[must_use]
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    pub fn track(&self, id: TrackId) -> Result<Track, StagegateError> {
        self.reader
            .track(id)?
            .ok_or(StagegateError::TrackNotFound(id))
    }

    /// All stages of an existing track, ordered by `order`.
    pub fn stages(&self, track: TrackId) -> Result<Vec<Stage>, StagegateError> {
        self.track(track)?;
        self.reader.stages(track)
    }

    pub fn stage_by_id(&self, id: StageId) -> Result<Stage, StagegateError> {
        self.reader
            .stage(id)?
            .ok_or(StagegateError::StageNotFound(id))
    }

    /// The lowest-order stage of the track.
    pub fn first_stage(&self, track: TrackId) -> Result<Stage, StagegateError> {
        self.stages(track)?
            .into_iter()
            .next()
            .ok_or(StagegateError::NoStages(track))
    }

    /// The smallest-order stage strictly after `current` in the same track.
    pub fn next_stage(&self, current: StageId) -> Result<Stage, StagegateError> {
        let stage = self.stage_by_id(current)?;
        self.reader
            .stages(stage.track_id)?
            .into_iter()
            .find(|candidate| candidate.order > stage.order)
            .ok_or(StagegateError::NoNextStage(current))
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Insert a new track.
pub fn register_track<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    track: &Track,
) -> Result<(), StagegateError> {
    validate_name("track", &track.name)?;
    if unit.track(track.id)?.is_some() {
        return Err(StagegateError::InvalidArgument(format!(
            "track {} already exists",
            track.id
        )));
    }
    unit.put_track(track)
}

/// Insert a new stage into an existing track.
pub fn register_stage<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    stage: &Stage,
) -> Result<(), StagegateError> {
    validate_name("stage", &stage.name)?;
    if unit.track(stage.track_id)?.is_none() {
        return Err(StagegateError::TrackNotFound(stage.track_id));
    }
    if unit.stage(stage.id)?.is_some() {
        return Err(StagegateError::InvalidArgument(format!(
            "stage {} already exists",
            stage.id
        )));
    }
    if unit
        .stages(stage.track_id)?
        .iter()
        .any(|existing| existing.order == stage.order)
    {
        return Err(StagegateError::InvalidArgument(format!(
            "track {} already has a stage with order {}",
            stage.track_id, stage.order
        )));
    }
    unit.put_stage(stage)
}

/// Insert a new team into an existing track.
pub fn register_team<U: UnitOfWork + ?Sized>(
    unit: &mut U,
    team: &Team,
) -> Result<(), StagegateError> {
    let name = validate_name("team", &team.name)?;
    if let Some(proof) = &team.payment_proof {
        validate_link(proof)?;
    }
    if unit.track(team.track_id)?.is_none() {
        return Err(StagegateError::TrackNotFound(team.track_id));
    }
    if unit.team(team.id)?.is_some() {
        return Err(StagegateError::InvalidArgument(format!(
            "team {} already exists",
            team.id
        )));
    }
    if unit
        .teams()?
        .iter()
        .any(|existing| existing.name.trim().eq_ignore_ascii_case(name))
    {
        return Err(StagegateError::InvalidArgument(format!(
            "team name '{}' is already taken",
            name
        )));
    }
    unit.put_team(team)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::store::ProgressStore;
    use crate::{MemoryStore, TeamId, TrackCategory};

    fn catalog_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .write(|unit| {
                register_track(unit, &Track::new(TrackId(1), "UI/UX", TrackCategory::Design))?;
                register_track(unit, &Track::new(TrackId(2), "Empty", TrackCategory::General))?;
                register_stage(unit, &Stage::new(StageId(30), TrackId(1), "Final", 30))?;
                register_stage(unit, &Stage::new(StageId(10), TrackId(1), "Proposal", 10))?;
                register_stage(unit, &Stage::new(StageId(20), TrackId(1), "Semifinal", 20))
            })
            .expect("setup");
        store
    }

    #[test]
    fn first_and_next_follow_order() {
        let store = catalog_store();
        store
            .read(|reader| {
                let catalog = StageCatalog::new(reader);
                assert_eq!(catalog.first_stage(TrackId(1))?.id, StageId(10));
                assert_eq!(catalog.next_stage(StageId(10))?.id, StageId(20));
                assert_eq!(catalog.next_stage(StageId(20))?.id, StageId(30));
                assert!(matches!(
                    catalog.next_stage(StageId(30)),
                    Err(StagegateError::NoNextStage(StageId(30)))
                ));
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn missing_things_are_not_found() {
        let store = catalog_store();
        store
            .read(|reader| {
                let catalog = StageCatalog::new(reader);
                assert!(matches!(
                    catalog.first_stage(TrackId(2)),
                    Err(StagegateError::NoStages(TrackId(2)))
                ));
                assert!(matches!(
                    catalog.stages(TrackId(9)),
                    Err(StagegateError::TrackNotFound(TrackId(9)))
                ));
                assert!(matches!(
                    catalog.stage_by_id(StageId(99)),
                    Err(StagegateError::StageNotFound(StageId(99)))
                ));
                assert!(catalog.next_stage(StageId(99)).is_err_and(|e| e.is_not_found()));
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn duplicate_order_rejected() {
        let store = catalog_store();
        let result = store.write(|unit| {
            register_stage(unit, &Stage::new(StageId(40), TrackId(1), "Again", 20))
        });
        assert!(matches!(result, Err(StagegateError::InvalidArgument(_))));
    }

    #[test]
    fn stage_on_missing_track_rejected() {
        let store = catalog_store();
        let result = store.write(|unit| {
            register_stage(unit, &Stage::new(StageId(40), TrackId(7), "Orphan", 1))
        });
        assert!(matches!(result, Err(StagegateError::TrackNotFound(TrackId(7)))));
    }

    #[test]
    fn team_names_are_unique_ignoring_case() {
        let store = catalog_store();
        store
            .write(|unit| register_team(unit, &Team::new(TeamId::new_v4(), "Alpha", TrackId(1))))
            .expect("first team");
        let result = store.write(|unit| {
            register_team(unit, &Team::new(TeamId::new_v4(), "ALPHA", TrackId(1)))
        });
        assert!(matches!(result, Err(StagegateError::InvalidArgument(_))));
    }

    #[test]
    fn team_payment_proof_must_be_a_link() {
        let store = catalog_store();
        let result = store.write(|unit| {
            register_team(
                unit,
                &Team::new(TeamId::new_v4(), "Beta", TrackId(1)).with_payment_proof("receipt.pdf"),
            )
        });
        assert!(matches!(result, Err(StagegateError::InvalidArgument(_))));
    }
}
