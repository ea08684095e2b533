//! # Seed Documents
//!
//! Competition setup files: tracks, stages and teams in TOML or JSON.
//!
//! ```toml
//! [[tracks]]
//! id = 1
//! name = "UI/UX"
//! category = "design"
//!
//! [[stages]]
//! id = 10
//! track_id = 1
//! name = "Proposal"
//! order = 1
//! deadline = "2025-05-10T23:59:00Z"
//!
//! [[teams]]
//! name = "Alpha"
//! track_id = 1
//! verification = "verified"
//! ```
//!
//! Deadlines are RFC 3339 strings. Team ids are generated when omitted.

use crate::primitives::{MAX_DOCUMENT_SIZE, MAX_SEED_RECORDS};
use crate::{Stage, StagegateError, Team, TeamId, Track, TrackId, VerificationStatus};
use serde::{Deserialize, Serialize};

/// A team as written in a seed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTeam {
    #[serde(default)]
    pub id: Option<TeamId>,
    pub name: String,
    pub track_id: TrackId,
    #[serde(default)]
    pub verification: Option<VerificationStatus>,
    #[serde(default)]
    pub payment_proof: Option<String>,
}

impl SeedTeam {
    /// Materialize the team, generating an id when none was given.
    #[must_use]
    pub fn into_team(self) -> Team {
        let mut team = Team::new(self.id.unwrap_or_else(TeamId::new_v4), self.name, self.track_id);
        team.verification = self.verification.unwrap_or(VerificationStatus::Unverified);
        team.payment_proof = self.payment_proof;
        team
    }
}

/// Everything needed to set up a competition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub teams: Vec<SeedTeam>,
}

impl SeedDocument {
    /// Parse a TOML seed.
    pub fn from_toml(text: &str) -> Result<Self, StagegateError> {
        check_size(text.len())?;
        let document: Self = toml::from_str(text)
            .map_err(|e| StagegateError::SerializationError(format!("Invalid seed TOML: {}", e)))?;
        document.check_record_count()?;
        Ok(document)
    }

    /// Parse a JSON seed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StagegateError> {
        check_size(bytes.len())?;
        let document: Self = serde_json::from_slice(bytes)
            .map_err(|e| StagegateError::SerializationError(format!("Invalid seed JSON: {}", e)))?;
        document.check_record_count()?;
        Ok(document)
    }

    /// Total number of records in the document.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.tracks
            .len()
            .saturating_add(self.stages.len())
            .saturating_add(self.teams.len())
    }

    fn check_record_count(&self) -> Result<(), StagegateError> {
        let count = self.record_count();
        if count > MAX_SEED_RECORDS {
            return Err(StagegateError::InvalidArgument(format!(
                "seed holds {} records, maximum is {}",
                count, MAX_SEED_RECORDS
            )));
        }
        Ok(())
    }
}

fn check_size(len: usize) -> Result<(), StagegateError> {
    if len > MAX_DOCUMENT_SIZE {
        return Err(StagegateError::SerializationError(format!(
            "Seed size {} bytes exceeds maximum allowed {} bytes",
            len, MAX_DOCUMENT_SIZE
        )));
    }
    Ok(())
}
