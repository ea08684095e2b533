//! # Snapshot Format
//!
//! JSON dump of every table, the on-disk format of `FileStore`.
//!
//! Format: a JSON object with a `format` tag and a `version`, followed by the
//! four tables as arrays. Size, tag and version are validated before the
//! tables are trusted.

use crate::primitives::{MAX_DOCUMENT_SIZE, SNAPSHOT_FORMAT, SNAPSHOT_VERSION};
use crate::{Stage, StagegateError, SubmissionRecord, Team, Track};
use serde::{Deserialize, Serialize};

/// Every row of a store at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format: String,
    pub version: u8,
    pub tracks: Vec<Track>,
    pub stages: Vec<Stage>,
    pub teams: Vec<Team>,
    pub submissions: Vec<SubmissionRecord>,
}

impl Snapshot {
    #[must_use]
    pub fn new(
        tracks: Vec<Track>,
        stages: Vec<Stage>,
        teams: Vec<Team>,
        submissions: Vec<SubmissionRecord>,
    ) -> Self {
        Self {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            tracks,
            stages,
            teams,
            submissions,
        }
    }

    /// Validate the format tag and version.
    pub fn validate(&self) -> Result<(), StagegateError> {
        if self.format != SNAPSHOT_FORMAT {
            return Err(StagegateError::SerializationError(format!(
                "Invalid snapshot format tag '{}'",
                self.format
            )));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(StagegateError::SerializationError(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        Ok(())
    }

    /// Serialize to pretty-printed JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, StagegateError> {
        serde_json::to_vec_pretty(self).map_err(|e| StagegateError::SerializationError(e.to_string()))
    }

    /// Parse and validate JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StagegateError> {
        if bytes.len() > MAX_DOCUMENT_SIZE {
            return Err(StagegateError::SerializationError(format!(
                "Snapshot size {} bytes exceeds maximum allowed {} bytes",
                bytes.len(),
                MAX_DOCUMENT_SIZE
            )));
        }

        let snapshot: Self = serde_json::from_slice(bytes).map_err(|e| {
            StagegateError::SerializationError(format!("Failed to parse snapshot: {}", e))
        })?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }
}
