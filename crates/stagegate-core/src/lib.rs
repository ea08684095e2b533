//! # stagegate-core
//!
//! The stage progression and submission-eligibility engine - THE LOGIC.
//!
//! Given a team's verification status and submission history, this crate
//! computes which stage the team is at, what comes next, and whether a new
//! submission is allowed right now.
//!
//! ## Components
//!
//! - `catalog`: ordered stage lookups and checked setup
//! - `resolver`: current/next entry, with the synthesized payment milestone
//! - `guard`: eligibility rules and the accepted-submission write
//! - `transition`: administrator verdicts and payment verification
//! - `registry`: the entry point tying a storage backend to the components
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - Storage is a port (`ProgressStore`); no global state
//! - Check-then-write runs inside one unit of work

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod formats;
pub mod guard;
pub mod memory;
pub mod primitives;
pub mod registry;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod transition;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Denial, PaymentPlacement, Stage, StageId, StagegateError, SubmissionFilter, SubmissionRecord,
    SubmissionStatus, Team, TeamId, Track, TrackCategory, TrackId, VerificationStatus,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use catalog::StageCatalog;
pub use guard::{Eligibility, SubmissionOutcome};
pub use memory::MemoryStore;
pub use registry::{Registry, SeedReport, StorageBackend, Summary, TrackSummary};
pub use resolver::{EntryState, ProgressResolver, ProgressView, StageEntry};
pub use storage::{FileStore, RedbStore};
pub use store::{ProgressReader, ProgressStore, UnitOfWork};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::seed::{SeedDocument, SeedTeam};
pub use formats::snapshot::Snapshot;
