//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, EligibilityJson};
use crate::config::{Backend, Config, StorageConfig};
use serde::Serialize;
use stagegate_core::{
    Registry, SeedDocument, StageId, StagegateError, SubmissionFilter, SubmissionOutcome,
    SubmissionStatus, TeamId, TrackId, VerificationStatus, primitives::MAX_DOCUMENT_SIZE,
};
use std::path::Path;

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Read a file after checking its size.
fn read_bounded(path: &Path) -> Result<Vec<u8>, StagegateError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        StagegateError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    if metadata.len() > MAX_DOCUMENT_SIZE as u64 {
        return Err(StagegateError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_DOCUMENT_SIZE
        )));
    }

    std::fs::read(path)
        .map_err(|e| StagegateError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn parse_team(raw: &str) -> Result<TeamId, StagegateError> {
    raw.parse()
}

// =============================================================================
// REGISTRY LOADING
// =============================================================================

/// Open the registry described by the storage settings.
///
/// - `redb`: opens or creates the database file
/// - `file`: locks and loads the JSON snapshot, or creates an empty one
///
/// Both backends keep the database exclusively open until the registry is
/// dropped; every committed change is already on disk.
pub fn load_registry(storage: &StorageConfig) -> Result<Registry, StagegateError> {
    match storage.backend {
        Backend::Redb => Registry::with_redb(&storage.database),
        Backend::File => Registry::with_file(&storage.database),
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config) -> Result<(), StagegateError> {
    let storage = &config.storage;
    let registry = load_registry(storage)?;
    let state = AppState::with_security(registry, config.security.clone());

    println!("Stagegate Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.server.addr());
    println!("  Backend:  {}", storage.backend.as_str());
    println!("  Database: {:?}", storage.database);
    println!();
    println!("Endpoints:");
    println!("  GET  /health                                  - Health check");
    println!("  GET  /status                                  - Registration summary");
    println!("  GET  /tracks/{{track_id}}/stages                - Stage catalog");
    println!("  GET  /teams/{{team_id}}/progress                - Current stage");
    println!("  POST /teams/{{team_id}}/submissions             - Submit");
    println!("  GET  /submissions                             - List submissions");
    println!("  PUT  /teams/{{team_id}}/stages/{{stage_id}}/status - Verdict");
    println!("  PUT  /teams/{{team_id}}/verification            - Payment verification");
    println!("  PUT  /teams/{{team_id}}/payment-proof           - Payment-proof link");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.server.addr(), state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show the registration summary.
pub fn cmd_status(storage: &StorageConfig, json_mode: bool) -> Result<(), StagegateError> {
    let registry = load_registry(storage)?;
    let summary = registry.summary()?;

    if json_mode {
        print_json(&api::StatusResponse::new(storage.backend.as_str(), summary));
        return Ok(());
    }

    println!("Stagegate Status");
    println!("================");
    println!("Database: {:?}", storage.database);
    println!("Backend:  {}", storage.backend.as_str());
    println!();
    println!("Teams:    {}", summary.total_teams);
    println!("Verified: {}", summary.verified_teams);
    if !summary.per_track.is_empty() {
        println!();
        for track in &summary.per_track {
            println!(
                "  [{}] {:<24} {:>4} teams, {:>4} verified",
                track.track_id, track.name, track.teams, track.verified_teams
            );
        }
    }

    Ok(())
}

// =============================================================================
// INIT & SEED COMMANDS
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(storage: &StorageConfig, force: bool) -> Result<(), StagegateError> {
    let path = &storage.database;
    if path.exists() && !force {
        return Err(StagegateError::InvalidArgument(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }
    if path.exists() {
        std::fs::remove_file(path)
            .map_err(|e| StagegateError::IoError(format!("Remove '{}': {}", path.display(), e)))?;
    }

    let _registry = load_registry(storage)?;
    println!(
        "Initialized new {} database at {:?}",
        storage.backend.as_str(),
        path
    );

    Ok(())
}

/// Load a seed document. `.json` files are JSON, everything else TOML.
pub fn cmd_seed(storage: &StorageConfig, json_mode: bool, file: &Path) -> Result<(), StagegateError> {
    let data = read_bounded(file)?;
    let is_json = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let document = if is_json {
        SeedDocument::from_json(&data)?
    } else {
        let text = String::from_utf8(data)
            .map_err(|e| StagegateError::SerializationError(format!("Seed is not UTF-8: {}", e)))?;
        SeedDocument::from_toml(&text)?
    };

    let registry = load_registry(storage)?;
    let report = registry.seed(document)?;

    if json_mode {
        print_json(&report);
    } else {
        println!(
            "Seeded {} tracks, {} stages, {} teams",
            report.tracks, report.stages, report.teams
        );
    }
    Ok(())
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// List the stages of a track.
pub fn cmd_stages(storage: &StorageConfig, json_mode: bool, track: u64) -> Result<(), StagegateError> {
    let registry = load_registry(storage)?;
    let track = registry.track(TrackId(track))?;
    let stages = registry.stages(track.id)?;

    if json_mode {
        print_json(&api::StagesResponse { track, stages });
        return Ok(());
    }

    println!("Track {} - {} ({})", track.id, track.name, track.category);
    for stage in &stages {
        let deadline = stage
            .deadline
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "no deadline".to_string());
        println!("  {:>3}. [{}] {:<24} {}", stage.order, stage.id, stage.name, deadline);
    }
    Ok(())
}

/// Show where a team stands.
pub fn cmd_progress(storage: &StorageConfig, json_mode: bool, team: &str) -> Result<(), StagegateError> {
    let team = parse_team(team)?;
    let registry = load_registry(storage)?;
    let (progress, eligibility) = registry.progress(team)?;
    let eligibility = EligibilityJson::from(eligibility);

    if json_mode {
        print_json(&api::ProgressResponse {
            progress,
            eligibility,
        });
        return Ok(());
    }

    println!("Team {} - {}", progress.team_id, progress.track_name);
    println!("Verification: {}", progress.verification);
    println!();
    for (index, entry) in progress.stages.iter().enumerate() {
        let marker = if index == progress.current_index { ">" } else { " " };
        println!("{} {:<24} {}", marker, entry.name, entry.status_label());
    }
    println!();
    println!("Current: {}", progress.current_stage_name);
    match &progress.next_stage_name {
        Some(next) => println!("Next:    {}", next),
        None => println!("Next:    -"),
    }
    match (eligibility.stage_id, eligibility.reason) {
        (Some(stage), _) => println!("Can submit to stage {}", stage),
        (None, Some(reason)) => println!("Cannot submit: {}", reason),
        (None, None) => {}
    }
    Ok(())
}

/// List submissions matching the filters.
pub fn cmd_submissions(
    storage: &StorageConfig,
    json_mode: bool,
    stage: Option<u64>,
    status: Option<&str>,
    team: Option<&str>,
) -> Result<(), StagegateError> {
    let filter = SubmissionFilter {
        stage_id: stage.map(StageId),
        status: status.map(str::parse::<SubmissionStatus>).transpose()?,
        team_id: team.map(parse_team).transpose()?,
    };
    let registry = load_registry(storage)?;
    let submissions = registry.list_submissions(&filter)?;

    if json_mode {
        print_json(&api::SubmissionListResponse::from(submissions));
        return Ok(());
    }

    println!("{} submission(s)", submissions.len());
    for record in &submissions {
        println!(
            "  {} stage {:<6} {:<10} {} {}",
            record.team_id,
            record.stage_id,
            record.status,
            record.updated_at.to_rfc3339(),
            record.payload
        );
    }
    Ok(())
}

// =============================================================================
// WRITE COMMANDS
// =============================================================================

/// Submit a link, or with `check` only preview eligibility.
pub fn cmd_submit(
    storage: &StorageConfig,
    json_mode: bool,
    team: &str,
    link: &str,
    check: bool,
) -> Result<(), StagegateError> {
    let team = parse_team(team)?;
    let registry = load_registry(storage)?;

    if check {
        let eligibility = EligibilityJson::from(registry.check_eligibility(team)?);
        if json_mode {
            print_json(&eligibility);
        } else {
            match (eligibility.stage_id, eligibility.reason) {
                (Some(stage), _) => println!("Allowed: stage {}", stage),
                (None, Some(reason)) => println!("Denied: {}", reason),
                (None, None) => {}
            }
        }
        return Ok(());
    }

    match registry.create_submission(team, link)? {
        SubmissionOutcome::Accepted(record) => {
            if json_mode {
                print_json(&api::SubmitResponse::success(record));
            } else {
                println!(
                    "Accepted: stage {} is now {}",
                    record.stage_id, record.status
                );
            }
            Ok(())
        }
        SubmissionOutcome::Denied(denial) => {
            if json_mode {
                print_json(&api::SubmitResponse::denied(denial));
            }
            Err(StagegateError::Denied(denial))
        }
    }
}

/// Record a verdict on a team's submission.
pub fn cmd_judge(
    storage: &StorageConfig,
    json_mode: bool,
    team: &str,
    stage: u64,
    status: &str,
) -> Result<(), StagegateError> {
    let team = parse_team(team)?;
    let status: SubmissionStatus = status.parse()?;
    let registry = load_registry(storage)?;
    let record = registry.update_submission_status(team, StageId(stage), status)?;

    if json_mode {
        print_json(&record);
    } else {
        println!(
            "Team {} stage {} marked {}",
            record.team_id, record.stage_id, record.status
        );
    }
    Ok(())
}

/// Record a team's payment verification status.
pub fn cmd_verify(
    storage: &StorageConfig,
    json_mode: bool,
    team: &str,
    status: &str,
) -> Result<(), StagegateError> {
    let team = parse_team(team)?;
    let status: VerificationStatus = status.parse()?;
    let registry = load_registry(storage)?;
    let team = registry.update_verification_status(team, status)?;

    if json_mode {
        print_json(&api::TeamResponse { team });
    } else {
        println!("Team {} ({}) is now {}", team.id, team.name, team.verification);
    }
    Ok(())
}

/// Record the link to a team's payment proof.
pub fn cmd_proof(
    storage: &StorageConfig,
    json_mode: bool,
    team: &str,
    link: &str,
) -> Result<(), StagegateError> {
    let team = parse_team(team)?;
    let registry = load_registry(storage)?;
    let team = registry.record_payment_proof(team, link)?;

    if json_mode {
        print_json(&api::TeamResponse { team });
    } else {
        println!(
            "Team {} ({}) payment proof: {}",
            team.id,
            team.name,
            team.payment_proof.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
