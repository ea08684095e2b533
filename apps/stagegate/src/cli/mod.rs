//! # Stagegate CLI Module
//!
//! This module implements the CLI interface for Stagegate.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show the registration summary
//! - `init` - Initialize a new database
//! - `seed` - Load tracks, stages and teams from a TOML or JSON file
//! - `stages` - List the stages of a track
//! - `progress` - Show where a team stands
//! - `submit` - Submit a deliverable link for a team
//! - `judge` - Record a verdict on a submission
//! - `verify` - Record a payment verification
//! - `proof` - Record the link to a team's payment proof
//! - `submissions` - List submissions

mod commands;

use crate::config::{Backend, Config};
use clap::{Parser, Subcommand};
use stagegate_core::StagegateError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stagegate - competition stage progression server
///
/// Tracks where every team stands in its track and decides whether a new
/// submission is accepted.
#[derive(Parser, Debug)]
#[command(name = "stagegate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: ./stagegate.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the registration summary
    Status,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Load tracks, stages and teams from a file (all or nothing)
    Seed {
        /// Seed file (.toml or .json)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the stages of a track in order
    Stages {
        /// Track ID
        #[arg(short, long)]
        track: u64,
    },

    /// Show a team's current and next stage
    Progress {
        /// Team ID (UUID)
        #[arg(short, long)]
        team: String,
    },

    /// Submit a deliverable link to the team's next open stage
    Submit {
        /// Team ID (UUID)
        #[arg(short, long)]
        team: String,

        /// Deliverable link (http/https)
        #[arg(short, long)]
        link: String,

        /// Only report whether the submission would be accepted
        #[arg(long)]
        check: bool,
    },

    /// Record a verdict (passed/failed) on a team's submission
    Judge {
        /// Team ID (UUID)
        #[arg(short, long)]
        team: String,

        /// Stage ID
        #[arg(short, long)]
        stage: u64,

        /// Verdict: passed or failed
        #[arg(long)]
        status: String,
    },

    /// Record a team's payment verification status
    Verify {
        /// Team ID (UUID)
        #[arg(short, long)]
        team: String,

        /// unverified, processing, verified or rejected
        #[arg(long)]
        status: String,
    },

    /// Record the link to a team's payment proof
    Proof {
        /// Team ID (UUID)
        #[arg(short, long)]
        team: String,

        /// Payment-proof link (http/https)
        #[arg(short, long)]
        link: String,
    },

    /// List submissions, optionally filtered
    Submissions {
        /// Only this stage
        #[arg(long)]
        stage: Option<u64>,

        /// Only this status (processing, passed, failed)
        #[arg(long)]
        status: Option<String>,

        /// Only this team
        #[arg(long)]
        team: Option<String>,
    },
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Load the layered configuration and apply the CLI flags on top.
pub fn load_config(cli: &Cli) -> Result<Config, StagegateError> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(database) = &cli.database {
        config.storage.database = database.clone();
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if let Some(Commands::Server { host, port }) = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    Ok(config)
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and the resolved configuration.
pub async fn execute(cli: Cli, config: Config) -> Result<(), StagegateError> {
    let storage = &config.storage;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&config).await,
        Some(Commands::Status) => cmd_status(storage, json_mode),
        Some(Commands::Init { force }) => cmd_init(storage, force),
        Some(Commands::Seed { file }) => cmd_seed(storage, json_mode, &file),
        Some(Commands::Stages { track }) => cmd_stages(storage, json_mode, track),
        Some(Commands::Progress { team }) => cmd_progress(storage, json_mode, &team),
        Some(Commands::Submit { team, link, check }) => {
            cmd_submit(storage, json_mode, &team, &link, check)
        }
        Some(Commands::Judge {
            team,
            stage,
            status,
        }) => cmd_judge(storage, json_mode, &team, stage, &status),
        Some(Commands::Verify { team, status }) => cmd_verify(storage, json_mode, &team, &status),
        Some(Commands::Proof { team, link }) => cmd_proof(storage, json_mode, &team, &link),
        Some(Commands::Submissions {
            stage,
            status,
            team,
        }) => cmd_submissions(
            storage,
            json_mode,
            stage,
            status.as_deref(),
            team.as_deref(),
        ),
        None => {
            // No subcommand - show status by default
            cmd_status(storage, json_mode)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
