//! # Stagegate - Competition Progression Server
//!
//! The main binary for the Stagegate stage progression engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for setup, submissions and verdicts
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/stagegate (THE BINARY)            │
//! │                                                      │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────┐   │
//! │   │    CLI      │    │  HTTP API   │    │ Config │   │
//! │   │   (clap)    │    │   (axum)    │    │ (toml) │   │
//! │   └──────┬──────┘    └──────┬──────┘    └────────┘   │
//! │          └─────────┬────────┘                        │
//! │                    ▼                                 │
//! │           ┌────────────────┐                         │
//! │           │ stagegate-core │                         │
//! │           │  (THE LOGIC)   │                         │
//! │           └────────────────┘                         │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! stagegate server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! stagegate seed -f competition.toml
//! stagegate progress -t 0b9f6a7e-3c1d-4f7a-9f57-1f2a3b4c5d6e
//! stagegate judge -t 0b9f6a7e-3c1d-4f7a-9f57-1f2a3b4c5d6e -s 10 --status passed
//! ```

use clap::Parser;
use stagegate::cli;
use stagegate::config::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let default_filter = if cli.verbose {
        "stagegate=debug,tower_http=debug"
    } else {
        "stagegate=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match config.log.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Stagegate startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┌┬┐┌─┐┌─┐┌─┐┌─┐┌─┐┌┬┐┌─┐
  └─┐ │ ├─┤│ ┬├┤ │ ┬├─┤ │ ├┤
  └─┘ ┴ ┴ ┴└─┘└─┘└─┘┴ ┴ ┴ └─┘

  Competition Progression Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
