//! # Stagegate HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Registration summary
//! - `GET /tracks/{track_id}/stages` - Stage catalog of a track
//! - `GET /teams/{team_id}/progress` - Current/next stage and eligibility
//! - `POST /teams/{team_id}/submissions` - Submit a deliverable link
//! - `GET /submissions?stage_id&status&team_id` - Filtered submission list
//! - `PUT /teams/{team_id}/stages/{stage_id}/status` - Record a verdict
//! - `PUT /teams/{team_id}/verification` - Record a payment verification
//! - `PUT /teams/{team_id}/payment-proof` - Record the payment-proof link
//!
//! ## Security Configuration
//!
//! Taken from `SecurityConfig` (`[security]` in `stagegate.toml` or the
//! `STAGEGATE_*` environment variables): API key, rate limit, CORS origins.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, keys_match};
pub use handlers::{ApiError, denial_status, error_status};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    EligibilityJson, ErrorResponse, HealthResponse, ProgressResponse, StagesResponse,
    PaymentProofRequest, StatusResponse, StatusUpdateRequest, SubmissionListResponse,
    SubmissionsQuery, SubmitRequest, SubmitResponse, TeamResponse, VerificationRequest,
};

use crate::config::SecurityConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use stagegate_core::{Registry, StagegateError};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body (2 MiB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// `Registry` is `Sync` and serializes its own writes, so handlers share it
/// without an outer lock. With the file backend every commit is already on
/// disk when the handler returns.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub security: Arc<SecurityConfig>,
}

impl AppState {
    /// State with default security settings: no API key, default rate limit,
    /// localhost CORS.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::with_security(registry, SecurityConfig::default())
    }

    #[must_use]
    pub fn with_security(registry: Registry, security: SecurityConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            security: Arc::new(security),
        }
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.registry.backend().name()
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: allows all origins (development only)
/// - empty: localhost only
/// - otherwise: the listed origins; invalid entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        build_localhost_cors()
    } else {
        cors_with_origins(allowed_origins)
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();
    cors_with_origins(origins)
}

fn cors_with_origins(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - if enabled
/// 5. Authentication - if an API key is configured
pub fn create_router(state: AppState) -> Router {
    let security = Arc::clone(&state.security);

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/tracks/{track_id}/stages", get(handlers::stages_handler))
        .route("/teams/{team_id}/progress", get(handlers::progress_handler))
        .route("/teams/{team_id}/submissions", post(handlers::submit_handler))
        .route("/submissions", get(handlers::list_submissions_handler))
        .route(
            "/teams/{team_id}/stages/{stage_id}/status",
            put(handlers::judge_handler),
        )
        .route(
            "/teams/{team_id}/verification",
            put(handlers::verification_handler),
        )
        .route(
            "/teams/{team_id}/payment-proof",
            put(handlers::payment_proof_handler),
        );

    match security.api_key() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                ApiKey::new(key),
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set STAGEGATE_API_KEY to enable authentication."
            );
        }
    }

    if security.rate_limit > 0 {
        tracing::info!(
            "Rate limiting enabled: {} requests/second",
            security.rate_limit
        );
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(security.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&security.cors_origins))
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), StagegateError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StagegateError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Stagegate HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StagegateError::IoError(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

// =============================================================================
// TESTS
// =============================================================================
