//! HTTP API Layer
//!
//! This crate provides the REST API for the field-force platform using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each domain
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: camelCase request/response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! The visit service is wired with two post-record hooks: the coverage
//! synchronizer and the beat-plan marker. Both run inside the recording
//! request and their failures are logged and swallowed.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{config::ApiConfig, create_router};
//!
//! let app = create_router(pool, ApiConfig::from_env()?);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_beat::{BeatPlanStore, BeatService, BeatVisitMarker};
use domain_coverage::{ComplianceEngine, CoveragePlanStore, CoverageService, CoverageSynchronizer};
use domain_directory::{DirectoryPort, DirectoryService};
use domain_visit::{VisitLedgerPort, VisitService};
use infra_db::{
    PostgresBeatAdapter, PostgresCoverageAdapter, PostgresDirectoryAdapter, PostgresVisitAdapter,
};

use crate::config::ApiConfig;
use crate::handlers::{beat, coverage, directory, health, visit};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<DirectoryService>,
    pub visits: Arc<VisitService>,
    pub coverage: Arc<CoverageService>,
    pub beats: Arc<BeatService>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the domain services against the given ports
    pub fn new(
        directory: Arc<dyn DirectoryPort>,
        ledger: Arc<dyn VisitLedgerPort>,
        plans: Arc<dyn CoveragePlanStore>,
        beats: Arc<dyn BeatPlanStore>,
        config: ApiConfig,
    ) -> Self {
        let timezone = config.reporting_timezone();
        let engine = Arc::new(ComplianceEngine::new(Arc::clone(&ledger), timezone));

        let visits = VisitService::new(ledger, Arc::clone(&directory), config.visit_rules())
            .with_hook(Arc::new(CoverageSynchronizer::new(
                Arc::clone(&plans),
                Arc::clone(&engine),
            )))
            .with_hook(Arc::new(BeatVisitMarker::new(Arc::clone(&beats), timezone)));

        Self {
            directory: Arc::new(DirectoryService::new(Arc::clone(&directory))),
            visits: Arc::new(visits),
            coverage: Arc::new(CoverageService::new(plans, Arc::clone(&directory), engine)),
            beats: Arc::new(BeatService::new(beats, directory)),
            config,
        }
    }
}

/// Creates the main API router backed by PostgreSQL adapters
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `config` - API configuration
pub fn create_router(pool: PgPool, config: ApiConfig) -> Router {
    let timezone = config.reporting_timezone();
    let state = AppState::new(
        Arc::new(PostgresDirectoryAdapter::new(pool.clone())),
        Arc::new(PostgresVisitAdapter::new(pool.clone(), timezone)),
        Arc::new(PostgresCoverageAdapter::new(pool.clone())),
        Arc::new(PostgresBeatAdapter::new(pool)),
        config,
    );
    router(state)
}

/// Creates the API router from pre-wired state
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Coverage routes
    let coverage_routes = Router::new()
        .route("/create", post(coverage::create_plan))
        .route("/plans", get(coverage::list_plans))
        .route("/summary", get(coverage::summary))
        .route("/my-coverage", get(coverage::my_coverage))
        .route("/:id", put(coverage::update_plan));

    // Visit routes
    let visit_routes = Router::new()
        .route("/", post(visit::record_visit))
        .route("/", get(visit::list_visits))
        .route("/:id", get(visit::get_visit))
        .route("/:id", put(visit::update_visit));

    // Directory routes
    let doctor_routes = Router::new()
        .route("/", post(directory::create_doctor))
        .route("/", get(directory::list_doctors))
        .route("/:id", get(directory::get_doctor))
        .route("/:id", put(directory::update_doctor));
    let user_routes = Router::new()
        .route("/", post(directory::create_user))
        .route("/mrs", get(directory::list_mrs));

    // Beat plan routes
    let beat_routes = Router::new()
        .route("/", post(beat::create_plan))
        .route("/", get(beat::list_plans));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/coverage", coverage_routes)
        .nest("/visits", visit_routes)
        .nest("/doctors", doctor_routes)
        .nest("/users", user_routes)
        .nest("/beat-plans", beat_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
