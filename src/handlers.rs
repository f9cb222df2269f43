use crate::auth::TokenKeys;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::Provider;
use crate::scoring::{BehaviorSignals, LeadScorer};
use axum::{extract::FromRequest, http::StatusCode, Json};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

/// How long an authenticated provider is served from memory before it is reloaded.
pub const PROVIDER_CACHE_TTL: Duration = Duration::from_secs(60);
/// Window in which an identical intake submission returns the lead already created.
pub const DUPLICATE_SUBMISSION_WINDOW: Duration = Duration::from_secs(300);

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Signs and verifies bearer tokens.
    pub tokens: TokenKeys,
    /// Scores leads; the signal source is chosen at startup.
    pub scorer: LeadScorer,
    /// Provider accounts keyed by id, so authenticated routes skip a lookup per request.
    pub provider_cache: Cache<Uuid, Provider>,
    /// Intake fingerprint -> id of the lead it created.
    pub recent_submissions: Cache<String, Uuid>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let scorer = if config.simulated_signals {
            LeadScorer::simulated()
        } else {
            LeadScorer::fixed(BehaviorSignals::NONE)
        };
        Self::with_scorer(db, config, scorer)
    }

    pub fn with_scorer(db: PgPool, config: Config, scorer: LeadScorer) -> Self {
        let provider_cache = Cache::builder()
            .time_to_live(PROVIDER_CACHE_TTL)
            .max_capacity(10_000)
            .build();
        let recent_submissions = Cache::builder()
            .time_to_live(DUPLICATE_SUBMISSION_WINDOW)
            .max_capacity(10_000)
            .build();

        Self {
            db,
            tokens: TokenKeys::from_config(&config),
            config,
            scorer,
            provider_cache,
            recent_submissions,
        }
    }
}

/// JSON request body whose rejections answer in the API's error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "service": "leadflow-api",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
        })),
    )
}
