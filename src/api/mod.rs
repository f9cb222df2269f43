//! HTTP surface: route table plus the middleware stack.

use crate::handlers::{self, AppState};
use crate::{
    analytics_handler, appointment_handler, auth_handler, automation_handler, lead_handler,
};
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the application router. `/health` bypasses rate limiting; every path
/// no route claims falls through to the static front end.
pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    // 10 requests/second per client IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let api_routes = Router::new()
        // Accounts
        .route(
            "/api/auth/customer/register",
            post(auth_handler::register_customer),
        )
        .route(
            "/api/auth/provider/register",
            post(auth_handler::register_provider),
        )
        .route("/api/auth/customer/login", post(auth_handler::login_customer))
        .route("/api/auth/provider/login", post(auth_handler::login_provider))
        .route("/api/auth/profile", get(auth_handler::profile))
        // Leads
        .route(
            "/api/leads",
            post(lead_handler::create_lead).get(lead_handler::list_leads),
        )
        .route("/api/leads/stats/overview", get(lead_handler::lead_stats))
        .route("/api/leads/:id", get(lead_handler::get_lead))
        .route(
            "/api/leads/:id/status",
            patch(lead_handler::update_lead_status),
        )
        .route(
            "/api/leads/:id/interactions",
            post(lead_handler::add_interaction),
        )
        // Appointments
        .route(
            "/api/appointments",
            post(appointment_handler::create_appointment)
                .get(appointment_handler::list_appointments),
        )
        .route(
            "/api/appointments/slots/available",
            get(appointment_handler::available_slots_for_day),
        )
        .route(
            "/api/appointments/:id",
            get(appointment_handler::get_appointment),
        )
        .route(
            "/api/appointments/:id/status",
            patch(appointment_handler::update_appointment_status),
        )
        // Analytics & automation
        .route("/api/analytics/dashboard", get(analytics_handler::dashboard))
        .route("/api/analytics/leads", get(analytics_handler::lead_analytics))
        .route(
            "/api/automation/score-leads",
            post(automation_handler::score_leads),
        )
        .route("/api/automation/insights", get(automation_handler::insights))
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    let static_files = ServeDir::new(&state.config.static_dir);

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .fallback_service(static_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
