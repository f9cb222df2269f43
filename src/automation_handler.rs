use crate::auth::AuthenticatedProvider;
use crate::data::LeadStore;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::insights::{count_hot_pending, Insights};
use crate::models::LeadStatus;
use crate::rescoring::rescore_open_leads;
use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

/// Pending leads older than this count as not yet contacted.
pub const UNCONTACTED_AFTER_HOURS: i64 = 24;

/// POST /api/automation/score-leads
pub async fn score_leads(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
) -> Result<Json<Value>, AppError> {
    tracing::info!("Provider {} triggered bulk rescoring", provider.id);

    let store = LeadStore::new(state.db.clone());
    let summary = rescore_open_leads(&store, &state.scorer, Utc::now()).await?;

    Ok(Json(json!({
        "message": "Lead scoring automation completed",
        "totalLeads": summary.total_leads,
        "updatedLeads": summary.updated_leads,
    })))
}

/// GET /api/automation/insights
pub async fn insights(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(_provider): AuthenticatedProvider,
) -> Result<Json<Insights>, AppError> {
    let store = LeadStore::new(state.db.clone());
    let now = Utc::now();

    let pending = store.find_by_status(LeadStatus::Pending).await?;
    let hot = count_hot_pending(&pending, &state.scorer, now);
    let stale = store
        .count_pending_before(now - Duration::hours(UNCONTACTED_AFTER_HOURS))
        .await?;
    let follow_ups = store.count_follow_ups_due(now).await?;

    Ok(Json(Insights::new(
        hot,
        u64::try_from(stale).unwrap_or(0),
        u64::try_from(follow_ups).unwrap_or(0),
    )))
}
