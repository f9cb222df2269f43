use crate::auth::AuthenticatedProvider;
use crate::data::{AppointmentStore, LeadStore};
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::insights::{conversion_rate, score_distribution, start_of_day, start_of_month};
use crate::models::*;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

/// Default look-back window for lead analytics, in days.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;
const MAX_PERIOD_DAYS: i64 = 3650;

/// GET /api/analytics/dashboard
///
/// Lead counts cover every lead; appointment counts and revenue only the
/// calling provider's. The score distribution is computed fresh and not saved.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
) -> Result<Json<Value>, AppError> {
    let leads = LeadStore::new(state.db.clone());
    let appointments = AppointmentStore::new(state.db.clone());
    let now = Utc::now();

    let total_leads = leads.count().await?;
    let new_leads = leads.count_with_status(LeadStatus::Pending).await?;
    let converted_leads = leads.count_with_status(LeadStatus::Converted).await?;
    let today_leads = leads.count_created_since(start_of_day(now)).await?;

    let total_appointments = appointments.count_for_provider(provider.id).await?;
    let active_appointments = appointments.count_active(provider.id).await?;
    let monthly_revenue = appointments
        .revenue_since(provider.id, start_of_month(now))
        .await?;

    let all_leads = leads.find_all().await?;
    let distribution = score_distribution(&all_leads, &state.scorer, now);
    let leads_by_service = leads.service_breakdown().await?;

    Ok(Json(json!({
        "overview": {
            "totalLeads": total_leads,
            "newLeads": new_leads,
            "todayLeads": today_leads,
            "convertedLeads": converted_leads,
            "conversionRate": conversion_rate(converted_leads, total_leads),
            "totalAppointments": total_appointments,
            "activeAppointments": active_appointments,
            "monthlyRevenue": monthly_revenue,
        },
        "scoreDistribution": distribution,
        "leadsByService": leads_by_service,
        "rating": provider.rating_average,
    })))
}

/// GET /api/analytics/leads?period=30
pub async fn lead_analytics(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(_provider): AuthenticatedProvider,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let days = params.period.unwrap_or(DEFAULT_PERIOD_DAYS);
    if !(1..=MAX_PERIOD_DAYS).contains(&days) {
        return Err(AppError::Validation(format!(
            "\"period\" must be between 1 and {}",
            MAX_PERIOD_DAYS
        )));
    }
    let since = Utc::now() - Duration::days(days);

    let leads = LeadStore::new(state.db.clone());
    let leads_over_time = leads.daily_counts(since).await?;
    let status_breakdown = leads.status_breakdown(Some(since)).await?;
    let source_breakdown = leads.source_breakdown(Some(since)).await?;

    Ok(Json(json!({
        "leadsOverTime": leads_over_time,
        "statusBreakdown": status_breakdown,
        "sourceBreakdown": source_breakdown,
    })))
}
