use crate::auth::AuthenticatedProvider;
use crate::data::{AppointmentQuery, AppointmentStore};
use crate::errors::AppError;
use crate::handlers::{AppState, JsonBody};
use crate::models::*;
use crate::scheduling::available_slots;
use crate::validation::parse_day;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/appointments
///
/// Books the lead with the calling provider. The lead becomes qualified, booked
/// and assigned; its score is left untouched until the next rescoring pass.
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
    JsonBody(payload): JsonBody<AppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = payload.validate()?;

    let appointment = AppointmentStore::new(state.db.clone())
        .create(provider.id, &booking)
        .await?;

    tracing::info!(
        "Provider {} booked appointment {} for lead {} at {}",
        provider.id,
        appointment.appointment.id,
        booking.lead_id,
        booking.scheduled_date
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment created successfully",
            "appointment": appointment,
        })),
    ))
}

/// GET /api/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
    Query(params): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let query = AppointmentQuery::from_params(params)?;
    let (appointments, total) = AppointmentStore::new(state.db.clone())
        .list(provider.id, &query)
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "pagination": Pagination::new(query.page, query.limit, total),
    })))
}

/// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentView>, AppError> {
    let appointment = AppointmentStore::new(state.db.clone())
        .find_detailed(provider.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    Ok(Json(appointment))
}

/// PATCH /api/appointments/:id/status
///
/// Completion converts the lead; cancellation or a no-show closes it.
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<AppointmentStatusUpdate>,
) -> Result<Json<Value>, AppError> {
    let status = payload
        .status
        .as_deref()
        .and_then(|s| s.parse::<AppointmentStatus>().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid status".to_string()))?;

    if let Some(cost) = payload.actual_cost {
        if !cost.is_finite() || cost < 0.0 {
            return Err(AppError::Validation(
                "\"actualCost\" must be greater than or equal to 0".to_string(),
            ));
        }
    }

    let completion_notes = payload
        .completion_notes
        .as_deref()
        .filter(|n| !n.trim().is_empty());

    let appointment = AppointmentStore::new(state.db.clone())
        .update_status(provider.id, id, status, completion_notes, payload.actual_cost)
        .await?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    tracing::info!(
        "Appointment {} moved to {}{}",
        appointment.id,
        status,
        status
            .lead_outcome()
            .map(|outcome| format!(", lead {} is now {}", appointment.lead_id, outcome))
            .unwrap_or_default()
    );

    Ok(Json(json!({
        "message": "Appointment status updated successfully",
        "appointment": appointment,
    })))
}

/// GET /api/appointments/slots/available?date=YYYY-MM-DD
pub async fn available_slots_for_day(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
    Query(params): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let raw = params
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Date parameter is required".to_string()))?;
    let day = parse_day(&raw)
        .ok_or_else(|| AppError::BadRequest("Date must be formatted as YYYY-MM-DD".to_string()))?;

    let booked = AppointmentStore::new(state.db.clone())
        .booked_times(provider.id, day)
        .await?;

    Ok(Json(json!({
        "availableSlots": available_slots(day, &booked),
    })))
}
