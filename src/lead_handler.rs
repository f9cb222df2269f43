use crate::auth::AuthenticatedProvider;
use crate::data::{LeadQuery, LeadStore};
use crate::errors::AppError;
use crate::handlers::{AppState, JsonBody};
use crate::insights::start_of_day;
use crate::models::*;
use crate::scoring::{LeadScorer, ScoreCategory};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of an intake submission: every field after normalisation, so only
/// a resubmission of the same form collapses onto the earlier lead.
pub fn submission_fingerprint(submission: &NewLead) -> String {
    let digits: String = submission
        .phone
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let email = submission.email.trim().to_lowercase();
    let message = submission.message.as_deref().map(str::trim).unwrap_or("");

    let mut hasher = Sha256::new();
    for part in [
        submission.name.trim(),
        email.as_str(),
        digits.as_str(),
        submission.service_type.as_str(),
        message,
        submission.source.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(b"\x1f");
    }
    hex::encode(hasher.finalize())
}

/// A pending, unscored lead built from a validated submission.
pub fn new_lead(submission: NewLead, now: DateTime<Utc>) -> Lead {
    Lead {
        id: Uuid::new_v4(),
        name: submission.name,
        email: submission.email,
        phone: submission.phone,
        service_type: submission.service_type,
        message: submission.message,
        status: LeadStatus::Pending,
        score: 0,
        source: submission.source,
        assigned_to: None,
        follow_up_date: None,
        notes: Vec::new(),
        interactions: Vec::new(),
        submission_time: now,
        response_time: None,
        appointment_booked: false,
        estimated_value: None,
        created_at: now,
        updated_at: now,
    }
}

/// Applies a provider's status change: response time on first contact, the
/// optional note and a `follow_up` interaction recording the change.
pub fn apply_status_update(
    lead: &mut Lead,
    status: LeadStatus,
    note: Option<String>,
    provider_id: Uuid,
    now: DateTime<Utc>,
) {
    lead.status = status;
    if status == LeadStatus::Contacted && lead.response_time.is_none() {
        lead.response_time = Some(now);
    }

    if let Some(content) = note.filter(|n| !n.trim().is_empty()) {
        lead.notes.push(LeadNote {
            content,
            created_at: now,
            created_by: Some(provider_id),
        });
    }

    lead.interactions.push(Interaction {
        kind: InteractionType::FollowUp,
        description: Some(format!("Status updated to {}", status)),
        timestamp: now,
    });
    lead.updated_at = now;
}

/// Scores a lead for display without persisting the result.
fn with_fresh_score(
    mut lead: Lead,
    assignee: Option<ProviderSummary>,
    scorer: &LeadScorer,
    now: DateTime<Utc>,
) -> ScoredLead {
    let score = scorer.score(&lead, now);
    lead.score = score.stored();
    ScoredLead {
        lead,
        category: score.category,
        assignee,
    }
}

fn intake_summary(lead: &Lead, category: ScoreCategory) -> Value {
    json!({
        "id": lead.id,
        "name": lead.name,
        "serviceType": lead.service_type,
        "score": lead.score,
        "category": category,
        "createdAt": lead.created_at,
    })
}

/// POST /api/leads
///
/// Public intake form. A repeat of the same submission within the duplicate
/// window answers with the lead already created instead of inserting another.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<LeadSubmission>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let submission = payload.validate()?;
    let fingerprint = submission_fingerprint(&submission);
    let store = LeadStore::new(state.db.clone());

    if let Some(existing_id) = state.recent_submissions.get(&fingerprint).await {
        if let Some(existing) = store.find(existing_id).await? {
            tracing::info!("Duplicate intake submission, returning lead {}", existing.id);
            let category = ScoreCategory::from_score(u8::try_from(existing.score).unwrap_or(0));
            return Ok((
                StatusCode::OK,
                Json(json!({
                    "message": "Lead already received",
                    "lead": intake_summary(&existing, category),
                })),
            ));
        }
    }

    let now = Utc::now();
    let mut lead = new_lead(submission, now);
    let score = state.scorer.score(&lead, now);
    lead.score = score.stored();

    store.insert(&lead).await?;
    state.recent_submissions.insert(fingerprint, lead.id).await;

    tracing::info!(
        "Created lead {} ({}) with score {} [{}]",
        lead.id,
        lead.service_type,
        score.score,
        score.category
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Lead created successfully",
            "lead": intake_summary(&lead, score.category),
        })),
    ))
}

/// GET /api/leads
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(_provider): AuthenticatedProvider,
    Query(params): Query<LeadListQuery>,
) -> Result<Json<Value>, AppError> {
    let query = LeadQuery::from_params(params)?;
    let (rows, total) = LeadStore::new(state.db.clone()).list(&query).await?;

    let now = Utc::now();
    let leads: Vec<ScoredLead> = rows
        .into_iter()
        .map(|(lead, assignee)| with_fresh_score(lead, assignee, &state.scorer, now))
        .collect();

    Ok(Json(json!({
        "leads": leads,
        "pagination": Pagination::new(query.page, query.limit, total),
    })))
}

/// GET /api/leads/:id
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(_provider): AuthenticatedProvider,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoredLead>, AppError> {
    let (lead, assignee) = LeadStore::new(state.db.clone())
        .find_with_assignee(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

    Ok(Json(with_fresh_score(lead, assignee, &state.scorer, Utc::now())))
}

/// PATCH /api/leads/:id/status
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(provider): AuthenticatedProvider,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let status = payload
        .status
        .as_deref()
        .and_then(|s| s.parse::<LeadStatus>().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid status".to_string()))?;

    let store = LeadStore::new(state.db.clone());
    let mut lead = store
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

    let now = Utc::now();
    apply_status_update(&mut lead, status, payload.notes, provider.id, now);
    let score = state.scorer.score(&lead, now);
    lead.score = score.stored();

    store.save_progress(&lead).await?;

    tracing::info!(
        "Provider {} moved lead {} to {} (score {})",
        provider.id,
        lead.id,
        status,
        score.score
    );

    let updated = ScoredLead {
        lead,
        category: score.category,
        assignee: None,
    };

    Ok(Json(json!({
        "message": "Lead status updated successfully",
        "lead": updated,
    })))
}

/// POST /api/leads/:id/interactions
pub async fn add_interaction(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(_provider): AuthenticatedProvider,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<InteractionRequest>,
) -> Result<Json<Value>, AppError> {
    let kind = payload
        .kind
        .as_deref()
        .and_then(|s| s.parse::<InteractionType>().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid interaction type".to_string()))?;

    let interaction = Interaction {
        kind,
        description: payload.description,
        timestamp: Utc::now(),
    };

    let found = LeadStore::new(state.db.clone())
        .append_interaction(id, &interaction)
        .await?;
    if !found {
        return Err(AppError::NotFound("Lead not found".to_string()));
    }

    Ok(Json(json!({
        "message": "Interaction added successfully",
        "interaction": interaction,
    })))
}

/// GET /api/leads/stats/overview
///
/// Score buckets here come from stored scores, not a fresh scoring pass.
pub async fn lead_stats(
    State(state): State<Arc<AppState>>,
    AuthenticatedProvider(_provider): AuthenticatedProvider,
) -> Result<Json<Value>, AppError> {
    let store = LeadStore::new(state.db.clone());

    let total_leads = store.count().await?;
    let today_leads = store.count_created_since(start_of_day(Utc::now())).await?;
    let status_breakdown = store.status_breakdown(None).await?;
    let score_breakdown = store.stored_score_breakdown().await?;

    Ok(Json(json!({
        "totalLeads": total_leads,
        "todayLeads": today_leads,
        "statusBreakdown": status_breakdown,
        "scoreBreakdown": score_breakdown,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> NewLead {
        NewLead {
            name: "Jane Doe".to_string(),
            email: "Jane@Example.com".to_string(),
            phone: "(555) 123-4567".to_string(),
            service_type: ServiceType::Plumbing,
            message: None,
            source: LeadSource::Website,
        }
    }

    #[test]
    fn test_fingerprint_ignores_phone_formatting_and_email_case() {
        let mut other = submission();
        other.email = "jane@example.com".to_string();
        other.phone = "555.123.4567".to_string();
        assert_eq!(submission_fingerprint(&submission()), submission_fingerprint(&other));
    }

    #[test]
    fn test_fingerprint_depends_on_service() {
        let mut other = submission();
        other.service_type = ServiceType::Roofing;
        assert_ne!(submission_fingerprint(&submission()), submission_fingerprint(&other));
    }

    #[test]
    fn test_fingerprint_depends_on_message_and_source() {
        let mut first = submission();
        first.message = Some("first request".to_string());
        let mut second = submission();
        second.message = Some("second request".to_string());
        assert_ne!(submission_fingerprint(&first), submission_fingerprint(&second));

        let mut referred = submission();
        referred.source = LeadSource::Referral;
        assert_ne!(submission_fingerprint(&submission()), submission_fingerprint(&referred));
    }

    #[test]
    fn test_new_lead_starts_pending() {
        let now = Utc::now();
        let lead = new_lead(submission(), now);
        assert_eq!(lead.status, LeadStatus::Pending);
        assert_eq!(lead.submission_time, now);
        assert!(lead.interactions.is_empty());
        assert!(!lead.appointment_booked);
    }

    #[test]
    fn test_status_update_records_first_response_only() {
        let provider = Uuid::new_v4();
        let first = Utc::now();
        let mut lead = new_lead(submission(), first);

        apply_status_update(&mut lead, LeadStatus::Contacted, Some("Called back".into()), provider, first);
        let later = first + chrono::Duration::hours(2);
        apply_status_update(&mut lead, LeadStatus::Contacted, None, provider, later);

        assert_eq!(lead.response_time, Some(first));
        assert_eq!(lead.notes.len(), 1);
        assert_eq!(lead.notes[0].created_by, Some(provider));
        assert_eq!(lead.interactions.len(), 2);
        assert_eq!(lead.interactions[0].kind, InteractionType::FollowUp);
        assert_eq!(
            lead.interactions[0].description.as_deref(),
            Some("Status updated to contacted")
        );
    }

    #[test]
    fn test_blank_note_is_skipped() {
        let mut lead = new_lead(submission(), Utc::now());
        apply_status_update(&mut lead, LeadStatus::Qualified, Some("   ".into()), Uuid::new_v4(), Utc::now());
        assert!(lead.notes.is_empty());
        assert!(lead.response_time.is_none());
    }
}
