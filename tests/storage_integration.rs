use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use std::env;
use std::sync::Arc;
use uuid::Uuid;

use leadflow_api::auth::AuthenticatedProvider;
use leadflow_api::config::Config;
use leadflow_api::data::{AccountStore, AppointmentStore, LeadStore};
use leadflow_api::db::Database;
use leadflow_api::handlers::{AppState, JsonBody};
use leadflow_api::lead_handler::{create_lead, get_lead, new_lead};
use leadflow_api::models::*;
use leadflow_api::rescoring::rescore_open_leads;
use leadflow_api::scoring::{BehaviorSignals, LeadScorer};

async fn database() -> anyhow::Result<Database> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;
    Database::new(&db_url, 2).await
}

fn state(db: &Database) -> Arc<AppState> {
    let config = Config {
        database_url: String::new(),
        port: 0,
        db_max_connections: 2,
        jwt_secret: "storage-test-secret-that-is-long-enough".to_string(),
        jwt_ttl_days: 7,
        static_dir: "public".to_string(),
        simulated_signals: false,
        rescore_interval_secs: None,
    };
    Arc::new(AppState::new(db.pool.clone(), config))
}

fn new_provider(email: String) -> NewProvider {
    NewProvider {
        business_name: "Smoke HVAC".to_string(),
        owner_name: "Pat Jones".to_string(),
        email,
        password: "unused".to_string(),
        phone: "(555) 000-1111".to_string(),
        service_types: vec![ServiceType::Hvac],
    }
}

/// A score the fixed scorer would not produce for `lead` at `now`.
fn stale_score(lead: &Lead, scorer: &LeadScorer, now: chrono::DateTime<Utc>) -> i16 {
    (scorer.score(lead, now).stored() + 5) % 11
}

fn submission(email: String) -> NewLead {
    NewLead {
        name: "Storage Smoke".to_string(),
        email,
        phone: "(555) 123-4567".to_string(),
        service_type: ServiceType::Hvac,
        message: None,
        source: LeadSource::Referral,
    }
}

/// Booking flow against a real database: lead, provider, appointment, completion.
/// Marked ignored so it only runs when TEST_DATABASE_URL points at a scratch database.
#[tokio::test]
#[ignore]
async fn booking_flow_smoke_test() -> anyhow::Result<()> {
    let db = database().await?;
    let leads = LeadStore::new(db.pool.clone());
    let accounts = AccountStore::new(db.pool.clone());
    let appointments = AppointmentStore::new(db.pool.clone());

    // Unique emails so repeated runs do not collide.
    let tag = Uuid::new_v4().simple().to_string();

    let lead = new_lead(submission(format!("lead-{}@example.com", tag)), Utc::now());
    leads.insert(&lead).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let provider = accounts
        .insert_provider(
            &new_provider(format!("provider-{}@example.com", tag)),
            "not-a-real-hash",
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let scheduled = Utc::now() + Duration::days(1);
    let view = appointments
        .create(
            provider.id,
            &NewAppointment {
                lead_id: lead.id,
                scheduled_date: scheduled,
                duration: 60,
                service_type: "hvac".to_string(),
                location: Location {
                    address: "1 Main St".to_string(),
                    city: "Springfield".to_string(),
                    state: "IL".to_string(),
                    zip_code: "62701".to_string(),
                    coordinates: None,
                },
                notes: None,
                estimated_cost: Some(250.0),
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    assert_eq!(view.appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(view.lead.as_ref().map(|l| l.id), Some(lead.id));

    let booked = leads
        .find(lead.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("lead missing after booking"))?;
    assert_eq!(booked.status, LeadStatus::Qualified);
    assert!(booked.appointment_booked);
    assert_eq!(booked.assigned_to, Some(provider.id));

    let completed = appointments
        .update_status(
            provider.id,
            view.appointment.id,
            AppointmentStatus::Completed,
            Some("Replaced filter"),
            Some(310.0),
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("appointment missing"))?;
    assert_eq!(completed.actual_cost, Some(310.0));

    let converted = leads
        .find(lead.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("lead missing after completion"))?;
    assert_eq!(converted.status, LeadStatus::Converted);

    let scorer = LeadScorer::fixed(BehaviorSignals::NONE);
    let summary = rescore_open_leads(&leads, &scorer, Utc::now())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(summary.total_leads >= 1);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn rescoring_skips_closed_leads() -> anyhow::Result<()> {
    let db = database().await?;
    let leads = LeadStore::new(db.pool.clone());
    let scorer = LeadScorer::fixed(BehaviorSignals::NONE);
    let now = Utc::now();
    let tag = Uuid::new_v4().simple().to_string();

    let mut closed = new_lead(submission(format!("closed-{}@example.com", tag)), now);
    closed.status = LeadStatus::Closed;
    closed.score = stale_score(&closed, &scorer, now);
    leads.insert(&closed).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut open = new_lead(submission(format!("open-{}@example.com", tag)), now);
    open.status = LeadStatus::Contacted;
    let fresh = scorer.score(&open, now).stored();
    open.score = stale_score(&open, &scorer, now);
    leads.insert(&open).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    rescore_open_leads(&leads, &scorer, now)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let closed_after = leads
        .find(closed.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("closed lead missing"))?;
    assert_eq!(closed_after.score, closed.score);

    let open_after = leads
        .find(open.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("open lead missing"))?;
    assert_eq!(open_after.score, fresh);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn reading_a_lead_does_not_persist_its_fresh_score() -> anyhow::Result<()> {
    let db = database().await?;
    let state = state(&db);
    let leads = LeadStore::new(db.pool.clone());
    let tag = Uuid::new_v4().simple().to_string();

    let now = Utc::now();
    let mut lead = new_lead(submission(format!("read-{}@example.com", tag)), now);
    lead.score = stale_score(&lead, &state.scorer, now);
    leads.insert(&lead).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let provider = AccountStore::new(db.pool.clone())
        .insert_provider(
            &new_provider(format!("reader-{}@example.com", tag)),
            "not-a-real-hash",
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let shown = get_lead(
        State(state.clone()),
        AuthenticatedProvider(provider),
        Path(lead.id),
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_ne!(shown.0.lead.score, lead.score);

    let stored = leads
        .find(lead.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("lead missing after read"))?;
    assert_eq!(stored.score, lead.score);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn distinct_intake_requests_from_one_contact_are_all_kept() -> anyhow::Result<()> {
    let db = database().await?;
    let state = state(&db);
    let email = format!("repeat-{}@example.com", Uuid::new_v4().simple());

    let form = |message: &str, source: &str| LeadSubmission {
        name: Some("Jane Doe".to_string()),
        email: Some(email.clone()),
        phone: Some("(555) 123-4567".to_string()),
        service_type: Some("plumbing".to_string()),
        message: Some(message.to_string()),
        source: Some(source.to_string()),
    };

    let mut statuses = Vec::new();
    for (message, source) in [
        ("first request", "website"),
        ("second request", "referral"),
        ("second request", "referral"),
    ] {
        let (status, _) = create_lead(State(state.clone()), JsonBody(form(message, source)))
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        statuses.push(status);
    }
    assert_eq!(
        statuses,
        vec![StatusCode::CREATED, StatusCode::CREATED, StatusCode::OK]
    );

    let mut messages: Vec<Option<String>> =
        sqlx::query_scalar("SELECT message FROM leads WHERE email = $1")
            .bind(&email)
            .fetch_all(&db.pool)
            .await?;
    messages.sort();
    assert_eq!(
        messages,
        vec![
            Some("first request".to_string()),
            Some("second request".to_string())
        ]
    );

    Ok(())
}
