//! Bulk rescoring of open leads, on demand or on a fixed interval.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::data::LeadStore;
use crate::errors::AppError;
use crate::models::Lead;
use crate::scoring::LeadScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescoreSummary {
    pub total_leads: usize,
    pub updated_leads: u64,
}

/// New scores for the leads whose score changed.
pub fn score_changes(leads: &[Lead], scorer: &LeadScorer, now: DateTime<Utc>) -> Vec<(Uuid, i16)> {
    leads
        .iter()
        .filter_map(|lead| {
            let fresh = scorer.score(lead, now).stored();
            (fresh != lead.score).then_some((lead.id, fresh))
        })
        .collect()
}

/// Rescores every lead that is not closed and persists the changed scores together.
pub async fn rescore_open_leads(
    store: &LeadStore,
    scorer: &LeadScorer,
    now: DateTime<Utc>,
) -> Result<RescoreSummary, AppError> {
    let leads = store.find_open().await?;
    let changes = score_changes(&leads, scorer, now);
    let updated_leads = store.update_scores(&changes).await?;

    tracing::info!(
        "Rescored {} open leads, {} changed",
        leads.len(),
        updated_leads
    );

    Ok(RescoreSummary {
        total_leads: leads.len(),
        updated_leads,
    })
}

/// Runs [`rescore_open_leads`] every `period` until the runtime shuts down.
pub fn spawn_scheduled(pool: PgPool, scorer: LeadScorer, period: Duration) {
    tokio::spawn(async move {
        let store = LeadStore::new(pool);
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = rescore_open_leads(&store, &scorer, Utc::now()).await {
                tracing::error!("Scheduled rescoring failed: {}", e);
            }
        }
    });
}
