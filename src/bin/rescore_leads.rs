//! One-shot bulk rescoring of every lead that is not closed, for cron use.

use chrono::Utc;
use dotenvy::dotenv;
use leadflow_api::config::parse_bool_var;
use leadflow_api::data::LeadStore;
use leadflow_api::rescoring::rescore_open_leads;
use leadflow_api::scoring::{BehaviorSignals, LeadScorer};
use sqlx::postgres::PgPoolOptions;
use std::env;

/// Connects to the database, rescores open leads and reports how many changed.
///
/// Reads `DATABASE_URL` (or `DB_URL`) and `SIMULATED_SIGNALS`; no JWT secret is needed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    leadflow_api::obs::init_tracing();

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL or DB_URL must be set"))?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let scorer = if parse_bool_var("SIMULATED_SIGNALS", true)? {
        LeadScorer::simulated()
    } else {
        LeadScorer::fixed(BehaviorSignals::NONE)
    };

    tracing::info!("Connected to database. Rescoring open leads...");

    let summary = rescore_open_leads(&LeadStore::new(pool), &scorer, Utc::now()).await?;

    tracing::info!(
        "Rescoring complete. {} of {} open leads changed score.",
        summary.updated_leads,
        summary.total_leads
    );

    Ok(())
}
