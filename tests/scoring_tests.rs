/// Worked scoring examples, end to end through the public engine.
use chrono::{DateTime, Duration, TimeZone, Utc};
use leadflow_api::models::{LeadSource, LeadStatus, ServiceType};
use leadflow_api::scoring::{score_lead, BehaviorSignals, LeadScorer, ScoreCategory, ScoringInput};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn thirty_words() -> String {
    vec!["leak"; 30].join(" ")
}

fn hvac_booking<'a>(message: &'a str, email: &'a str) -> ScoringInput<'a> {
    ScoringInput {
        message: Some(message),
        service_type: ServiceType::Hvac,
        source: LeadSource::Google,
        appointment_booked: true,
        created_at: now(),
        status: LeadStatus::Pending,
        email,
        phone: Some("(555) 123-4567"),
    }
}

#[test]
fn detailed_booked_hvac_request_is_warm() {
    let message = thirty_words();
    let result = score_lead(
        &hvac_booking(&message, "jane@example.com"),
        BehaviorSignals::NONE,
        now(),
    );
    assert_eq!(result.score, 5);
    assert_eq!(result.category, ScoreCategory::Warm);
}

#[test]
fn malformed_email_drops_a_point() {
    let message = thirty_words();
    let result = score_lead(
        &hvac_booking(&message, "jane.example.com"),
        BehaviorSignals::NONE,
        now(),
    );
    assert_eq!(result.score, 4);
    assert_eq!(result.category, ScoreCategory::Cold);
}

#[test]
fn stale_low_value_lead_clamps_to_zero() {
    let input = ScoringInput {
        message: None,
        service_type: ServiceType::Other,
        source: LeadSource::Facebook,
        appointment_booked: false,
        created_at: now() - Duration::days(5),
        status: LeadStatus::Pending,
        email: "jane@example.com",
        phone: Some("(555) 123-4567"),
    };
    let result = score_lead(&input, BehaviorSignals::NONE, now());
    assert_eq!(result.score, 0);
    assert_eq!(result.category, ScoreCategory::Cold);
}

#[test]
fn every_positive_signal_reaches_the_cap() {
    let message = thirty_words();
    let input = ScoringInput {
        message: Some(&message),
        service_type: ServiceType::Plumbing,
        source: LeadSource::Referral,
        appointment_booked: true,
        created_at: now(),
        status: LeadStatus::Pending,
        email: "jane@example.com",
        phone: Some("(555) 123-4567"),
    };
    let result = score_lead(&input, BehaviorSignals::ALL, now());
    assert_eq!(result.score, 10);
    assert_eq!(result.category, ScoreCategory::Hot);
}

#[test]
fn fixed_scorer_is_idempotent() {
    let scorer = LeadScorer::fixed(BehaviorSignals::NONE);
    let message = thirty_words();
    let input = hvac_booking(&message, "jane@example.com");
    let first = scorer.score_input(&input, now());
    let second = scorer.score_input(&input, now());
    assert_eq!(first, second);
}

#[test]
fn simulated_scorer_stays_in_range() {
    let scorer = LeadScorer::simulated();
    let message = thirty_words();
    let input = hvac_booking(&message, "jane@example.com");
    for _ in 0..200 {
        let result = scorer.score_input(&input, now());
        // Base is 5; the behavioural signals can add up to 4 more.
        assert!((5..=9).contains(&result.score));
    }
}
