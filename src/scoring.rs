//! Lead scoring engine.
//!
//! Scores a lead snapshot on an additive 0-10 scale and buckets the result into
//! hot / warm / cold. The engine never touches storage: callers decide whether the
//! returned [`LeadScore`] is written back (intake, status updates, rescoring pass)
//! or only reported (listings, dashboard, insights).
//!
//! | Signal                                   | Points |
//! |------------------------------------------|--------|
//! | Submitted quickly (behavioural)          | +3     |
//! | Message longer than 20 words             | +2     |
//! | High-value service                       | +2     |
//! | Referral or Instagram source             | +1     |
//! | Appointment booked                       | +1     |
//! | Opened follow-up (behavioural)           | +1     |
//! | Pending and older than 3 days            | -2     |
//! | Malformed email or phone                 | -1     |
//!
//! The sum is clamped to `[0, 10]` once, after every term has been applied.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::models::{Lead, LeadSource, LeadStatus, ServiceType};
use crate::validation::{is_valid_phone, is_well_formed_email};

pub const MAX_SCORE: u8 = 10;
pub const HOT_THRESHOLD: u8 = 8;
pub const WARM_THRESHOLD: u8 = 5;

/// A message needs strictly more words than this to count as detailed.
pub const DETAILED_MESSAGE_WORDS: usize = 20;
/// Pending leads older than this lose points.
pub const STALE_AFTER_DAYS: i64 = 3;

pub const FAST_SUBMISSION_PROBABILITY: f64 = 0.30;
pub const FOLLOW_UP_PROBABILITY: f64 = 0.40;

const FAST_SUBMISSION_POINTS: i32 = 3;
const DETAILED_MESSAGE_POINTS: i32 = 2;
const HIGH_VALUE_SERVICE_POINTS: i32 = 2;
const HIGH_INTENT_SOURCE_POINTS: i32 = 1;
const BOOKED_POINTS: i32 = 1;
const FOLLOW_UP_POINTS: i32 = 1;
const STALE_PENALTY: i32 = 2;
const BAD_CONTACT_PENALTY: i32 = 1;

/// Coarse bucket derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Hot,
    Warm,
    Cold,
}

impl ScoreCategory {
    /// Highest threshold wins: 8-10 hot, 5-7 warm, everything else cold.
    pub fn from_score(score: u8) -> Self {
        if score >= HOT_THRESHOLD {
            ScoreCategory::Hot
        } else if score >= WARM_THRESHOLD {
            ScoreCategory::Warm
        } else {
            ScoreCategory::Cold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreCategory::Hot => "hot",
            ScoreCategory::Warm => "warm",
            ScoreCategory::Cold => "cold",
        }
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour the stored lead record does not capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorSignals {
    /// Form submitted within 60 seconds of being opened.
    pub submitted_quickly: bool,
    /// Lead opened a follow-up message.
    pub opened_follow_up: bool,
}

impl BehaviorSignals {
    pub const NONE: BehaviorSignals = BehaviorSignals {
        submitted_quickly: false,
        opened_follow_up: false,
    };

    pub const ALL: BehaviorSignals = BehaviorSignals {
        submitted_quickly: true,
        opened_follow_up: true,
    };
}

/// Supplies behavioural signals for one scoring call.
pub trait SignalSource: Send + Sync {
    fn draw(&self) -> BehaviorSignals;
}

/// Draws both signals at random (30% fast submission, 40% follow-up opened).
///
/// Every draw uses the calling thread's generator, so concurrent scoring never
/// shares random state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSignals;

impl SignalSource for SimulatedSignals {
    fn draw(&self) -> BehaviorSignals {
        let mut rng = rand::rng();
        BehaviorSignals {
            submitted_quickly: rng.random_bool(FAST_SUBMISSION_PROBABILITY),
            opened_follow_up: rng.random_bool(FOLLOW_UP_PROBABILITY),
        }
    }
}

/// Always returns the same signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSignals(pub BehaviorSignals);

impl SignalSource for FixedSignals {
    fn draw(&self) -> BehaviorSignals {
        self.0
    }
}

/// The lead attributes the engine reads.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub message: Option<&'a str>,
    pub service_type: ServiceType,
    pub source: LeadSource,
    pub appointment_booked: bool,
    pub created_at: DateTime<Utc>,
    pub status: LeadStatus,
    pub email: &'a str,
    pub phone: Option<&'a str>,
}

impl Lead {
    pub fn scoring_input(&self) -> ScoringInput<'_> {
        ScoringInput {
            message: self.message.as_deref(),
            service_type: self.service_type,
            source: self.source,
            appointment_booked: self.appointment_booked,
            created_at: self.created_at,
            status: self.status,
            email: &self.email,
            phone: Some(&self.phone),
        }
    }
}

/// Engine output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadScore {
    pub score: u8,
    pub category: ScoreCategory,
}

impl LeadScore {
    pub fn from_score(score: u8) -> Self {
        let score = score.min(MAX_SCORE);
        Self {
            score,
            category: ScoreCategory::from_score(score),
        }
    }

    /// Score in the width of the persisted column.
    pub fn stored(&self) -> i16 {
        i16::from(self.score)
    }
}

/// Plumbing, electrical, HVAC and renovation jobs carry the most revenue.
pub fn is_high_value_service(service_type: ServiceType) -> bool {
    matches!(
        service_type,
        ServiceType::Plumbing | ServiceType::Electrical | ServiceType::Hvac | ServiceType::Renovation
    )
}

pub fn is_high_intent_source(source: LeadSource) -> bool {
    matches!(source, LeadSource::Referral | LeadSource::Instagram)
}

pub fn is_detailed_message(message: Option<&str>) -> bool {
    message.is_some_and(|m| m.split_whitespace().count() > DETAILED_MESSAGE_WORDS)
}

/// Pending for longer than [`STALE_AFTER_DAYS`] without anyone answering.
pub fn is_stale(created_at: DateTime<Utc>, status: LeadStatus, now: DateTime<Utc>) -> bool {
    status == LeadStatus::Pending && created_at < now - Duration::days(STALE_AFTER_DAYS)
}

/// True when either the email or the phone fails its shape check.
pub fn has_bad_contact_info(email: &str, phone: Option<&str>) -> bool {
    !is_well_formed_email(email) || !phone.is_some_and(is_valid_phone)
}

/// Scores one lead snapshot.
pub fn score_lead(
    input: &ScoringInput<'_>,
    signals: BehaviorSignals,
    now: DateTime<Utc>,
) -> LeadScore {
    let mut total: i32 = 0;

    if signals.submitted_quickly {
        total += FAST_SUBMISSION_POINTS;
    }
    if is_detailed_message(input.message) {
        total += DETAILED_MESSAGE_POINTS;
    }
    if is_high_value_service(input.service_type) {
        total += HIGH_VALUE_SERVICE_POINTS;
    }
    if is_high_intent_source(input.source) {
        total += HIGH_INTENT_SOURCE_POINTS;
    }
    if input.appointment_booked {
        total += BOOKED_POINTS;
    }
    if signals.opened_follow_up {
        total += FOLLOW_UP_POINTS;
    }
    if is_stale(input.created_at, input.status, now) {
        total -= STALE_PENALTY;
    }
    if has_bad_contact_info(input.email, input.phone) {
        total -= BAD_CONTACT_PENALTY;
    }

    let clamped = total.clamp(0, i32::from(MAX_SCORE));
    LeadScore::from_score(u8::try_from(clamped).unwrap_or(0))
}

/// Scores leads with signals drawn from an injected source.
#[derive(Clone)]
pub struct LeadScorer {
    signals: Arc<dyn SignalSource>,
}

impl LeadScorer {
    pub fn new(signals: Arc<dyn SignalSource>) -> Self {
        Self { signals }
    }

    pub fn simulated() -> Self {
        Self::new(Arc::new(SimulatedSignals))
    }

    pub fn fixed(signals: BehaviorSignals) -> Self {
        Self::new(Arc::new(FixedSignals(signals)))
    }

    pub fn score(&self, lead: &Lead, now: DateTime<Utc>) -> LeadScore {
        self.score_input(&lead.scoring_input(), now)
    }

    pub fn score_input(&self, input: &ScoringInput<'_>, now: DateTime<Utc>) -> LeadScore {
        score_lead(input, self.signals.draw(), now)
    }
}

impl fmt::Debug for LeadScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeadScorer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(now: DateTime<Utc>) -> ScoringInput<'static> {
        ScoringInput {
            message: None,
            service_type: ServiceType::Other,
            source: LeadSource::Website,
            appointment_booked: false,
            created_at: now,
            status: LeadStatus::Pending,
            email: "jane@example.com",
            phone: Some("(555) 123-4567"),
        }
    }

    #[test]
    fn test_category_thresholds() {
        for score in 0..=4 {
            assert_eq!(ScoreCategory::from_score(score), ScoreCategory::Cold);
        }
        for score in 5..=7 {
            assert_eq!(ScoreCategory::from_score(score), ScoreCategory::Warm);
        }
        for score in 8..=10 {
            assert_eq!(ScoreCategory::from_score(score), ScoreCategory::Hot);
        }
    }

    #[test]
    fn test_message_needs_more_than_twenty_words() {
        let twenty = vec!["word"; 20].join(" ");
        let twenty_one = vec!["word"; 21].join(" ");
        assert!(!is_detailed_message(Some(&twenty)));
        assert!(is_detailed_message(Some(&twenty_one)));
        assert!(!is_detailed_message(None));
    }

    #[test]
    fn test_repeated_spaces_do_not_inflate_word_count() {
        let padded = vec!["word"; 20].join("    ");
        assert!(!is_detailed_message(Some(&padded)));
    }

    #[test]
    fn test_stale_boundary_is_strict() {
        let now = Utc::now();
        let exactly = now - Duration::days(STALE_AFTER_DAYS);
        assert!(!is_stale(exactly, LeadStatus::Pending, now));
        assert!(is_stale(
            exactly - Duration::seconds(1),
            LeadStatus::Pending,
            now
        ));
        assert!(!is_stale(
            exactly - Duration::days(10),
            LeadStatus::Contacted,
            now
        ));
    }

    #[test]
    fn test_missing_phone_is_bad_contact() {
        assert!(has_bad_contact_info("jane@example.com", None));
        assert!(has_bad_contact_info("jane@example.com", Some("12345")));
        assert!(!has_bad_contact_info("jane@example.com", Some("555.123.4567")));
    }

    #[test]
    fn test_penalties_clamp_at_zero() {
        let now = Utc::now();
        let mut lead = input(now);
        lead.created_at = now - Duration::days(5);
        lead.email = "not-an-email";

        let result = score_lead(&lead, BehaviorSignals::NONE, now);
        assert_eq!(result.score, 0);
        assert_eq!(result.category, ScoreCategory::Cold);
    }

    #[test]
    fn test_signals_add_points() {
        let now = Utc::now();
        let lead = input(now);

        assert_eq!(score_lead(&lead, BehaviorSignals::NONE, now).score, 0);
        assert_eq!(score_lead(&lead, BehaviorSignals::ALL, now).score, 4);
        let quick_only = BehaviorSignals {
            submitted_quickly: true,
            opened_follow_up: false,
        };
        assert_eq!(score_lead(&lead, quick_only, now).score, 3);
    }

    #[test]
    fn test_fixed_scorer_is_idempotent() {
        let now = Utc::now();
        let scorer = LeadScorer::fixed(BehaviorSignals::ALL);
        let lead = input(now);

        let first = scorer.score_input(&lead, now);
        for _ in 0..10 {
            assert_eq!(scorer.score_input(&lead, now), first);
        }
    }

    #[test]
    fn test_simulated_scores_stay_in_range() {
        let now = Utc::now();
        let scorer = LeadScorer::simulated();
        let mut lead = input(now);
        lead.service_type = ServiceType::Hvac;
        lead.source = LeadSource::Referral;
        lead.appointment_booked = true;

        for _ in 0..200 {
            let result = scorer.score_input(&lead, now);
            // Base is 4 here; the random terms can add at most 4 more.
            assert!((4..=8).contains(&result.score));
        }
    }
}
