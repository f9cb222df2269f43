//! Derived figures for the dashboard and the automation insights panel.

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::Serialize;

use crate::models::{Lead, LeadStatus};
use crate::scoring::{LeadScorer, ScoreCategory};

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Midnight UTC on the first day of the month containing `now`.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let day = now.date_naive();
    day.with_day(1).unwrap_or(day).and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    pub hot: u64,
    pub warm: u64,
    pub cold: u64,
}

impl ScoreDistribution {
    pub fn record(&mut self, category: ScoreCategory) {
        match category {
            ScoreCategory::Hot => self.hot += 1,
            ScoreCategory::Warm => self.warm += 1,
            ScoreCategory::Cold => self.cold += 1,
        }
    }
}

/// Categories of freshly scored leads. Nothing is persisted.
pub fn score_distribution(
    leads: &[Lead],
    scorer: &LeadScorer,
    now: DateTime<Utc>,
) -> ScoreDistribution {
    leads
        .iter()
        .fold(ScoreDistribution::default(), |mut dist, lead| {
            dist.record(scorer.score(lead, now).category);
            dist
        })
}

/// Pending leads that score hot right now.
pub fn count_hot_pending(leads: &[Lead], scorer: &LeadScorer, now: DateTime<Utc>) -> u64 {
    leads
        .iter()
        .filter(|lead| lead.status == LeadStatus::Pending)
        .filter(|lead| scorer.score(lead, now).category == ScoreCategory::Hot)
        .count() as u64
}

/// Percentage of converted leads, rounded to one decimal place.
pub fn conversion_rate(converted: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let rate = converted as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub hot_leads: u64,
    pub stale_leads: u64,
    pub follow_up_leads: u64,
    pub recommendations: Vec<String>,
}

impl Insights {
    pub fn new(hot_leads: u64, stale_leads: u64, follow_up_leads: u64) -> Self {
        let mut recommendations = Vec::new();
        if hot_leads > 0 {
            recommendations.push(format!(
                "You have {} hot leads that need immediate attention",
                hot_leads
            ));
        }
        if stale_leads > 0 {
            recommendations.push(format!(
                "{} leads haven't been contacted in 24+ hours",
                stale_leads
            ));
        }
        if follow_up_leads > 0 {
            recommendations.push(format!("{} leads are ready for follow-up", follow_up_leads));
        }

        Self {
            hot_leads,
            stale_leads,
            follow_up_leads,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_starts() {
        let now = Utc.with_ymd_and_hms(2024, 7, 19, 15, 42, 7).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2024, 7, 19, 0, 0, 0).unwrap());
        assert_eq!(start_of_month(now), Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_conversion_rate_rounding() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(1, 3), 33.3);
        assert_eq!(conversion_rate(2, 3), 66.7);
        assert_eq!(conversion_rate(5, 5), 100.0);
    }

    #[test]
    fn test_recommendations_skip_zero_counts() {
        let insights = Insights::new(2, 0, 1);
        assert_eq!(
            insights.recommendations,
            vec![
                "You have 2 hot leads that need immediate attention".to_string(),
                "1 leads are ready for follow-up".to_string(),
            ]
        );
        assert!(Insights::new(0, 0, 0).recommendations.is_empty());
    }

    #[test]
    fn test_distribution_records_each_category() {
        let mut dist = ScoreDistribution::default();
        dist.record(ScoreCategory::Hot);
        dist.record(ScoreCategory::Cold);
        dist.record(ScoreCategory::Cold);
        assert_eq!(dist, ScoreDistribution { hot: 1, warm: 0, cold: 2 });
    }
}
