//! Hourly booking slots for a provider's working day.

use chrono::{DateTime, NaiveDate, SecondsFormat, Timelike, Utc};
use serde::Serialize;

/// Working hours offered as one-hour slots, in UTC. The last slot starts at 16:00.
pub const WORKING_HOURS: std::ops::RangeInclusive<u32> = 9..=16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    /// Slot start as an ISO-8601 UTC timestamp with milliseconds.
    pub time: String,
    /// 12-hour clock label, e.g. `9:00 AM` or `1:00 PM`.
    pub display: String,
}

pub fn slot_label(hour: u32) -> String {
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let clock = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{}:00 {}", clock, suffix)
}

/// Free slots on `day` given the start times of appointments that still hold one.
///
/// An appointment blocks the slot whose hour it starts in.
pub fn available_slots(day: NaiveDate, booked: &[DateTime<Utc>]) -> Vec<Slot> {
    WORKING_HOURS
        .filter(|hour| {
            !booked
                .iter()
                .any(|at| at.date_naive() == day && at.hour() == *hour)
        })
        .filter_map(|hour| {
            let start = day.and_hms_opt(hour, 0, 0)?.and_utc();
            Some(Slot {
                time: start.to_rfc3339_opts(SecondsFormat::Millis, true),
                display: slot_label(hour),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
    }

    #[test]
    fn test_slot_labels() {
        assert_eq!(slot_label(9), "9:00 AM");
        assert_eq!(slot_label(11), "11:00 AM");
        assert_eq!(slot_label(12), "12:00 PM");
        assert_eq!(slot_label(13), "1:00 PM");
        assert_eq!(slot_label(16), "4:00 PM");
    }

    #[test]
    fn test_empty_day_offers_eight_slots() {
        let slots = available_slots(day(), &[]);
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0].time, "2024-05-14T09:00:00.000Z");
        assert_eq!(slots[0].display, "9:00 AM");
        assert_eq!(slots[7].display, "4:00 PM");
    }

    #[test]
    fn test_booking_blocks_its_start_hour() {
        let booked = vec![
            Utc.with_ymd_and_hms(2024, 5, 14, 10, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 14, 13, 0, 0).unwrap(),
        ];
        let slots = available_slots(day(), &booked);
        let labels: Vec<&str> = slots.iter().map(|s| s.display.as_str()).collect();
        assert_eq!(
            labels,
            vec!["9:00 AM", "11:00 AM", "12:00 PM", "2:00 PM", "3:00 PM", "4:00 PM"]
        );
    }

    #[test]
    fn test_booking_on_another_day_is_ignored() {
        let booked = vec![Utc.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap()];
        assert_eq!(available_slots(day(), &booked).len(), 8);
    }
}
