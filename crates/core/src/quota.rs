use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// The single persisted ingestion-quota record.
///
/// Transition rule: the hourly count resets whenever the stored hour-of-day
/// differs from the current one, and the daily count resets whenever the
/// stored date differs from today. Bucket comparisons are made in UTC;
/// behavior across DST transitions and across multiple worker instances is
/// intentionally unspecified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaState {
    pub date: NaiveDate,
    pub hour: u32,
    pub daily_count: u32,
    pub hourly_count: u32,
    pub last_fetch_at: Option<DateTime<Utc>>,
}

impl QuotaState {
    /// A zeroed record for the bucket containing `now`.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            date: now.date_naive(),
            hour: now.hour(),
            daily_count: 0,
            hourly_count: 0,
            last_fetch_at: None,
        }
    }

    /// Apply the bucket transition rule, returning the state as it stands at
    /// `now`. Counts carry over only within an unchanged bucket.
    pub fn rolled_to(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if next.date != now.date_naive() {
            next.date = now.date_naive();
            next.daily_count = 0;
            next.hour = now.hour();
            next.hourly_count = 0;
        } else if next.hour != now.hour() {
            next.hour = now.hour();
            next.hourly_count = 0;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn same_bucket_carries_counts() {
        let now = at(2025, 3, 10, 14, 5);
        let mut state = QuotaState::empty(now);
        state.daily_count = 12;
        state.hourly_count = 3;

        let rolled = state.rolled_to(at(2025, 3, 10, 14, 55));
        assert_eq!(rolled.daily_count, 12);
        assert_eq!(rolled.hourly_count, 3);
    }

    #[test]
    fn hour_change_resets_hourly_only() {
        let mut state = QuotaState::empty(at(2025, 3, 10, 14, 5));
        state.daily_count = 12;
        state.hourly_count = 3;

        let rolled = state.rolled_to(at(2025, 3, 10, 15, 0));
        assert_eq!(rolled.daily_count, 12);
        assert_eq!(rolled.hourly_count, 0);
        assert_eq!(rolled.hour, 15);
    }

    #[test]
    fn date_change_resets_both() {
        let mut state = QuotaState::empty(at(2025, 3, 10, 23, 59));
        state.daily_count = 280;
        state.hourly_count = 9;

        let rolled = state.rolled_to(at(2025, 3, 11, 0, 1));
        assert_eq!(rolled.daily_count, 0);
        assert_eq!(rolled.hourly_count, 0);
        assert_eq!(rolled.date, NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
    }
}
