//! Day/hour ingestion quota gate.
//!
//! The persisted [`QuotaState`] record is the whole state machine; this
//! module applies its bucket-reset rule against the caller-supplied clock so
//! tests stay deterministic.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use clipforge_core::config::QuotaConfig;
use clipforge_core::QuotaState;
use clipforge_store::{Store, StoreError};

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub remaining_daily: u32,
    pub remaining_hourly: u32,
    /// True only when both remainders are positive.
    pub allowed: bool,
}

pub struct Throttle {
    store: Arc<dyn Store>,
    limits: QuotaConfig,
}

impl Throttle {
    pub fn new(store: Arc<dyn Store>, limits: QuotaConfig) -> Self {
        Self { store, limits }
    }

    async fn current_state(&self, now: DateTime<Utc>) -> Result<QuotaState, StoreError> {
        let state = self
            .store
            .quota_state()
            .await?
            .unwrap_or_else(|| QuotaState::empty(now));
        Ok(state.rolled_to(now))
    }

    /// How many more items may be admitted in the buckets containing `now`.
    pub async fn can_admit(&self, now: DateTime<Utc>) -> Result<Admission, StoreError> {
        let state = self.current_state(now).await?;
        let remaining_daily = self.limits.daily_limit.saturating_sub(state.daily_count);
        let remaining_hourly = self.limits.hourly_limit.saturating_sub(state.hourly_count);
        Ok(Admission {
            remaining_daily,
            remaining_hourly,
            allowed: remaining_daily > 0 && remaining_hourly > 0,
        })
    }

    /// Count `n` admitted items against both buckets and stamp the fetch time.
    pub async fn record_admitted(&self, n: u32, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.current_state(now).await?;
        state.daily_count += n;
        state.hourly_count += n;
        state.last_fetch_at = Some(now);
        self.store.put_quota_state(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clipforge_store::MemoryStore;

    fn limits() -> QuotaConfig {
        QuotaConfig {
            daily_limit: 300,
            hourly_limit: 30,
            per_run_cap: 10,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn fresh_state_allows_full_limits() {
        let throttle = Throttle::new(Arc::new(MemoryStore::new()), limits());
        let admission = throttle.can_admit(at(10, 0)).await.unwrap();
        assert_eq!(admission.remaining_daily, 300);
        assert_eq!(admission.remaining_hourly, 30);
        assert!(admission.allowed);
    }

    #[tokio::test]
    async fn record_admitted_decrements_by_exactly_n() {
        let throttle = Throttle::new(Arc::new(MemoryStore::new()), limits());
        let now = at(10, 0);
        throttle.record_admitted(7, now).await.unwrap();

        let admission = throttle.can_admit(now).await.unwrap();
        assert_eq!(admission.remaining_hourly, 30 - 7);
        assert_eq!(admission.remaining_daily, 300 - 7);
    }

    #[tokio::test]
    async fn hourly_resets_when_hour_advances() {
        let throttle = Throttle::new(Arc::new(MemoryStore::new()), limits());
        throttle.record_admitted(30, at(10, 10)).await.unwrap();
        assert!(!throttle.can_admit(at(10, 59)).await.unwrap().allowed);

        // The moment the wall-clock hour advances the hourly bucket is full again.
        let admission = throttle.can_admit(at(11, 0)).await.unwrap();
        assert_eq!(admission.remaining_hourly, 30);
        assert_eq!(admission.remaining_daily, 300 - 30);
        assert!(admission.allowed);
    }

    #[tokio::test]
    async fn daily_exhaustion_blocks_across_hours() {
        let store = Arc::new(MemoryStore::new());
        let throttle = Throttle::new(store.clone(), limits());
        // Pre-seed a state one short of the daily limit.
        let mut state = QuotaState::empty(at(9, 0));
        state.daily_count = 299;
        store.put_quota_state(state).await.unwrap();

        let admission = throttle.can_admit(at(9, 30)).await.unwrap();
        assert_eq!(admission.remaining_daily, 1);
        assert!(admission.allowed);

        throttle.record_admitted(1, at(9, 30)).await.unwrap();
        let admission = throttle.can_admit(at(10, 5)).await.unwrap();
        assert_eq!(admission.remaining_daily, 0);
        assert!(!admission.allowed, "hourly reset must not revive a spent day");
    }

    #[tokio::test]
    async fn record_stamps_last_fetch_time() {
        let store = Arc::new(MemoryStore::new());
        let throttle = Throttle::new(store.clone(), limits());
        let now = at(12, 34);
        throttle.record_admitted(1, now).await.unwrap();
        let state = store.quota_state().await.unwrap().unwrap();
        assert_eq!(state.last_fetch_at, Some(now));
    }
}
