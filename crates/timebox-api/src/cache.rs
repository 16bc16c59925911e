//! Short-lived cache for analytics responses.

use chrono::NaiveDate;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use timebox_core::analytics::AnalyticsStats;

pub const STATS_TTL: Duration = Duration::from_secs(5);

const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(v) => v,
    None => unreachable!(),
};

/// Analytics results keyed by period and date range, each kept for a few seconds
pub struct StatsCache {
    entries: Mutex<LruCache<String, (Instant, AnalyticsStats)>>,
    ttl: Duration,
}

impl StatsCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(DEFAULT_CACHE_SIZE)),
            ttl,
        }
    }

    /// `days:start:end`, so a new day never reuses yesterday's numbers
    #[must_use]
    pub fn key(days: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!("{days}:{start}:{end}")
    }

    pub async fn get(&self, key: &str) -> Option<AnalyticsStats> {
        let mut entries = self.entries.lock().await;
        let fresh = entries
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, stats)| stats.clone());
        if fresh.is_none() {
            entries.pop(key);
        }
        fresh
    }

    pub async fn put(&self, stats: AnalyticsStats) {
        self.entries
            .lock()
            .await
            .put(
                Self::key(&stats.period, stats.start_date, stats.end_date),
                (Instant::now(), stats),
            );
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(STATS_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timebox_core::analytics::PeriodTotals;

    fn stats() -> AnalyticsStats {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        AnalyticsStats {
            period: "7".into(),
            start_date: day,
            end_date: day,
            totals: PeriodTotals {
                sessions: 2,
                minutes: 50,
                hours: 0.8,
                avg_focus: 4.0,
                avg_session_length: 25.0,
            },
            daily: Vec::new(),
            categories: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = StatsCache::default();
        cache.put(stats()).await;
        let hit = cache.get("7:2024-03-10:2024-03-10").await.unwrap();
        assert_eq!(hit.totals.sessions, 2);
        assert!(cache.get("30:2024-03-10:2024-03-10").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache = StatsCache::new(Duration::ZERO);
        cache.put(stats()).await;
        assert!(cache.get("7:2024-03-10:2024-03-10").await.is_none());
    }
}
