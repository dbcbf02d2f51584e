use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::{HistorySummary, VitalMetric};

/// Identifies one history request. Windows must match exactly for a hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    patient_id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    metrics: Vec<VitalMetric>,
}

impl HistoryKey {
    pub fn new(
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metrics: &[VitalMetric],
    ) -> Self {
        let mut metrics = metrics.to_vec();
        metrics.sort();
        metrics.dedup();

        Self {
            patient_id: patient_id.to_string(),
            start,
            end,
            metrics,
        }
    }
}

/// Time-bounded cache of history summaries, shared across requests.
pub struct HistoryCache {
    entries: DashMap<HistoryKey, (Instant, Vec<HistorySummary>)>,
    ttl: Duration,
}

impl HistoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &HistoryKey) -> Option<Vec<HistorySummary>> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.0.elapsed() < self.ttl => return Some(entry.1.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Stores `summaries` under `key` and drops every entry past its TTL, so
    /// keys that are never read again do not accumulate.
    pub fn insert(&self, key: HistoryKey, summaries: Vec<HistorySummary>) {
        self.entries.retain(|_, (at, _)| at.elapsed() < self.ttl);
        self.entries.insert(key, (Instant::now(), summaries));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
