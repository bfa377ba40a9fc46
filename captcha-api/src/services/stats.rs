use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    total: u64,
    success: u64,
    failed: u64,
    total_duration: Duration,
}

/// Per-endpoint counters as reported by `GET /stats`.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    /// Mean handling time in milliseconds, two decimals.
    pub avg_response_ms: f64,
}

impl From<Counters> for EndpointStats {
    fn from(counters: Counters) -> Self {
        let avg = if counters.total == 0 {
            0.0
        } else {
            counters.total_duration.as_secs_f64() * 1000.0 / counters.total as f64
        };
        Self {
            total: counters.total,
            success: counters.success,
            failed: counters.failed,
            avg_response_ms: (avg * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[schema(value_type = String)]
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub endpoints: BTreeMap<String, EndpointStats>,
}

/// Process-wide request counters, keyed by endpoint name.
#[derive(Debug)]
pub struct StatsTracker {
    started_at: DateTime<Utc>,
    started: Instant,
    endpoints: Mutex<HashMap<String, Counters>>,
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, endpoint: &str, success: bool, elapsed: Duration) {
        let mut endpoints = match self.endpoints.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let counters = endpoints.entry(endpoint.to_string()).or_default();
        counters.total += 1;
        if success {
            counters.success += 1;
        } else {
            counters.failed += 1;
        }
        counters.total_duration += elapsed;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let endpoints = match self.endpoints.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let endpoints: BTreeMap<String, EndpointStats> = endpoints
            .iter()
            .map(|(name, counters)| (name.clone(), EndpointStats::from(*counters)))
            .collect();

        StatsSnapshot {
            started_at: self.started_at,
            uptime_seconds: self.started.elapsed().as_secs(),
            total_requests: endpoints.values().map(|stats| stats.total).sum(),
            endpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StatsTracker::new().snapshot();
        assert!(snapshot.endpoints.is_empty());
        assert_eq!(snapshot.total_requests, 0);
    }

    #[test]
    fn test_counts_per_endpoint() {
        let tracker = StatsTracker::new();
        tracker.record("classification", true, Duration::from_millis(10));
        tracker.record("classification", false, Duration::from_millis(30));
        tracker.record("calculate", true, Duration::from_millis(5));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(
            snapshot.endpoints["classification"],
            EndpointStats {
                total: 2,
                success: 1,
                failed: 1,
                avg_response_ms: 20.0,
            }
        );
        assert_eq!(snapshot.endpoints["calculate"].success, 1);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let tracker = StatsTracker::new();
        tracker.record("crop", true, Duration::from_millis(1));
        let json = serde_json::to_value(tracker.snapshot()).unwrap();
        assert!(json["uptimeSeconds"].is_u64());
        assert_eq!(json["endpoints"]["crop"]["avgResponseMs"], 1.0);
    }
}
