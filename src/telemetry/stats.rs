//! Hourly rollups and nearest-rank percentiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) const FIELD_TOTAL: &str = "total";
pub(crate) const FIELD_SUCCESS: &str = "success";
pub(crate) const FIELD_ERROR: &str = "error";
pub(crate) const FIELD_LATENCY_SUM: &str = "latency_sum";

/// Truncate a timestamp to the start of its UTC hour.
pub fn hour_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(3600), 0).unwrap_or(ts)
}

/// Label of an hour bucket, `YYYY-MM-DDTHH`.
pub fn hour_label(hour: DateTime<Utc>) -> String {
    hour.format("%Y-%m-%dT%H").to_string()
}

pub fn bucket_key(hour: DateTime<Utc>) -> String {
    format!("stats:hourly:{}", hour_label(hour))
}

pub fn latencies_key(hour: DateTime<Utc>) -> String {
    format!("stats:hourly:{}:latencies", hour_label(hour))
}

/// Nearest-rank percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Percentiles {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

/// Sort the samples and pick indices `len/2`, `len*95/100` and `len*99/100`.
///
/// Not interpolated. An empty sample set yields zeros.
pub fn nearest_rank_percentiles(mut samples: Vec<u64>) -> Percentiles {
    if samples.is_empty() {
        return Percentiles::default();
    }
    samples.sort_unstable();
    let len = samples.len();
    Percentiles {
        p50: samples[len / 2],
        p95: samples[len * 95 / 100],
        p99: samples[len * 99 / 100],
    }
}

/// Summary of one hour bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyStats {
    /// `YYYY-MM-DDTHH` in UTC
    pub hour: String,
    pub total: u64,
    /// `ok` and `degraded` dispatches
    pub success: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}

impl HourlyStats {
    /// A bucket with no traffic.
    pub fn empty(hour: DateTime<Utc>) -> Self {
        Self {
            hour: hour_label(hour),
            total: 0,
            success: 0,
            errors: 0,
            avg_latency_ms: 0.0,
            p50_ms: 0,
            p95_ms: 0,
            p99_ms: 0,
        }
    }

    /// Fold raw bucket fields and latency samples into a summary.
    ///
    /// Unparseable counters read as zero and unparseable samples are dropped.
    pub fn from_bucket(
        hour: DateTime<Utc>,
        fields: &HashMap<String, String>,
        samples: &[String],
    ) -> Self {
        let field = |name: &str| -> u64 {
            fields
                .get(name)
                .and_then(|v| v.parse::<i64>().ok())
                .map_or(0, |v| v.max(0) as u64)
        };

        let total = field(FIELD_TOTAL);
        let latency_sum = field(FIELD_LATENCY_SUM);
        let avg_latency_ms = if total == 0 {
            0.0
        } else {
            latency_sum as f64 / total as f64
        };

        let percentiles =
            nearest_rank_percentiles(samples.iter().filter_map(|s| s.parse().ok()).collect());

        Self {
            hour: hour_label(hour),
            total,
            success: field(FIELD_SUCCESS),
            errors: field(FIELD_ERROR),
            avg_latency_ms,
            p50_ms: percentiles.p50,
            p95_ms: percentiles.p95,
            p99_ms: percentiles.p99,
        }
    }
}
