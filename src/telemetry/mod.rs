//! Telemetry aggregator.
//!
//! Each completed dispatch is persisted as a [`RequestLogRecord`] under its
//! trace identifier, indexed in a timeline sorted set for recency queries, and
//! folded into an hourly bucket of counters plus raw latency samples.
//!
//! Writes never fail the dispatch path: store errors are logged and counted,
//! then dropped. Bucket fields are updated one command at a time, so a reader
//! may briefly observe `total` ahead of `success + errors`.

mod record;
mod stats;

#[cfg(test)]
mod tests;

pub use record::RequestLogRecord;
pub use stats::{
    bucket_key, hour_bucket, hour_label, latencies_key, nearest_rank_percentiles, HourlyStats,
    Percentiles,
};

use crate::dispatch::DispatchStatus;
use crate::store::{KvStore, StoreError, StoreHandle};
use chrono::{DateTime, Duration as TimeDelta, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Retention of per-request records and timeline entries.
pub const RECORD_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Retention of hourly buckets and their latency samples.
pub const BUCKET_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Sorted set of trace identifiers scored by epoch milliseconds.
pub const TIMELINE_KEY: &str = "requests:timeline";

/// Timeline entries fetched per page by [`TelemetryAggregator::recent`].
const RECENT_PAGE_SIZE: usize = 100;

pub fn record_key(trace_id: &str) -> String {
    format!("request:{}", trace_id)
}

/// Durable request log and hourly rollups over the shared store.
#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    store: StoreHandle,
}

impl TelemetryAggregator {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Persist a record and fold it into its hourly bucket.
    ///
    /// Infallible for the caller; failures are logged locally.
    pub async fn log(&self, record: &RequestLogRecord) {
        let Some(store) = self.store.backend() else {
            debug!(trace_id = %record.trace_id, "No durable store, telemetry record dropped");
            return;
        };

        if let Err(e) = write_record(store.as_ref(), record).await {
            metrics::counter!("relay_telemetry_write_errors_total").increment(1);
            warn!(
                trace_id = %record.trace_id,
                error = %e,
                "Failed to persist telemetry record"
            );
        }
    }

    /// Fire-and-forget form of [`log`](Self::log) on a spawned task.
    pub fn spawn_log(&self, record: RequestLogRecord) -> JoinHandle<()> {
        let aggregator = self.clone();
        tokio::spawn(async move { aggregator.log(&record).await })
    }

    /// Up to `limit` most recent records, newest first, optionally by status.
    ///
    /// Timeline entries whose record has expired are skipped.
    pub async fn recent(
        &self,
        limit: usize,
        status: Option<DispatchStatus>,
    ) -> Result<Vec<RequestLogRecord>, StoreError> {
        let Some(store) = self.store.backend() else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(limit.min(RECENT_PAGE_SIZE));
        let mut offset = 0;
        while records.len() < limit {
            let trace_ids = store
                .zrevrange_by_score(TIMELINE_KEY, offset, RECENT_PAGE_SIZE)
                .await?;
            offset += trace_ids.len();

            for trace_id in &trace_ids {
                let Some(record) = read_record(store.as_ref(), trace_id).await? else {
                    continue;
                };
                if status.is_some_and(|s| s != record.status) {
                    continue;
                }
                records.push(record);
                if records.len() == limit {
                    break;
                }
            }

            if trace_ids.len() < RECENT_PAGE_SIZE {
                break;
            }
        }
        Ok(records)
    }

    /// Look up one record by trace identifier.
    pub async fn by_trace_id(
        &self,
        trace_id: &str,
    ) -> Result<Option<RequestLogRecord>, StoreError> {
        match self.store.backend() {
            Some(store) => read_record(store.as_ref(), trace_id).await,
            None => Ok(None),
        }
    }

    /// Summaries of the last `hours` buckets ending with the current hour.
    pub async fn hourly_stats(&self, hours: u32) -> Result<Vec<HourlyStats>, StoreError> {
        self.hourly_stats_at(Utc::now(), hours).await
    }

    /// Summaries of the `hours` buckets ending with the hour containing `now`,
    /// newest first. Without a store every bucket reads as empty.
    pub async fn hourly_stats_at(
        &self,
        now: DateTime<Utc>,
        hours: u32,
    ) -> Result<Vec<HourlyStats>, StoreError> {
        let current = hour_bucket(now);
        let mut summaries = Vec::with_capacity(hours as usize);

        for i in 0..hours {
            let hour = current - TimeDelta::hours(i64::from(i));
            let summary = match self.store.backend() {
                Some(store) => {
                    let fields = store.hgetall(&bucket_key(hour)).await?;
                    let samples = store.lrange(&latencies_key(hour), 0, -1).await?;
                    HourlyStats::from_bucket(hour, &fields, &samples)
                }
                None => HourlyStats::empty(hour),
            };
            summaries.push(summary);
        }
        Ok(summaries)
    }
}

async fn write_record(store: &dyn KvStore, record: &RequestLogRecord) -> Result<(), StoreError> {
    let payload = serde_json::to_string(record)?;
    store
        .set(&record_key(&record.trace_id), &payload, Some(RECORD_TTL))
        .await?;

    let score = record.timestamp.timestamp_millis() as f64;
    store.zadd(TIMELINE_KEY, &record.trace_id, score).await?;

    let cutoff = (Utc::now().timestamp_millis() as f64) - RECORD_TTL.as_millis() as f64;
    let pruned = store.zrem_range_by_score(TIMELINE_KEY, 0.0, cutoff).await?;
    if pruned > 0 {
        debug!(pruned, "Pruned expired timeline entries");
    }

    let hour = hour_bucket(record.timestamp);
    let bucket = bucket_key(hour);
    let outcome = if record.status.is_success() {
        stats::FIELD_SUCCESS
    } else {
        stats::FIELD_ERROR
    };
    let latency = i64::try_from(record.latency_ms).unwrap_or(i64::MAX);

    store.hincr_by(&bucket, stats::FIELD_TOTAL, 1).await?;
    store.hincr_by(&bucket, outcome, 1).await?;
    store
        .hincr_by(&bucket, stats::FIELD_LATENCY_SUM, latency)
        .await?;

    let samples = latencies_key(hour);
    store
        .rpush(&samples, &record.latency_ms.to_string())
        .await?;

    store.expire(&bucket, BUCKET_TTL).await?;
    store.expire(&samples, BUCKET_TTL).await?;
    Ok(())
}

async fn read_record(
    store: &dyn KvStore,
    trace_id: &str,
) -> Result<Option<RequestLogRecord>, StoreError> {
    let Some(raw) = store.get(&record_key(trace_id)).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(trace_id, error = %e, "Skipping malformed telemetry record");
            Ok(None)
        }
    }
}
