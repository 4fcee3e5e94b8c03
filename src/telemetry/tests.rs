use super::*;
use crate::dispatch::{DispatchRequest, DispatchResult};
use crate::store::testing::FailingStore;
use crate::store::MemoryStore;
use chrono::TimeZone;
use serde_json::{json, Map};
use std::sync::Arc;

fn record(
    trace_id: &str,
    status: DispatchStatus,
    latency_ms: u64,
    ts: DateTime<Utc>,
) -> RequestLogRecord {
    RequestLogRecord {
        trace_id: trace_id.to_string(),
        timestamp: ts,
        status,
        latency_ms,
        retry_count: 0,
        context: Map::new(),
        query_preview: None,
        error: None,
    }
}

fn memory_aggregator() -> (TelemetryAggregator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (TelemetryAggregator::new(StoreHandle::new(store.clone())), store)
}

#[tokio::test]
async fn test_log_then_lookup_by_trace_id() {
    let (telemetry, _) = memory_aggregator();
    let rec = record("t-1", DispatchStatus::Ok, 120, Utc::now());
    telemetry.log(&rec).await;

    assert_eq!(telemetry.by_trace_id("t-1").await.unwrap(), Some(rec));
    assert!(telemetry.by_trace_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_recent_newest_first_with_limit() {
    let (telemetry, _) = memory_aggregator();
    let now = Utc::now();
    for i in 0..5 {
        let ts = now - TimeDelta::seconds(10 - i);
        telemetry
            .log(&record(&format!("t-{}", i), DispatchStatus::Ok, 10, ts))
            .await;
    }

    let recent = telemetry.recent(3, None).await.unwrap();
    let ids: Vec<&str> = recent.iter().map(|r| r.trace_id.as_str()).collect();
    assert_eq!(ids, vec!["t-4", "t-3", "t-2"]);

    assert!(telemetry.recent(0, None).await.unwrap().is_empty());
    assert_eq!(telemetry.recent(50, None).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_recent_filters_by_status() {
    let (telemetry, _) = memory_aggregator();
    let now = Utc::now();
    let statuses = [
        DispatchStatus::Ok,
        DispatchStatus::Error,
        DispatchStatus::Degraded,
        DispatchStatus::Error,
    ];
    for (i, status) in statuses.into_iter().enumerate() {
        let ts = now - TimeDelta::seconds(10 - i as i64);
        telemetry
            .log(&record(&format!("t-{}", i), status, 10, ts))
            .await;
    }

    let errors = telemetry
        .recent(10, Some(DispatchStatus::Error))
        .await
        .unwrap();
    let ids: Vec<&str> = errors.iter().map(|r| r.trace_id.as_str()).collect();
    assert_eq!(ids, vec!["t-3", "t-1"]);
}

#[tokio::test]
async fn test_recent_pages_past_filtered_entries() {
    let (telemetry, _) = memory_aggregator();
    let now = Utc::now();
    telemetry
        .log(&record("old-error", DispatchStatus::Error, 0, now - TimeDelta::hours(1)))
        .await;
    for i in 0..(RECENT_PAGE_SIZE + 20) {
        let ts = now - TimeDelta::milliseconds(i as i64);
        telemetry
            .log(&record(&format!("ok-{}", i), DispatchStatus::Ok, 5, ts))
            .await;
    }

    let errors = telemetry
        .recent(5, Some(DispatchStatus::Error))
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].trace_id, "old-error");
}

#[tokio::test]
async fn test_recent_skips_expired_records() {
    let (telemetry, store) = memory_aggregator();
    let now = Utc::now();
    telemetry
        .log(&record("kept", DispatchStatus::Ok, 10, now))
        .await;
    telemetry
        .log(&record("gone", DispatchStatus::Ok, 10, now - TimeDelta::seconds(1)))
        .await;
    store.del(&record_key("gone")).await.unwrap();

    let recent = telemetry.recent(10, None).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].trace_id, "kept");
}

#[tokio::test]
async fn test_timeline_prunes_entries_past_retention() {
    let (telemetry, store) = memory_aggregator();
    let stale = Utc::now() - TimeDelta::days(8);
    telemetry
        .log(&record("stale", DispatchStatus::Ok, 10, stale))
        .await;
    telemetry
        .log(&record("fresh", DispatchStatus::Ok, 10, Utc::now()))
        .await;

    let members = store
        .zrevrange_by_score(TIMELINE_KEY, 0, 10)
        .await
        .unwrap();
    assert_eq!(members, vec!["fresh".to_string()]);
}

#[tokio::test]
async fn test_hourly_bucket_counts_degraded_as_success() {
    let (telemetry, store) = memory_aggregator();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();

    telemetry
        .log(&record("a", DispatchStatus::Ok, 4_000, now))
        .await;
    telemetry
        .log(&record("b", DispatchStatus::Degraded, 6_000, now))
        .await;
    telemetry
        .log(&record("c", DispatchStatus::Error, 0, now))
        .await;

    let fields = store
        .hgetall("stats:hourly:2024-05-01T14")
        .await
        .unwrap();
    assert_eq!(fields["total"], "3");
    assert_eq!(fields["success"], "2");
    assert_eq!(fields["error"], "1");
    assert_eq!(fields["latency_sum"], "10000");

    let stats = telemetry.hourly_stats_at(now, 2).await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].hour, "2024-05-01T14");
    assert_eq!(stats[0].total, 3);
    assert_eq!(stats[0].success, 2);
    assert_eq!(stats[0].errors, 1);
    assert!((stats[0].avg_latency_ms - 10_000.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats[0].p50_ms, 4_000);
    assert_eq!(stats[0].p99_ms, 6_000);

    assert_eq!(stats[1], HourlyStats::empty(hour_bucket(now) - TimeDelta::hours(1)));
    assert_eq!(stats[1].hour, "2024-05-01T13");
}

#[tokio::test]
async fn test_hourly_percentiles_over_hundred_samples() {
    let (telemetry, _) = memory_aggregator();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    for i in 1..=100u64 {
        telemetry
            .log(&record(&format!("t-{}", i), DispatchStatus::Ok, i * 10, now))
            .await;
    }

    let stats = telemetry.hourly_stats_at(now, 1).await.unwrap();
    assert_eq!(stats[0].p50_ms, 510);
    assert_eq!(stats[0].p95_ms, 960);
    assert_eq!(stats[0].p99_ms, 1000);
    assert_eq!(stats[0].avg_latency_ms, 505.0);
}

#[tokio::test]
async fn test_disabled_store_reads_empty() {
    let telemetry = TelemetryAggregator::new(StoreHandle::disabled());
    telemetry
        .log(&record("t", DispatchStatus::Ok, 1, Utc::now()))
        .await;

    assert!(telemetry.recent(10, None).await.unwrap().is_empty());
    assert!(telemetry.by_trace_id("t").await.unwrap().is_none());

    let stats = telemetry.hourly_stats(3).await.unwrap();
    assert_eq!(stats.len(), 3);
    assert!(stats.iter().all(|s| s.total == 0 && s.p99_ms == 0));
}

#[tokio::test]
async fn test_failing_store_never_breaks_logging() {
    let telemetry = TelemetryAggregator::new(StoreHandle::new(Arc::new(FailingStore)));
    telemetry
        .log(&record("t", DispatchStatus::Ok, 1, Utc::now()))
        .await;
    telemetry
        .spawn_log(record("u", DispatchStatus::Error, 0, Utc::now()))
        .await
        .unwrap();

    assert!(telemetry.recent(10, None).await.is_err());
    assert!(telemetry.hourly_stats(1).await.is_err());
}

#[tokio::test]
async fn test_spawn_log_persists() {
    let (telemetry, _) = memory_aggregator();
    telemetry
        .spawn_log(record("bg", DispatchStatus::Ok, 42, Utc::now()))
        .await
        .unwrap();
    assert_eq!(
        telemetry.by_trace_id("bg").await.unwrap().unwrap().latency_ms,
        42
    );
}

#[tokio::test]
async fn test_malformed_record_is_skipped() {
    let (telemetry, store) = memory_aggregator();
    store.set(&record_key("junk"), "{not json", None).await.unwrap();
    assert!(telemetry.by_trace_id("junk").await.unwrap().is_none());
}

#[test]
fn test_record_from_dispatch_redacts_context() {
    let mut context = Map::new();
    context.insert("channel".to_string(), json!("sms"));
    context.insert("auth_token".to_string(), json!("abc"));
    let request = DispatchRequest::new("where is my order?", context);
    let result = DispatchResult::exhausted(&request.trace_id, 2, Some("boom".to_string()));

    let rec = RequestLogRecord::from_dispatch(&request, &result);
    assert_eq!(rec.trace_id, request.trace_id);
    assert_eq!(rec.status, DispatchStatus::Error);
    assert_eq!(rec.retry_count, 2);
    assert_eq!(rec.context["channel"], json!("sms"));
    assert_eq!(rec.context["auth_token"], json!("[redacted]"));
    assert_eq!(rec.query_preview.as_deref(), Some("where is my order?"));
    assert_eq!(rec.error.as_deref(), Some("boom"));
}
