//! `stats` and `recent` command handlers
//!
//! Both read straight from the durable store the server writes to, so they
//! work against a running gateway without going through its HTTP API.

use crate::cli::output::{
    format_hourly_json, format_hourly_table, format_recent_json, format_recent_table,
};
use crate::cli::serve::load_base_config;
use crate::cli::{RecentArgs, StatsArgs};
use crate::dispatch::DispatchStatus;
use crate::store::StoreHandle;
use crate::telemetry::TelemetryAggregator;
use std::path::Path;

const MAX_HOURS: u32 = 720;

async fn connect_telemetry(
    config_path: &Path,
) -> Result<TelemetryAggregator, Box<dyn std::error::Error>> {
    let config = load_base_config(config_path)?;
    let store = StoreHandle::connect(&config.store).await;
    if !store.is_enabled() {
        return Err("No durable store available. Set store.url or RELAY_STORE_URL.".into());
    }
    Ok(TelemetryAggregator::new(store))
}

/// Handle `relay stats`
pub async fn run_stats(args: &StatsArgs) -> Result<String, Box<dyn std::error::Error>> {
    let telemetry = connect_telemetry(&args.config).await?;
    let hours = args.hours.clamp(1, MAX_HOURS);
    let stats = telemetry.hourly_stats(hours).await?;

    if args.json {
        Ok(format_hourly_json(&stats)?)
    } else {
        Ok(format_hourly_table(&stats))
    }
}

/// Handle `relay recent`
pub async fn run_recent(args: &RecentArgs) -> Result<String, Box<dyn std::error::Error>> {
    let status = args
        .status
        .as_deref()
        .map(str::parse::<DispatchStatus>)
        .transpose()?;

    let telemetry = connect_telemetry(&args.config).await?;
    let records = telemetry.recent(args.limit, status).await?;

    if args.json {
        Ok(format_recent_json(&records)?)
    } else if records.is_empty() {
        Ok("No requests recorded".to_string())
    } else {
        Ok(format_recent_table(&records))
    }
}
