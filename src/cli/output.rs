//! Output formatting helpers for CLI commands

use crate::dispatch::DispatchStatus;
use crate::telemetry::{HourlyStats, RequestLogRecord};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

fn status_cell(status: DispatchStatus) -> String {
    match status {
        DispatchStatus::Ok => "ok".green().to_string(),
        DispatchStatus::Degraded => "degraded".yellow().to_string(),
        DispatchStatus::Error => "error".red().to_string(),
    }
}

/// Format hourly rollups as a table
pub fn format_hourly_table(stats: &[HourlyStats]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Hour (UTC)",
        "Total",
        "Success",
        "Errors",
        "Avg",
        "p50",
        "p95",
        "p99",
    ]);

    for s in stats {
        let errors = if s.errors > 0 {
            s.errors.to_string().red().to_string()
        } else {
            s.errors.to_string()
        };

        table.add_row(vec![
            Cell::new(&s.hour),
            Cell::new(s.total),
            Cell::new(s.success),
            Cell::new(errors),
            Cell::new(format!("{:.1}ms", s.avg_latency_ms)),
            Cell::new(format!("{}ms", s.p50_ms)),
            Cell::new(format!("{}ms", s.p95_ms)),
            Cell::new(format!("{}ms", s.p99_ms)),
        ]);
    }

    table.to_string()
}

/// Format hourly rollups as JSON
pub fn format_hourly_json(stats: &[HourlyStats]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({ "hours": stats }))
}

/// Format request records as a table
pub fn format_recent_table(records: &[RequestLogRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time (UTC)", "Trace", "Status", "Latency", "Retries", "Query"]);

    for r in records {
        table.add_row(vec![
            Cell::new(r.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&r.trace_id),
            Cell::new(status_cell(r.status)),
            Cell::new(format!("{}ms", r.latency_ms)),
            Cell::new(r.retry_count),
            Cell::new(r.query_preview.as_deref().unwrap_or("-")),
        ]);
    }

    table.to_string()
}

/// Format request records as JSON
pub fn format_recent_json(records: &[RequestLogRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({ "requests": records }))
}
