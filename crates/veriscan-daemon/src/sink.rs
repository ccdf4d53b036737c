//! Report sink
//!
//! Writes one JSON report document per terminated session and maintains a
//! cumulative verified-device counter file keyed by range bounds. The report
//! is written in a single operation so consumers never observe a partial row
//! set.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use veriscan_core::{ReportRow, ReportStatus};
use veriscan_session::SessionReport;

#[derive(Serialize)]
struct ReportDocument<'a> {
    generated_at: String,
    cause: String,
    tag: String,
    range: String,
    verified: usize,
    rejected: usize,
    not_found: usize,
    rows: &'a [ReportRow],
}

fn count(rows: &[ReportRow], status: ReportStatus) -> usize {
    rows.iter().filter(|r| r.status == status).count()
}

/// Write the full session report to a timestamped file in `dir`
pub fn write_report(dir: &Path, report: &SessionReport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating report directory {}", dir.display()))?;

    let doc = ReportDocument {
        generated_at: Utc::now().to_rfc3339(),
        cause: report.cause.to_string(),
        tag: report.state.tag().to_string(),
        range: report.state.range().to_string(),
        verified: count(&report.rows, ReportStatus::Verified),
        rejected: count(&report.rows, ReportStatus::Rejected),
        not_found: count(&report.rows, ReportStatus::NotFound),
        rows: &report.rows,
    };

    let filename = format!(
        "report-{}-{}.json",
        report.state.range(),
        Utc::now().format("%Y%m%dT%H%M%S")
    );
    let path = dir.join(filename);
    let content = serde_json::to_string_pretty(&doc)?;
    std::fs::write(&path, content)
        .with_context(|| format!("writing report {}", path.display()))?;
    Ok(path)
}

/// Add a session's verified count to the cumulative counter for its range.
/// Returns the new total.
pub fn bump_counter(path: &Path, range_key: &str, verified: u64) -> Result<u64> {
    let mut counts: BTreeMap<String, u64> = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .with_context(|| format!("parsing counter file {}", path.display()))?
    } else {
        BTreeMap::new()
    };

    let total = counts.entry(range_key.to_string()).or_insert(0);
    *total += verified;
    let total = *total;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(&counts)?)
        .with_context(|| format!("writing counter file {}", path.display()))?;

    info!(range = range_key, verified, total, "Counter updated");
    Ok(total)
}
