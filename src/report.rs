//! End to end analysis: load, index, build, detect.

use crate::config::AnalysisConfig;
use crate::models::aws::Metadata;
use crate::models::{Finding, Topology, Warning};
use crate::processing::{build_topology, detect_issues, ResourceIndex};
use crate::snapshot::{load_snapshot, DirectorySource, DocumentSource, Snapshot};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Where and when the snapshot was collected.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotInfo {
    pub account_id: Option<String>,
    pub region: Option<String>,
    pub collected_at: Option<DateTime<Utc>>,
}

impl SnapshotInfo {
    pub fn from_metadata(metadata: &Metadata) -> SnapshotInfo {
        SnapshotInfo {
            account_id: non_empty(metadata.aws_account_id.as_deref()),
            region: non_empty(metadata.region.as_deref()),
            collected_at: metadata.timestamp.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Everything one run produces.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub snapshot: SnapshotInfo,
    pub topology: Topology,
    pub findings: Vec<Finding>,
    /// Loader and index warnings, sorted.
    pub warnings: Vec<Warning>,
}

/// Analyze the documents of `source`.
///
/// # Arguments
/// * `source` - Where the snapshot documents are read from
/// * `config` - Run configuration
///
/// # Returns
/// The report; missing or broken input shows up as warnings, never as an error
pub fn analyze<S>(source: &S, config: &AnalysisConfig) -> AnalysisReport
where
    S: DocumentSource + ?Sized,
{
    let snapshot = load_snapshot(source, config.parallel_load);
    analyze_snapshot(&snapshot, config)
}

/// Analyze a snapshot directory as written by the export script.
pub fn analyze_dir(path: impl AsRef<Path>, config: &AnalysisConfig) -> AnalysisReport {
    analyze(&DirectorySource::new(path.as_ref()), config)
}

/// Analyze an already loaded snapshot.
pub fn analyze_snapshot(snapshot: &Snapshot, config: &AnalysisConfig) -> AnalysisReport {
    let index = ResourceIndex::build(snapshot, config.duplicate_keys);
    let viewer = viewer_account(config, &snapshot.metadata);
    match viewer.as_deref() {
        Some(account) => log::info!("Viewer account {account}"),
        None => log::warn!("Viewer account unknown, cross-account checks disabled"),
    }

    let topology = build_topology(&index, viewer.as_deref());
    let findings = detect_issues(&topology, config.coverage);

    let mut warnings: Vec<Warning> = snapshot
        .warnings
        .iter()
        .chain(index.warnings())
        .cloned()
        .collect();
    warnings.sort();

    AnalysisReport {
        snapshot: SnapshotInfo::from_metadata(&snapshot.metadata),
        topology,
        findings,
        warnings,
    }
}

/// The configured account wins over the one recorded in the snapshot.
fn viewer_account(config: &AnalysisConfig, metadata: &Metadata) -> Option<String> {
    non_empty(config.viewer_account.as_deref()).or_else(|| non_empty(metadata.aws_account_id.as_deref()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(ts) => Some(ts.and_utc()),
        Err(e) => {
            log::warn!("Ignoring snapshot timestamp '{value}': {e}");
            None
        }
    }
}
