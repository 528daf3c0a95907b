//! JSON export of the full report.

use crate::error::ExportError;
use crate::report::AnalysisReport;
use std::fs;
use std::path::Path;

/// Pretty JSON of the whole report.
pub fn to_json(report: &AnalysisReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the report as pretty JSON to `path`.
///
/// # Arguments
/// * `report` - The analysis result
/// * `path` - Destination file, overwritten if it exists
pub fn write_report(report: &AnalysisReport, path: &Path) -> Result<(), ExportError> {
    let json = to_json(report)?;
    fs::write(path, json).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote report to {}", path.display());
    Ok(())
}
