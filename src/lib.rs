//! Correlates an exported AWS network snapshot (Transit Gateways, VPCs, VPN,
//! Direct Connect) into one topology and detects connectivity issues.
//!
//! The pipeline is load ([`snapshot`]), index and build ([`processing`]),
//! detect, then render ([`output`]). [`analyze_dir`] runs all of it.

pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod processing;
mod report;
pub mod snapshot;

pub use config::AnalysisConfig;
pub use report::{analyze, analyze_dir, analyze_snapshot, AnalysisReport, SnapshotInfo};
