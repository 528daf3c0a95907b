//! Output formatting for analysis reports.
//!
//! - [`json`] - Full report as pretty JSON
//! - [`terminal`] - Colored terminal summary

mod json;
mod terminal;

pub use json::{to_json, write_report};
pub use terminal::{finding_row, format_field, print_summary};
