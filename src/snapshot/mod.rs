//! Snapshot loading.
//!
//! A snapshot is a directory of JSON documents exported from the AWS CLI, one
//! per resource collection plus one set per TGW route table:
//! - [`documents`] - the manifest of expected names and top-level keys
//! - [`DocumentSource`] - where the text comes from (disk or memory)
//! - [`load_snapshot`] - parse everything into a [`Snapshot`]

pub mod documents;
mod loader;
mod source;

pub use loader::{load_snapshot, Snapshot};
pub use source::{DirectorySource, DocumentSource};
