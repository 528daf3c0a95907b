//! Where snapshot documents come from.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Supplies the raw text of named documents.
///
/// Implementations must be shareable across the rayon pool.
pub trait DocumentSource: Sync {
    /// Text of `document`, or `Ok(None)` when it does not exist.
    fn read(&self, document: &str) -> io::Result<Option<String>>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// A directory of `<document>.json` files, as written by the export script.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> DirectorySource {
        DirectorySource {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_of(&self, document: &str) -> PathBuf {
        self.root.join(format!("{document}.json"))
    }
}

impl DocumentSource for DirectorySource {
    fn read(&self, document: &str) -> io::Result<Option<String>> {
        let path = self.path_of(document);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Documents already held in memory, keyed by document name.
impl DocumentSource for HashMap<String, String> {
    fn read(&self, document: &str) -> io::Result<Option<String>> {
        Ok(self.get(document).cloned())
    }

    fn describe(&self) -> String {
        format!("{} in-memory documents", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_source_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vpcs.json"), "{}").unwrap();
        let source = DirectorySource::new(dir.path());

        assert_eq!(source.read("vpcs").unwrap().as_deref(), Some("{}"));
        assert_eq!(source.read("subnets").unwrap(), None);
    }

    #[test]
    fn test_directory_source_on_missing_dir() {
        let source = DirectorySource::new("/definitely/not/here");
        assert_eq!(source.read("vpcs").unwrap(), None);
    }

    #[test]
    fn test_memory_source() {
        let mut docs = HashMap::new();
        docs.insert("vpcs".to_string(), "{\"Vpcs\": []}".to_string());
        assert!(docs.read("vpcs").unwrap().is_some());
        assert!(docs.read("subnets").unwrap().is_none());
        assert_eq!(docs.describe(), "1 in-memory documents");
    }
}
