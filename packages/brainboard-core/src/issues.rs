/// Per-card issue notes: freeform markdown attached to an item, stored as
/// hash-addressed files next to the board store.
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::config::StoreConfig;
use crate::store::board_store::atomic_write;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct IssueData {
    pub id: String,
    pub key: String,
    pub content: String,
}

pub struct IssueStore {
    issue_dir: PathBuf,
}

impl IssueStore {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let issue_dir = config.store_dir().join("issues");
        fs::create_dir_all(&issue_dir)?;
        Ok(Self { issue_dir })
    }

    /// Deterministic note id for an item key: SHA-256, first 12 hex chars.
    pub fn issue_id(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..6])
    }

    fn issue_path(&self, id: &str) -> PathBuf {
        self.issue_dir.join(format!("{}.md", id))
    }

    pub fn issue_dir(&self) -> &Path {
        &self.issue_dir
    }

    /// Load the note for an item. A missing file reads as empty content.
    pub fn issue(&self, key: &str) -> IssueData {
        let id = Self::issue_id(key);
        let content = fs::read_to_string(self.issue_path(&id)).unwrap_or_default();
        IssueData {
            id,
            key: key.to_string(),
            content,
        }
    }

    pub fn save_issue(&self, key: &str, content: &str) -> Result<(), StoreError> {
        let path = self.issue_path(&Self::issue_id(key));
        atomic_write(&path, content)?;
        Ok(())
    }

    pub fn has_issue(&self, key: &str) -> bool {
        self.issue_path(&Self::issue_id(key)).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_id_is_deterministic_and_short() {
        let a = IssueStore::issue_id("f.md::buy milk");
        let b = IssueStore::issue_id("f.md::buy milk");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(a, IssueStore::issue_id("f.md::other"));
    }

    #[test]
    fn missing_issue_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = IssueStore::open(&StoreConfig::new(dir.path())).unwrap();

        let issue = store.issue("f.md::x");
        assert!(issue.content.is_empty());
        assert!(!store.has_issue("f.md::x"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = IssueStore::open(&StoreConfig::new(dir.path())).unwrap();

        store.save_issue("f.md::x", "## Notes\n\ndetails\n").unwrap();
        assert!(store.has_issue("f.md::x"));
        let issue = store.issue("f.md::x");
        assert_eq!(issue.content, "## Notes\n\ndetails\n");
        assert_eq!(issue.key, "f.md::x");
    }
}
