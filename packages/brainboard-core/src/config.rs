/// Store configuration shared by the board host and the scanner.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default directory (relative to the vault root) holding the store file.
pub const DEFAULT_STORE_DIR: &str = ".brain-board";

/// Pre-rename storage directory, migrated from on first open.
pub const LEGACY_STORE_DIR: &str = ".claude-board";

/// File name of the persisted store document. Kept for compatibility with
/// documents written by earlier releases.
pub const STORE_FILE_NAME: &str = "sessions.json";

/// Frontmatter property used to track whole-file notes on the board.
pub const DEFAULT_TRACKING_PROPERTY: &str = "board-status";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Root of the vault the board overlays.
    pub base_dir: PathBuf,
    /// Store directory override: absolute paths are used as-is, relative
    /// paths are joined to `base_dir`.
    #[serde(default)]
    pub storage_dir: Option<String>,
    /// Restrict task scanning to this subfolder of the vault.
    #[serde(default)]
    pub task_dir: Option<String>,
    /// Frontmatter property marking a file as a board note.
    #[serde(default)]
    pub tracking_property: Option<String>,
    /// Only scan files modified within this many days. 0 disables the cutoff.
    #[serde(default)]
    pub recent_window_days: Option<u32>,
}

impl StoreConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            storage_dir: None,
            task_dir: None,
            tracking_property: None,
            recent_window_days: None,
        }
    }

    /// Resolved directory holding the store file and issue notes.
    pub fn store_dir(&self) -> PathBuf {
        match self.storage_dir.as_deref() {
            Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => self.base_dir.join(dir),
            None => self.base_dir.join(DEFAULT_STORE_DIR),
        }
    }

    /// Path of the persisted store document.
    pub fn store_file(&self) -> PathBuf {
        self.store_dir().join(STORE_FILE_NAME)
    }

    /// Path of the pre-rename store document, checked once at open.
    pub fn legacy_store_file(&self) -> PathBuf {
        self.base_dir.join(LEGACY_STORE_DIR).join(STORE_FILE_NAME)
    }

    pub fn tracking_property(&self) -> &str {
        self.tracking_property
            .as_deref()
            .unwrap_or(DEFAULT_TRACKING_PROPERTY)
    }
}
