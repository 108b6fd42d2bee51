use serde::{Deserialize, Serialize};

/// Reserved id of the synthetic system column. Never persisted, never
/// user-editable.
pub const NO_STATUS_ID: &str = "no_status";

/// A board column. `completes_task` marks completion columns: moving a
/// task there checks it off in its source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub completes_task: bool,
}

pub(crate) fn default_color() -> String {
    "#868e96".to_string()
}

/// The synthetic column holding cards with no valid explicit assignment.
/// Always enumerated first, never stored.
pub fn no_status_column() -> ColumnDef {
    ColumnDef {
        id: NO_STATUS_ID.to_string(),
        label: "No Status".to_string(),
        description: String::new(),
        color: "#545d68".to_string(),
        completes_task: false,
    }
}

/// Default user columns for a fresh store.
pub fn default_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef {
            id: "todo".to_string(),
            label: "Todo".to_string(),
            description: String::new(),
            color: "#868e96".to_string(),
            completes_task: false,
        },
        ColumnDef {
            id: "doing".to_string(),
            label: "Doing".to_string(),
            description: String::new(),
            color: "#e5a00d".to_string(),
            completes_task: false,
        },
        ColumnDef {
            id: "done".to_string(),
            label: "Done".to_string(),
            description: String::new(),
            color: "#2da44e".to_string(),
            completes_task: true,
        },
    ]
}

/// Partial column update applied by [`crate::store::BoardStore::update_column`].
#[derive(Debug, Clone, Default)]
pub struct ColumnPatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub completes_task: Option<bool>,
}

/// What kind of source an item was scanned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A `- [ ]` checkbox line inside a markdown file.
    Task,
    /// A whole markdown file tracked via its frontmatter status property.
    File,
}

/// An item observed by a scan. Ephemeral: the scan result is authoritative
/// for existence, the store only remembers column assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub text: String,
    /// Always false for [`ItemKind::File`] items.
    pub completed: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub ctime: i64,
    pub mtime: i64,
}

/// Stable key for an item: file path plus text for tasks, file path alone
/// for file items. Line numbers shift as documents are edited, so they are
/// deliberately not part of the key.
pub fn item_key(item: &BoardItem) -> String {
    match item.kind {
        ItemKind::File => item.file_path.clone(),
        ItemKind::Task => format!("{}::{}", item.file_path, item.text),
    }
}
