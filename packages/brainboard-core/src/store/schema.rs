/// Persisted store document and its migration loader.
///
/// The loader never fails: missing or unparsable content yields full
/// defaults, and every historical document shape is coalesced into the
/// current one on read. Old shapes are not re-emitted once saved.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{default_color, default_columns, ColumnDef, NO_STATUS_ID};

/// The root state blob: everything the board persists, in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    /// User columns only. The system column is synthetic and never stored.
    pub columns: Vec<ColumnDef>,
    /// item key -> column id
    pub task_assignments: BTreeMap<String, String>,
    /// column id -> ordered item keys
    pub card_order: BTreeMap<String, Vec<String>>,
    /// item key -> epoch millis of the last column transition
    pub task_moved_at: BTreeMap<String, i64>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            task_assignments: BTreeMap::new(),
            card_order: BTreeMap::new(),
            task_moved_at: BTreeMap::new(),
        }
    }
}

/// Raw on-disk shape, permissive enough to absorb every historical format:
/// the unified `columns` list, the old per-source `claudeColumns` /
/// `obsidianColumns` pair, and the retired `sessions` / `tabOrder` arrays
/// (accepted and dropped).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDoc {
    columns: Option<Vec<RawColumn>>,
    claude_columns: Option<Vec<RawColumn>>,
    obsidian_columns: Option<Vec<RawColumn>>,
    task_assignments: Option<BTreeMap<String, String>>,
    card_order: Option<BTreeMap<String, Vec<String>>>,
    task_moved_at: Option<BTreeMap<String, i64>>,
    sessions: Option<serde_json::Value>,
    tab_order: Option<serde_json::Value>,
}

/// A column as found on disk. Early documents omitted `description`,
/// `color` and `completesTask`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawColumn {
    id: String,
    label: String,
    description: String,
    color: String,
    completes_task: bool,
}

fn normalize(raw: RawColumn) -> Option<ColumnDef> {
    // Entries without an id are unusable; the reserved system id must not
    // survive as a user column.
    if raw.id.is_empty() || raw.id == NO_STATUS_ID {
        return None;
    }
    Some(ColumnDef {
        id: raw.id,
        label: raw.label,
        description: raw.description,
        color: if raw.color.is_empty() {
            default_color()
        } else {
            raw.color
        },
        completes_task: raw.completes_task,
    })
}

fn normalize_list(raw: Vec<RawColumn>) -> Vec<ColumnDef> {
    raw.into_iter().filter_map(normalize).collect()
}

/// Coalesce the historical per-source column lists into one. A unified
/// `columns` list wins outright; otherwise the task list comes first and
/// session-list entries are appended when their id is new. Defaults apply
/// only when no list was persisted at all.
fn coalesce_columns(raw: &mut RawDoc) -> Vec<ColumnDef> {
    if let Some(cols) = raw.columns.take() {
        return normalize_list(cols);
    }
    if raw.obsidian_columns.is_none() && raw.claude_columns.is_none() {
        return default_columns();
    }
    let mut out = normalize_list(raw.obsidian_columns.take().unwrap_or_default());
    for col in normalize_list(raw.claude_columns.take().unwrap_or_default()) {
        if !out.iter().any(|c| c.id == col.id) {
            out.push(col);
        }
    }
    out
}

/// Parse a persisted document into store state. Never fails: malformed
/// input is logged and replaced by defaults.
pub fn parse_store(raw: &str) -> StoreData {
    let mut doc: RawDoc = match serde_json::from_str(raw) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("[brainboard.store.load] Unparsable store document, using defaults: {}", e);
            return StoreData::default();
        }
    };

    if doc.sessions.is_some() || doc.tab_order.is_some() {
        log::info!("[brainboard.store.load] Dropping retired sessions/tabOrder entries");
    }

    StoreData {
        columns: coalesce_columns(&mut doc),
        task_assignments: doc.task_assignments.unwrap_or_default(),
        card_order: doc.card_order.unwrap_or_default(),
        task_moved_at: doc.task_moved_at.unwrap_or_default(),
    }
}

/// Serialize store state to its on-disk form.
pub fn to_document(data: &StoreData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}
