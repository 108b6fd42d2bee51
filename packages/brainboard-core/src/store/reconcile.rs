/// The reconciliation pass: repairs persisted task assignments against a
/// fresh scan. Pure over the state blob so it can be tested without any
/// filesystem; [`crate::store::BoardStore::sync_assignments`] wraps it
/// with the silent commit.
use std::collections::BTreeSet;

use crate::store::schema::StoreData;
use crate::types::{item_key, BoardItem, ColumnDef, NO_STATUS_ID};

/// Where an item lands when its recorded assignment is missing or invalid.
///
/// Completed items fall back to the last completion column in current
/// display order, then to a column literally named "done", then to the
/// last column overall. Everything else goes to the system column.
fn fallback_column<'a>(completed: bool, columns: &'a [ColumnDef]) -> &'a str {
    if !completed {
        return NO_STATUS_ID;
    }
    if let Some(col) = columns.iter().rev().find(|c| c.completes_task) {
        return &col.id;
    }
    if let Some(col) = columns.iter().find(|c| c.id.eq_ignore_ascii_case("done")) {
        return &col.id;
    }
    columns.last().map(|c| c.id.as_str()).unwrap_or(NO_STATUS_ID)
}

/// Run one reconciliation pass. `columns` is the full display list, system
/// column first, as returned by [`crate::store::BoardStore::columns`].
/// `now` stamps every column transition into the age map. Returns whether
/// any map changed, so the caller can skip the commit on a no-op pass.
pub fn reconcile(
    data: &mut StoreData,
    items: &[BoardItem],
    columns: &[ColumnDef],
    now: i64,
) -> bool {
    let mut changed = false;

    for item in items {
        let key = item_key(item);

        let assigned = data.task_assignments.get(&key);
        let valid = assigned
            .and_then(|id| columns.iter().find(|c| &c.id == id))
            .is_some_and(|col| item.completed == col.completes_task);

        if !valid {
            let target = fallback_column(item.completed, columns).to_string();
            if data.task_assignments.get(&key) != Some(&target) {
                data.task_assignments.insert(key.clone(), target);
                data.task_moved_at.insert(key.clone(), now);
                changed = true;
            }
        }

        // Items first seen before the age map existed get stamped on sight.
        if !data.task_moved_at.contains_key(&key) {
            data.task_moved_at.insert(key, now);
            changed = true;
        }
    }

    // Garbage-collect keys the scan no longer observes.
    let seen: BTreeSet<String> = items.iter().map(item_key).collect();
    let before = data.task_assignments.len() + data.task_moved_at.len();
    data.task_assignments.retain(|key, _| seen.contains(key));
    data.task_moved_at.retain(|key, _| seen.contains(key));
    if data.task_assignments.len() + data.task_moved_at.len() != before {
        changed = true;
    }

    changed
}
