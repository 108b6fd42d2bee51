/// The board state store: durable column/assignment state plus the change
/// notification bus.
///
/// One explicitly constructed handle owns the whole state blob. All
/// operations are synchronous; the host serializes every triggering event
/// onto one logical thread, so there is no internal locking. Every
/// mutating call persists the full document: a notifying `save` for user
/// actions, a silent `save_silent` for the routine reconciliation pass.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::store::{order, reconcile, schema, StoreError};
use crate::store::schema::StoreData;
use crate::types::{no_status_column, ColumnDef, ColumnPatch, BoardItem, NO_STATUS_ID};

/// Handle returned by [`BoardStore::subscribe`]; pass it back to
/// [`BoardStore::unsubscribe`] to drop the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

pub struct BoardStore {
    file_path: PathBuf,
    data: StoreData,
    subscribers: BTreeMap<u64, Box<dyn Fn()>>,
    next_subscription: u64,
}

/// Current wall-clock time as epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Write to a sibling tmp file, fsync, rename over the target, fsync the
/// directory. A crash mid-write loses only the in-flight document.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let tmp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;

    if let Some(dir) = path.parent() {
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
    Ok(())
}

impl BoardStore {
    /// Open (or create) the store described by `config`. Runs the one-time
    /// legacy-directory migration, then loads the document; a missing or
    /// unparsable document yields defaults and never fails the open.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let store_dir = config.store_dir();
        fs::create_dir_all(&store_dir)?;
        let file_path = config.store_file();

        migrate_legacy_file(&config.legacy_store_file(), &file_path);

        let data = match fs::read_to_string(&file_path) {
            Ok(raw) => schema::parse_store(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => {
                log::warn!(
                    "[brainboard.store.load] Failed to read {:?}, using defaults: {}",
                    file_path,
                    e
                );
                StoreData::default()
            }
        };

        Ok(Self {
            file_path,
            data,
            subscribers: BTreeMap::new(),
            next_subscription: 1,
        })
    }

    /// Read access to the full state blob.
    pub fn data(&self) -> &StoreData {
        &self.data
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    // ── Change notification bus ────────────────────────────────────────

    pub fn subscribe(&mut self, callback: impl Fn() + 'static) -> Subscription {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.insert(id, Box::new(callback));
        Subscription(id)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscribers.remove(&subscription.0);
    }

    fn emit(&self) {
        for callback in self.subscribers.values() {
            callback();
        }
    }

    // ── Persistence writer ─────────────────────────────────────────────

    /// Persist the full document without notifying subscribers. Used by
    /// the reconciliation pass to avoid redraw churn.
    fn save_silent(&self) -> Result<(), StoreError> {
        let doc = schema::to_document(&self.data)?;
        atomic_write(&self.file_path, &doc)?;
        Ok(())
    }

    /// Persist, then notify. Subscribers never observe state that has not
    /// been durably written.
    fn save(&self) -> Result<(), StoreError> {
        self.save_silent()?;
        self.emit();
        Ok(())
    }

    // ── Column registry ────────────────────────────────────────────────

    /// All columns in display order: the synthetic system column first,
    /// then the persisted user columns.
    pub fn columns(&self) -> Vec<ColumnDef> {
        let mut cols = Vec::with_capacity(self.data.columns.len() + 1);
        cols.push(no_status_column());
        cols.extend(self.data.columns.iter().cloned());
        cols
    }

    /// Replace the user columns wholesale. Any entry carrying the reserved
    /// system id is silently dropped.
    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) -> Result<(), StoreError> {
        self.data.columns = columns
            .into_iter()
            .filter(|c| c.id != NO_STATUS_ID)
            .collect();
        self.save()
    }

    /// Append a user column. Adding the system column is a no-op.
    pub fn add_column(&mut self, column: ColumnDef) -> Result<(), StoreError> {
        if column.id == NO_STATUS_ID {
            return Ok(());
        }
        self.data.columns.push(column);
        self.save()
    }

    /// Merge `patch` into an existing user column. No-op for the system
    /// column or an unknown id.
    pub fn update_column(&mut self, column_id: &str, patch: ColumnPatch) -> Result<(), StoreError> {
        if column_id == NO_STATUS_ID {
            return Ok(());
        }
        let Some(col) = self.data.columns.iter_mut().find(|c| c.id == column_id) else {
            return Ok(());
        };
        if let Some(label) = patch.label {
            col.label = label;
        }
        if let Some(description) = patch.description {
            col.description = description;
        }
        if let Some(color) = patch.color {
            col.color = color;
        }
        if let Some(completes_task) = patch.completes_task {
            col.completes_task = completes_task;
        }
        self.save()
    }

    /// Remove a user column. The system column is untouchable, and the
    /// sole completion column may not be removed: completed tasks must
    /// always have somewhere to land.
    pub fn remove_column(&mut self, column_id: &str) -> Result<(), StoreError> {
        if column_id == NO_STATUS_ID {
            return Ok(());
        }
        let Some(idx) = self.data.columns.iter().position(|c| c.id == column_id) else {
            return Ok(());
        };
        if self.data.columns[idx].completes_task
            && self.data.columns.iter().filter(|c| c.completes_task).count() == 1
        {
            return Err(StoreError::LastCompletionColumn);
        }
        self.data.columns.remove(idx);
        self.save()
    }

    /// Move a user column to `display_index`, which is 1-based over the
    /// full display list (the system column pins position 0). No-op for
    /// the system column or when the position is unchanged.
    pub fn move_column(&mut self, column_id: &str, display_index: usize) -> Result<(), StoreError> {
        if column_id == NO_STATUS_ID {
            return Ok(());
        }
        let adjusted = display_index.saturating_sub(1);
        let Some(idx) = self.data.columns.iter().position(|c| c.id == column_id) else {
            return Ok(());
        };
        if idx == adjusted {
            return Ok(());
        }
        let col = self.data.columns.remove(idx);
        let insert_at = adjusted.min(self.data.columns.len());
        self.data.columns.insert(insert_at, col);
        self.save()
    }

    // ── Task assignments ───────────────────────────────────────────────

    pub fn task_column(&self, key: &str) -> Option<&str> {
        self.data.task_assignments.get(key).map(String::as_str)
    }

    /// Explicit user-driven assignment. Refreshes the age stamp when the
    /// column actually changes, and always commits through the notifying
    /// path.
    pub fn set_task_column(&mut self, key: &str, column_id: &str) -> Result<(), StoreError> {
        if self.task_column(key) != Some(column_id) {
            self.data
                .task_assignments
                .insert(key.to_string(), column_id.to_string());
            self.data.task_moved_at.insert(key.to_string(), now_millis());
        }
        self.save()
    }

    pub fn remove_task_assignment(&mut self, key: &str) -> Result<(), StoreError> {
        self.data.task_assignments.remove(key);
        self.data.task_moved_at.remove(key);
        self.save()
    }

    /// Time of the key's last column transition, as epoch millis.
    pub fn task_moved_at(&self, key: &str) -> Option<i64> {
        self.data.task_moved_at.get(key).copied()
    }

    /// Reconcile persisted assignments against a fresh scan. Commits
    /// silently, and only when the pass actually changed something, so a
    /// routine rescan with nothing new costs neither a write nor a redraw.
    pub fn sync_assignments(&mut self, items: &[BoardItem]) -> Result<(), StoreError> {
        let columns = self.columns();
        if reconcile::reconcile(&mut self.data, items, &columns, now_millis()) {
            self.save_silent()?;
        }
        Ok(())
    }

    // ── Card order ledger ──────────────────────────────────────────────

    pub fn card_order(&self, column_id: &str) -> Option<&[String]> {
        self.data.card_order.get(column_id).map(Vec::as_slice)
    }

    pub fn set_card_order(&mut self, column_id: &str, keys: Vec<String>) -> Result<(), StoreError> {
        self.data.card_order.insert(column_id.to_string(), keys);
        self.save()
    }

    /// Display order for a column given its current members: recorded keys
    /// still present first, then unrecorded members in scan order. Stale
    /// recorded keys are filtered here, never eagerly cleaned.
    pub fn ordered_keys(&self, column_id: &str, members: &[String]) -> Vec<String> {
        order::ordered(self.card_order(column_id), members)
    }

    /// Apply a user move of one card: reassign it to `to_column` and
    /// splice it into that column's order list at `dest_index` (clamped),
    /// in one notifying commit. The key is not scrubbed from other
    /// columns' lists; read-time filtering makes those entries invisible.
    pub fn move_item(
        &mut self,
        key: &str,
        to_column: &str,
        dest_index: usize,
    ) -> Result<(), StoreError> {
        if self.task_column(key) != Some(to_column) {
            self.data
                .task_assignments
                .insert(key.to_string(), to_column.to_string());
            self.data.task_moved_at.insert(key.to_string(), now_millis());
        }
        let list = self.data.card_order.entry(to_column.to_string()).or_default();
        list.retain(|k| k != key);
        let insert_at = dest_index.min(list.len());
        list.insert(insert_at, key.to_string());
        self.save()
    }

    /// Wipe everything back to defaults.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.data = StoreData::default();
        self.save()
    }
}

/// One-time migration from the pre-rename store directory: copy the old
/// document verbatim when the new location has none. Best-effort; a
/// failure is logged and never blocks startup.
fn migrate_legacy_file(legacy: &Path, current: &Path) {
    if !legacy.exists() || current.exists() {
        return;
    }
    match fs::copy(legacy, current) {
        Ok(_) => log::info!(
            "[brainboard.store.migrate] Migrated legacy store {:?} -> {:?}",
            legacy,
            current
        ),
        Err(e) => log::warn!(
            "[brainboard.store.migrate] Legacy store migration failed: {}",
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::types::{item_key, ItemKind};

    fn open_store(dir: &Path) -> BoardStore {
        BoardStore::open(&StoreConfig::new(dir)).unwrap()
    }

    fn col(id: &str, completes: bool) -> ColumnDef {
        ColumnDef {
            id: id.to_string(),
            label: id.to_string(),
            description: String::new(),
            color: "#ccc".to_string(),
            completes_task: completes,
        }
    }

    fn task(text: &str, completed: bool) -> BoardItem {
        BoardItem {
            kind: ItemKind::Task,
            text: text.to_string(),
            completed,
            file_path: "f.md".to_string(),
            line: Some(1),
            tags: Vec::new(),
            ctime: 0,
            mtime: 0,
        }
    }

    #[test]
    fn fresh_store_has_default_columns_with_system_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let cols = store.columns();
        assert_eq!(cols[0].id, NO_STATUS_ID);
        let ids: Vec<&str> = cols.iter().skip(1).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "doing", "done"]);
    }

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = open_store(dir.path());
            store.add_column(col("review", false)).unwrap();
            store.set_task_column("f.md::x", "review").unwrap();
            store
                .set_card_order("review", vec!["f.md::x".to_string()])
                .unwrap();
        }

        let store = open_store(dir.path());
        assert!(store.columns().iter().any(|c| c.id == "review"));
        assert_eq!(store.task_column("f.md::x"), Some("review"));
        assert_eq!(
            store.card_order("review"),
            Some(&["f.md::x".to_string()][..])
        );
        assert!(store.task_moved_at("f.md::x").is_some());
    }

    #[test]
    fn system_column_resists_every_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        store.add_column(no_status_column()).unwrap();
        store
            .update_column(
                NO_STATUS_ID,
                ColumnPatch {
                    label: Some("hacked".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        store.remove_column(NO_STATUS_ID).unwrap();
        store.move_column(NO_STATUS_ID, 3).unwrap();

        let cols = store.columns();
        assert_eq!(cols[0].id, NO_STATUS_ID);
        assert_eq!(cols[0].label, "No Status");
        assert_eq!(cols.iter().filter(|c| c.id == NO_STATUS_ID).count(), 1);
    }

    #[test]
    fn removing_sole_completion_column_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        let err = store.remove_column("done").unwrap_err();
        assert!(matches!(err, StoreError::LastCompletionColumn));
        assert!(store.columns().iter().any(|c| c.completes_task));

        // With a second completion column the removal goes through.
        store.add_column(col("archive", true)).unwrap();
        store.remove_column("done").unwrap();
        assert!(store.columns().iter().any(|c| c.completes_task));
    }

    #[test]
    fn update_column_merges_patch_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        store
            .update_column(
                "todo",
                ColumnPatch {
                    color: Some("#ff0000".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let cols = store.columns();
        let todo = cols.iter().find(|c| c.id == "todo").unwrap();
        assert_eq!(todo.color, "#ff0000");
        assert_eq!(todo.label, "Todo");
    }

    #[test]
    fn move_column_uses_one_based_display_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        // Display list is [no_status, todo, doing, done]; index 1 is the
        // first user slot.
        store.move_column("done", 1).unwrap();
        let ids: Vec<String> = store
            .columns()
            .iter()
            .skip(1)
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["done", "todo", "doing"]);

        // Index beyond the end clamps to the last slot.
        store.move_column("done", 99).unwrap();
        let ids: Vec<String> = store
            .columns()
            .iter()
            .skip(1)
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["todo", "doing", "done"]);
    }

    #[test]
    fn notifying_mutations_reach_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let sub = store.subscribe(move || c.set(c.get() + 1));

        store.set_task_column("f.md::x", "todo").unwrap();
        store.set_card_order("todo", vec!["f.md::x".to_string()]).unwrap();
        assert_eq!(count.get(), 2);

        store.unsubscribe(sub);
        store.set_task_column("f.md::x", "doing").unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn reconciliation_pass_commits_silently() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        store.subscribe(move || c.set(c.get() + 1));

        let items = [task("buy milk", false)];
        store.sync_assignments(&items).unwrap();
        assert_eq!(count.get(), 0);
        assert_eq!(store.task_column("f.md::buy milk"), Some(NO_STATUS_ID));

        // The silent commit still reached disk.
        let reopened = open_store(dir.path());
        assert_eq!(reopened.task_column("f.md::buy milk"), Some(NO_STATUS_ID));
    }

    #[test]
    fn sync_garbage_collects_vanished_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        store.set_task_column("gone.md::old", "todo").unwrap();
        store.sync_assignments(&[task("x", false)]).unwrap();

        assert_eq!(store.task_column("gone.md::old"), None);
        assert_eq!(store.task_moved_at("gone.md::old"), None);
    }

    #[test]
    fn move_item_splices_destination_and_leaves_source_stale() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        store
            .set_card_order("todo", vec!["k1".to_string(), "k2".to_string()])
            .unwrap();
        store.set_card_order("doing", vec!["k3".to_string()]).unwrap();

        store.move_item("k1", "doing", 1).unwrap();

        assert_eq!(store.task_column("k1"), Some("doing"));
        assert_eq!(
            store.card_order("doing"),
            Some(&["k3".to_string(), "k1".to_string()][..])
        );
        // The source list still names k1; read-time filtering hides it.
        assert_eq!(
            store.card_order("todo"),
            Some(&["k1".to_string(), "k2".to_string()][..])
        );
        let shown = store.ordered_keys("todo", &["k2".to_string()]);
        assert_eq!(shown, vec!["k2".to_string()]);
    }

    #[test]
    fn move_item_clamps_destination_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        store.move_item("k1", "doing", 42).unwrap();
        assert_eq!(store.card_order("doing"), Some(&["k1".to_string()][..]));
    }

    #[test]
    fn ordered_keys_follow_recorded_then_scan_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        store
            .set_card_order("todo", vec!["k2".to_string(), "k1".to_string()])
            .unwrap();
        let members = vec!["k1".to_string(), "k2".to_string(), "k3".to_string()];
        assert_eq!(
            store.ordered_keys("todo", &members),
            vec!["k2".to_string(), "k1".to_string(), "k3".to_string()]
        );
    }

    #[test]
    fn manual_move_then_external_completion_relocates_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());
        let item = task("ship it", false);
        let key = item_key(&item);

        store.sync_assignments(std::slice::from_ref(&item)).unwrap();
        store.move_item(&key, "doing", 0).unwrap();

        // Repeated rescans leave the manual placement alone.
        store.sync_assignments(std::slice::from_ref(&item)).unwrap();
        assert_eq!(store.task_column(&key), Some("doing"));

        // The checkbox gets ticked outside the board.
        let done = task("ship it", true);
        store.sync_assignments(std::slice::from_ref(&done)).unwrap();
        assert_eq!(store.task_column(&key), Some("done"));

        // And unticked again: the prior placement is not remembered.
        store.sync_assignments(std::slice::from_ref(&item)).unwrap();
        assert_eq!(store.task_column(&key), Some(NO_STATUS_ID));
    }

    #[test]
    fn legacy_store_file_is_copied_once() {
        let dir = tempfile::tempdir().unwrap();
        let legacy_dir = dir.path().join(".claude-board");
        fs::create_dir_all(&legacy_dir).unwrap();
        fs::write(
            legacy_dir.join("sessions.json"),
            r#"{"taskAssignments": {"a.md::x": "todo"}}"#,
        )
        .unwrap();

        let store = open_store(dir.path());
        assert_eq!(store.task_column("a.md::x"), Some("todo"));

        // A legacy file does not clobber an existing current store.
        fs::write(
            dir.path().join(".brain-board/sessions.json"),
            r#"{"taskAssignments": {"b.md::y": "doing"}}"#,
        )
        .unwrap();
        let store = open_store(dir.path());
        assert_eq!(store.task_column("b.md::y"), Some("doing"));
        assert_eq!(store.task_column("a.md::x"), None);
    }

    #[test]
    fn drag_to_done_then_rescan_agrees() {
        let vault = tempfile::tempdir().unwrap();
        fs::write(vault.path().join("tasks.md"), "- [ ] ship it\n").unwrap();
        let mut store = open_store(vault.path());

        let opts = crate::scanner::ScanOptions::default();
        let items = crate::scanner::scan_vault(vault.path(), &opts).unwrap();
        assert_eq!(items.len(), 1);
        let key = item_key(&items[0]);

        store.sync_assignments(&items).unwrap();
        assert_eq!(store.task_column(&key), Some(NO_STATUS_ID));

        // User drags the card to Done: the store commits the move, then
        // the mutator rewrites the source document to match.
        store.move_item(&key, "done", 0).unwrap();
        let done = store
            .columns()
            .into_iter()
            .find(|c| c.id == "done")
            .unwrap();
        crate::updater::apply_column(vault.path(), &items[0], &done, "board-status").unwrap();
        assert_eq!(
            fs::read_to_string(vault.path().join("tasks.md")).unwrap(),
            "- [x] ship it\n"
        );

        // The next scan observes the checked box; reconciliation keeps the
        // assignment where the user put it.
        let items = crate::scanner::scan_vault(vault.path(), &opts).unwrap();
        assert!(items[0].completed);
        assert_eq!(item_key(&items[0]), key);
        store.sync_assignments(&items).unwrap();
        assert_eq!(store.task_column(&key), Some("done"));
    }

    #[test]
    fn reset_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        store.add_column(col("extra", false)).unwrap();
        store.set_task_column("f.md::x", "extra").unwrap();
        store.reset().unwrap();

        assert_eq!(store.data(), &StoreData::default());
    }
}
