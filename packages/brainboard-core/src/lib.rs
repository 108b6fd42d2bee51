/// Core of the Brain Board kanban overlay: a durable column/assignment
/// store reconciled against externally scanned markdown items.
///
/// The host (plugin, desktop shell) owns rendering and event wiring; this
/// crate owns the board state (persisted columns, per-item assignments,
/// card ordering, age stamps) plus the scanner and document updater the
/// board feeds from and writes back through.

pub mod config;
pub mod issues;
pub mod scanner;
pub mod store;
pub mod types;
pub mod updater;

pub use config::StoreConfig;
pub use issues::IssueStore;
pub use store::{BoardStore, StoreData, StoreError, Subscription};
pub use types::{
    default_columns, item_key, no_status_column, BoardItem, ColumnDef, ColumnPatch, ItemKind,
    NO_STATUS_ID,
};
