pub mod board_store;
pub mod order;
pub mod reconcile;
pub mod schema;

pub use board_store::{BoardStore, Subscription};
pub use schema::StoreData;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Removing the only column with `completes_task` would leave completed
    /// tasks with no home, so the removal is refused.
    #[error("cannot remove the last completion column")]
    LastCompletionColumn,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
