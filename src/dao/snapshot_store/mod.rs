pub mod file;
#[cfg(test)]
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::SessionSnapshot, storage::StorageResult};

pub use self::file::FileSnapshotStore;
#[cfg(test)]
pub use self::memory::MemorySnapshotStore;

/// Abstraction over where session checkpoints live.
pub trait SnapshotStore: Send + Sync {
    /// Replace the snapshot of `snapshot.chat_id`. A failed write never leaves
    /// a partial snapshot behind.
    fn save(&self, snapshot: SessionSnapshot) -> BoxFuture<'static, StorageResult<()>>;
    /// Forget the snapshot of `chat_id`; a missing snapshot is not an error.
    fn remove(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<()>>;
    /// Every readable snapshot. Malformed entries are logged and skipped.
    fn load_all(&self) -> BoxFuture<'static, StorageResult<Vec<SessionSnapshot>>>;
}
