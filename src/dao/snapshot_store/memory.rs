use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use crate::dao::{
    models::SessionSnapshot, snapshot_store::SnapshotStore, storage::StorageResult,
};

/// Volatile store backing session tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshots: Arc<DashMap<i64, SessionSnapshot>>,
}

impl MemorySnapshotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot of `chat_id`, if any.
    pub fn get(&self, chat_id: i64) -> Option<SessionSnapshot> {
        self.snapshots.get(&chat_id).map(|entry| entry.value().clone())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: SessionSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        self.snapshots.insert(snapshot.chat_id, snapshot);
        Box::pin(future::ready(Ok(())))
    }

    fn remove(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<()>> {
        self.snapshots.remove(&chat_id);
        Box::pin(future::ready(Ok(())))
    }

    fn load_all(&self) -> BoxFuture<'static, StorageResult<Vec<SessionSnapshot>>> {
        let mut snapshots = self
            .snapshots
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        snapshots.sort_by_key(|snapshot| snapshot.chat_id);
        Box::pin(future::ready(Ok(snapshots)))
    }
}
