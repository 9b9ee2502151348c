//! Snapshot store keeping one JSON file per chat in a directory.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};

use crate::dao::{
    models::{ScoreEntity, SessionSnapshot},
    snapshot_store::SnapshotStore,
    storage::{StorageError, StorageResult},
};

const FILE_PREFIX: &str = "s_";
const FILE_SUFFIX: &str = ".json";
const TMP_SUFFIX: &str = ".tmp";

/// Stores `s_<chat_id>.json` files under a single directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: Arc<Path>,
}

impl FileSnapshotStore {
    /// Store rooted at `root`; the directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        Self {
            root: Arc::from(root),
        }
    }

    /// Directory holding the snapshot files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot file for `chat_id`.
    pub fn snapshot_path(&self, chat_id: i64) -> PathBuf {
        self.root.join(format!("{FILE_PREFIX}{chat_id}{FILE_SUFFIX}"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: SessionSnapshot) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_snapshot(&snapshot).await })
    }

    fn remove(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.snapshot_path(chat_id);
        Box::pin(async move { remove_if_exists(&path).await })
    }

    fn load_all(&self) -> BoxFuture<'static, StorageResult<Vec<SessionSnapshot>>> {
        let store = self.clone();
        Box::pin(async move { store.scan().await })
    }
}

impl FileSnapshotStore {
    async fn write_snapshot(&self, snapshot: &SessionSnapshot) -> StorageResult<()> {
        let chat_id = snapshot.chat_id;
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|source| StorageError::Encode { chat_id, source })?;

        fs::create_dir_all(&self.root).await.map_err(|err| {
            StorageError::unavailable(
                format!("creating snapshot directory `{}`", self.root.display()),
                err,
            )
        })?;

        let path = self.snapshot_path(chat_id);
        let tmp_path = path.with_extension(format!("json{TMP_SUFFIX}"));

        let outcome = match write_fully(&tmp_path, &bytes).await {
            Ok(()) => fs::rename(&tmp_path, &path).await.map_err(|err| {
                StorageError::unavailable(format!("replacing `{}`", path.display()), err)
            }),
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            // Neither the partial file nor the previous checkpoint may be
            // picked up by the next recovery scan.
            for artifact in [&tmp_path, &path] {
                if let Err(cleanup) = remove_if_exists(artifact).await {
                    warn!(path = %artifact.display(), error = %cleanup, "failed to remove snapshot artifact");
                }
            }
            return Err(err);
        }

        debug!(chat_id, path = %path.display(), "session checkpoint written");
        Ok(())
    }

    async fn scan(&self) -> StorageResult<Vec<SessionSnapshot>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.root.display(), "snapshot directory missing; nothing to recover");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(StorageError::unavailable(
                    format!("reading snapshot directory `{}`", self.root.display()),
                    err,
                ));
            }
        };

        let mut snapshots = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to read snapshot directory entry; stopping scan");
                    break;
                }
            };

            let path = entry.path();
            if !is_snapshot_file(&path) {
                continue;
            }

            let contents = match fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to read snapshot; skipping");
                    continue;
                }
            };

            match parse_snapshot(&path, &contents) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => warn!(error = %err, "skipping malformed snapshot"),
            }
        }

        snapshots.sort_by_key(|snapshot| snapshot.chat_id);
        Ok(snapshots)
    }
}

async fn write_fully(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let io_error = |err: std::io::Error| {
        StorageError::unavailable(format!("writing `{}`", path.display()), err)
    };

    let mut file = fs::File::create(path).await.map_err(io_error)?;
    let mut written = 0;
    while written < bytes.len() {
        match file.write(&bytes[written..]).await {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error(err)),
        }
    }

    if written != bytes.len() {
        return Err(StorageError::ShortWrite {
            path: path.to_path_buf(),
            written,
            expected: bytes.len(),
        });
    }

    file.sync_all().await.map_err(io_error)
}

async fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StorageError::unavailable(
            format!("removing `{}`", path.display()),
            err,
        )),
    }
}

fn is_snapshot_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
}

/// Snapshot document as found on disk; score rows are validated one by one.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    chat_id: i64,
    deck_name: String,
    scores: Vec<serde_json::Value>,
}

/// Parse a snapshot file. Malformed score rows are dropped individually;
/// a malformed envelope rejects the whole file.
fn parse_snapshot(path: &Path, contents: &str) -> StorageResult<SessionSnapshot> {
    let raw: RawSnapshot =
        serde_json::from_str(contents).map_err(|source| StorageError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let scores = raw
        .scores
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ScoreEntity>(value) {
            Ok(score) => Some(score),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    chat_id = raw.chat_id,
                    error = %err,
                    "dropping malformed score entry"
                );
                None
            }
        })
        .collect();

    Ok(SessionSnapshot {
        chat_id: raw.chat_id,
        deck_name: raw.deck_name,
        scores,
    })
}
