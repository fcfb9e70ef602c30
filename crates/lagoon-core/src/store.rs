//! Durable session store backed by a single JSON store file.
//!
//! The entire persisted state is one map of `SessionId` to message list,
//! rewritten atomically (temp file + rename) on every append. The store file
//! is owned exclusively by this module.

use crate::types::{Message, SessionId, Transcript};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

/// Errors returned by the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the store file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Encoding the store file failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The blocking writer task was cancelled or panicked.
    #[error("store writer task failed: {0}")]
    WriterTask(String),
}

/// Session storage with per-id append serialization.
///
/// `load` never fails: unknown ids and a corrupt store file both degrade to
/// an empty transcript. `append` serializes writers per session id while
/// appends on distinct ids proceed in parallel.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// Location of the store file.
    path: PathBuf,
    /// In-memory view of the persisted map.
    sessions: RwLock<HashMap<SessionId, Transcript>>,
    /// Per-session append locks, created lazily.
    append_locks: Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
    /// Serializes rewrites of the store file across sessions.
    file_lock: AsyncMutex<()>,
}

impl SessionStore {
    /// Open the store at the given path, creating parent directories.
    ///
    /// A missing, unreadable, or corrupt store file is non-fatal: history is
    /// best-effort context, so the store starts empty instead of failing
    /// requests.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let sessions = read_store_file(&path);
        info!(
            "opened session store (path={}, sessions={})",
            path.display(),
            sessions.len()
        );
        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                sessions: RwLock::new(sessions),
                append_locks: Mutex::new(HashMap::new()),
                file_lock: AsyncMutex::new(()),
            }),
        })
    }

    /// Return the persisted transcript for `id`, empty when unknown.
    pub fn load(&self, id: SessionId) -> Transcript {
        self.inner
            .sessions
            .read()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of sessions currently held.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.read().len()
    }

    /// Merge `new_messages` onto the end of the stored transcript for `id`,
    /// creating the session record if absent, and durably commit the result.
    ///
    /// Appends for one id are serialized; a write failure is surfaced to the
    /// caller, but the in-memory transcript keeps the appended messages so
    /// the running process still serves them as context.
    pub async fn append(
        &self,
        id: SessionId,
        new_messages: Vec<Message>,
    ) -> Result<(), StoreError> {
        if new_messages.is_empty() {
            return Ok(());
        }
        let lock = self.append_lock(id);
        let _guard = lock.lock().await;

        debug!(
            "appending messages (session_id={}, count={})",
            id,
            new_messages.len()
        );
        {
            let mut sessions = self.inner.sessions.write();
            sessions.entry(id).or_default().extend(new_messages);
        }
        self.persist().await
    }

    /// Fetch or create the append lock for a session id.
    fn append_lock(&self, id: SessionId) -> Arc<AsyncMutex<()>> {
        self.inner
            .append_locks
            .lock()
            .entry(id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Write the current map to disk atomically.
    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.inner.file_lock.lock().await;
        let snapshot = self.inner.sessions.read().clone();
        let path = self.inner.path.clone();
        tokio::task::spawn_blocking(move || write_store_file(&path, &snapshot))
            .await
            .map_err(|err| StoreError::WriterTask(err.to_string()))?
    }
}

/// Read the store file, degrading to an empty map on any failure.
fn read_store_file(path: &Path) -> HashMap<SessionId, Transcript> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no store file yet (path={})", path.display());
            return HashMap::new();
        }
        Err(err) => {
            warn!(
                "store file unreadable, starting empty (path={}, error={})",
                path.display(),
                err
            );
            return HashMap::new();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(sessions) => sessions,
        Err(err) => {
            warn!(
                "store file corrupt, starting empty (path={}, error={})",
                path.display(),
                err
            );
            HashMap::new()
        }
    }
}

/// Serialize the map to a temp file, fsync, and rename over the store file.
fn write_store_file(
    path: &Path,
    sessions: &HashMap<SessionId, Transcript>,
) -> Result<(), StoreError> {
    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;
        let bytes = serde_json::to_vec_pretty(sessions)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}
