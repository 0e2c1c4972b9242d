use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::MatchStore;
use crate::error::{SyncError, SyncResult};
use crate::models::{MatchRecord, MatchStatus};

/// A record as kept on disk, stamped with when it was first synced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMatch {
    #[serde(flatten)]
    pub record: MatchRecord,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    records: Vec<StoredMatch>,
    saved_at: DateTime<Utc>,
}

impl StoreFile {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            saved_at: Utc::now(),
        }
    }
}

fn persistence_error(action: &str, path: &Path, e: impl std::fmt::Display) -> SyncError {
    SyncError::PersistenceError(format!("Failed to {} {}: {}", action, path.display(), e))
}

/// Durable store backed by one JSON file. Reads are served from memory; every
/// write rewrites the file through a temp file and rename.
pub struct JsonMatchStore {
    path: PathBuf,
    state: Mutex<StoreFile>,
}

impl JsonMatchStore {
    /// Open the store at `path`, creating the file (and its directory) if absent.
    pub async fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| persistence_error("create", parent, e))?;
        }

        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| persistence_error("parse", &path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Creating match store");
                let empty = StoreFile::empty();
                Self::write_file(&path, &empty).await?;
                empty
            }
            Err(e) => return Err(persistence_error("read", &path, e)),
        };

        debug!(path = %path.display(), records = state.records.len(), "Match store opened");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_file(path: &Path, file: &StoreFile) -> SyncResult<()> {
        let contents = serde_json::to_string_pretty(file)
            .map_err(|e| persistence_error("serialize", path, e))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| persistence_error("write", &tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| persistence_error("replace", path, e))?;
        Ok(())
    }

    /// Commit `next` to disk, then adopt it. On failure memory is left untouched.
    async fn commit(&self, state: &mut StoreFile, mut next: StoreFile) -> SyncResult<()> {
        next.saved_at = Utc::now();
        if let Err(e) = Self::write_file(&self.path, &next).await {
            warn!(error = %e, "Match store write failed");
            return Err(e);
        }
        *state = next;
        Ok(())
    }

    /// When the store was last written.
    pub async fn saved_at(&self) -> DateTime<Utc> {
        self.state.lock().await.saved_at
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MatchStore for JsonMatchStore {
    async fn exists(&self, id: &str) -> SyncResult<bool> {
        let state = self.state.lock().await;
        Ok(state.records.iter().any(|m| m.record.id == id))
    }

    async fn insert(&self, record: &MatchRecord) -> SyncResult<bool> {
        let mut state = self.state.lock().await;
        if state.records.iter().any(|m| m.record.id == record.id) {
            debug!(id = %record.id, "Match already stored, skipping insert");
            return Ok(false);
        }

        let mut next = state.clone();
        next.records.push(StoredMatch {
            record: record.clone(),
            synced_at: Utc::now(),
        });
        self.commit(&mut state, next).await?;
        debug!(id = %record.id, "Stored match");
        Ok(true)
    }

    async fn fetch_all(&self) -> SyncResult<Vec<MatchRecord>> {
        let state = self.state.lock().await;
        Ok(state.records.iter().map(|m| m.record.clone()).collect())
    }

    async fn update(&self, id: &str, status: MatchStatus) -> SyncResult<usize> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let mut updated = 0;
        for stored in next.records.iter_mut().filter(|m| m.record.id == id) {
            stored.record.status = status;
            updated += 1;
        }

        if updated == 0 {
            debug!(id = id, "No stored match to update");
            return Ok(0);
        }

        self.commit(&mut state, next).await?;
        debug!(id = id, %status, "Updated match status");
        Ok(updated)
    }
}
