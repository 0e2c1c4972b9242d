//! Remote/local reconciliation for match pages.
//!
//! `SyncOrchestrator` decides per call whether to hit the remote source or the
//! local store. While online every fetched record is written through to the
//! store on first sight. While offline the stored snapshot is substituted
//! exactly once per browsing session; later offline calls fail with
//! `NoInternetConnection` until `reset_fallback` is called.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::MatchSource;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::models::{MatchRecord, MatchStatus};
use crate::store::MatchStore;

pub struct SyncOrchestrator {
    source: Arc<dyn MatchSource>,
    store: Arc<dyn MatchStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    fallback_consumed: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn MatchSource>,
        store: Arc<dyn MatchStore>,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        Self {
            source,
            store,
            connectivity,
            fallback_consumed: AtomicBool::new(false),
        }
    }

    pub fn connectivity(&self) -> Arc<dyn ConnectivityMonitor> {
        Arc::clone(&self.connectivity)
    }

    /// Whether the offline substitution has already been handed out.
    pub fn fallback_consumed(&self) -> bool {
        self.fallback_consumed.load(Ordering::SeqCst)
    }

    /// Allow one more offline substitution. Called on every explicit refresh.
    pub fn reset_fallback(&self) {
        self.fallback_consumed.store(false, Ordering::SeqCst);
    }

    /// Fetch one page of matches, from the remote source when online or from
    /// the local snapshot (once) when offline.
    pub async fn fetch_matches(&self, page: u32, page_size: u32) -> SyncResult<Vec<MatchRecord>> {
        if !self.connectivity.is_connected() {
            if !self.fallback_consumed.swap(true, Ordering::SeqCst) {
                info!(page = page, "Offline, serving stored matches");
                return self.load_local().await;
            }
            debug!(page = page, "Offline and stored matches already served");
            return Err(SyncError::NoInternetConnection);
        }

        let mut records = self.source.fetch_page(page, page_size).await.map_err(|e| {
            warn!(page = page, error = %e, "Remote fetch failed");
            e
        })?;

        self.write_through(&mut records).await?;
        debug!(page = page, count = records.len(), "Fetched matches");
        Ok(records)
    }

    /// Persist records not yet stored. Records already stored keep their stored
    /// status, and the returned copies are patched to show it.
    async fn write_through(&self, records: &mut [MatchRecord]) -> SyncResult<()> {
        let mut existing = Vec::new();
        let mut inserted = 0usize;

        for (idx, record) in records.iter().enumerate() {
            if self.store.exists(&record.id).await? {
                existing.push(idx);
                continue;
            }
            let stored = self.store.insert(record).await.map_err(|e| {
                warn!(id = %record.id, error = %e, "Failed to store match");
                e
            })?;
            if stored {
                inserted += 1;
            } else {
                // A concurrent fetch stored it between the check and the insert
                existing.push(idx);
            }
        }

        if !existing.is_empty() {
            let stored: HashMap<String, MatchStatus> = self
                .store
                .fetch_all()
                .await?
                .into_iter()
                .map(|r| (r.id, r.status))
                .collect();
            for idx in existing {
                if let Some(status) = stored.get(&records[idx].id) {
                    records[idx].status = *status;
                }
            }
        }

        debug!(inserted = inserted, total = records.len(), "Write-through complete");
        Ok(())
    }

    /// Everything in the local store, or `NoResults` if it is empty.
    pub async fn load_local(&self) -> SyncResult<Vec<MatchRecord>> {
        let records = self.store.fetch_all().await?;
        if records.is_empty() {
            debug!("Local store is empty");
            return Err(SyncError::NoResults);
        }
        Ok(records)
    }

    /// Record the user's decision on a match.
    pub async fn update_status(&self, id: &str, status: MatchStatus) -> SyncResult<usize> {
        self.store.update(id, status).await
    }
}
