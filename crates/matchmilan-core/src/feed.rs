//! Incremental loading state for a list of matches.
//!
//! `MatchFeed` owns the page cursor and the loaded records. Fetches run as
//! spawned Tokio tasks; their results come back over an MPSC channel and are
//! applied on the caller's side by `check_background_tasks` (or awaited with
//! `wait_for_load`), so `SyncState` is only ever mutated by the feed's owner.
//! Connectivity changes are forwarded through the same channel.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::models::{MatchRecord, MatchStatus};
use crate::sync::SyncOrchestrator;

// ============================================================================
// Constants
// ============================================================================

/// Records requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Buffer size for the background result channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Observable state of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    /// Next page to request (1-based).
    pub current_page: u32,
    pub is_loading: bool,
    pub can_load_more: bool,
    pub last_error: Option<SyncError>,
    /// Records in arrival order.
    pub records: Vec<MatchRecord>,
    pub is_online: bool,
}

impl SyncState {
    fn new(is_online: bool) -> Self {
        Self {
            current_page: 1,
            is_loading: false,
            can_load_more: true,
            last_error: None,
            records: Vec::new(),
            is_online,
        }
    }

    /// Message for the last failure, if any.
    pub fn error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    Append,
    Replace,
}

/// Messages sent from background tasks back to the feed.
enum FeedEvent {
    /// A page fetch finished. `generation` identifies the refresh cycle it
    /// was started in.
    Loaded {
        generation: u64,
        mode: LoadMode,
        result: SyncResult<Vec<MatchRecord>>,
    },
    /// Reachability changed
    Connectivity(bool),
}

pub struct MatchFeed {
    sync: Arc<SyncOrchestrator>,
    page_size: u32,
    state: SyncState,
    generation: u64,
    events_tx: mpsc::Sender<FeedEvent>,
    events_rx: mpsc::Receiver<FeedEvent>,
    /// Task for the load currently reported by `is_loading`
    load_task: Option<JoinHandle<()>>,
    connectivity_task: Option<JoinHandle<()>>,
}

/// What woke `wait_for_load`.
enum Wake {
    Event(Option<FeedEvent>),
    TaskEnded(Result<(), JoinError>),
}

impl MatchFeed {
    pub fn new(sync: Arc<SyncOrchestrator>, page_size: u32) -> Self {
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let is_online = sync.connectivity().is_connected();
        Self {
            sync,
            page_size: page_size.max(1),
            state: SyncState::new(is_online),
            generation: 0,
            events_tx,
            events_rx,
            load_task: None,
            connectivity_task: None,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.state.records
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn can_load_more(&self) -> bool {
        self.state.can_load_more
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.error_message()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Request the next page. Dropped (returns `false`) while a load is in
    /// flight or once the end of the data has been reached.
    pub fn load_more(&mut self) -> bool {
        if self.state.is_loading {
            debug!("Load already in flight, ignoring load_more");
            return false;
        }
        if !self.state.can_load_more {
            debug!("No more pages to load");
            return false;
        }
        self.start_load(LoadMode::Append);
        true
    }

    /// Start over from page 1. Supersedes any load in flight; its result will
    /// be discarded when it arrives.
    pub fn refresh(&mut self) {
        info!("Refreshing matches");
        self.generation += 1;
        self.state.current_page = 1;
        self.state.can_load_more = true;
        self.state.last_error = None;
        self.state.records.clear();
        self.sync.reset_fallback();
        self.start_load(LoadMode::Replace);
    }

    fn start_load(&mut self, mode: LoadMode) {
        self.state.is_loading = true;

        let sync = Arc::clone(&self.sync);
        let tx = self.events_tx.clone();
        let generation = self.generation;
        let page = self.state.current_page;
        let page_size = self.page_size;
        debug!(page = page, generation = generation, ?mode, "Starting load");

        // A superseded task keeps running detached; its result is discarded
        self.load_task = Some(tokio::spawn(async move {
            let result = sync.fetch_matches(page, page_size).await;
            Self::send_event(&tx, FeedEvent::Loaded { generation, mode, result }).await;
        }));
    }

    /// Helper to send events, logging any channel errors
    async fn send_event(tx: &mpsc::Sender<FeedEvent>, event: FeedEvent) {
        if tx.send(event).await.is_err() {
            error!("Failed to send feed event - channel closed");
        }
    }

    /// Forward connectivity changes into the feed. Calling again restarts the
    /// subscription.
    pub fn watch_connectivity(&mut self) {
        if let Some(task) = self.connectivity_task.take() {
            task.abort();
        }

        let mut changes = self.sync.connectivity().subscribe();
        let tx = self.events_tx.clone();
        self.connectivity_task = Some(tokio::spawn(async move {
            while let Some(connected) = changes.next().await {
                if tx.send(FeedEvent::Connectivity(connected)).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Apply every result that has arrived so far. Returns how many events
    /// were processed.
    pub fn check_background_tasks(&mut self) -> usize {
        let mut processed = self.drain_events();
        if self.state.is_loading && self.load_task.as_ref().is_some_and(|t| t.is_finished()) {
            // Finished tasks have already queued their result, if they had one
            processed += self.drain_events();
            if self.state.is_loading {
                self.load_task = None;
                self.abandon_load(None);
            }
        }
        processed
    }

    fn drain_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            processed += 1;
        }
        processed
    }

    /// Wait until the current load (if any) has been applied.
    pub async fn wait_for_load(&mut self) {
        while self.state.is_loading {
            let wake = match self.load_task.as_mut() {
                Some(task) => tokio::select! {
                    event = self.events_rx.recv() => Wake::Event(event),
                    joined = task => Wake::TaskEnded(joined),
                },
                None => Wake::Event(self.events_rx.recv().await),
            };

            match wake {
                Wake::Event(Some(event)) => self.apply(event),
                Wake::Event(None) => break,
                Wake::TaskEnded(joined) => {
                    self.load_task = None;
                    self.drain_events();
                    if self.state.is_loading {
                        self.abandon_load(joined.err());
                    }
                }
            }
        }
    }

    /// The load task ended without reporting a result.
    fn abandon_load(&mut self, cause: Option<JoinError>) {
        let reason = match cause {
            Some(e) if e.is_panic() => "load task panicked".to_string(),
            Some(e) => e.to_string(),
            None => "load task ended without a result".to_string(),
        };
        error!(reason = %reason, page = self.state.current_page, "Load lost");
        self.state.is_loading = false;
        self.state.last_error = Some(SyncError::Unknown(reason));
    }

    fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connectivity(connected) => {
                if self.state.is_online != connected {
                    info!(connected = connected, "Feed connectivity changed");
                }
                self.state.is_online = connected;
            }
            FeedEvent::Loaded { generation, .. } if generation != self.generation => {
                debug!(
                    generation = generation,
                    current = self.generation,
                    "Discarding stale load result"
                );
            }
            FeedEvent::Loaded { mode, result, .. } => {
                self.state.is_loading = false;
                match result {
                    Ok(records) => self.apply_page(mode, records),
                    Err(e) => self.apply_error(e),
                }
            }
        }
    }

    fn apply_page(&mut self, mode: LoadMode, records: Vec<MatchRecord>) {
        let count = records.len();
        match mode {
            LoadMode::Replace => self.state.records = records,
            LoadMode::Append => self.state.records.extend(records),
        }

        self.state.can_load_more = count >= self.page_size as usize;
        if self.state.can_load_more {
            self.state.current_page += 1;
        }
        self.state.last_error = None;
        debug!(
            count = count,
            total = self.state.records.len(),
            next_page = self.state.current_page,
            can_load_more = self.state.can_load_more,
            "Page applied"
        );
    }

    fn apply_error(&mut self, e: SyncError) {
        warn!(error = %e, page = self.state.current_page, "Load failed");
        if e == SyncError::NoResults {
            self.state.can_load_more = false;
        }
        self.state.last_error = Some(e);
    }

    /// Record a decision on a match, both in the store and in the loaded list.
    pub async fn update_status(&mut self, id: &str, status: MatchStatus) -> SyncResult<usize> {
        let updated = self.sync.update_status(id, status).await?;
        for record in self.state.records.iter_mut().filter(|r| r.id == id) {
            record.status = status;
        }
        Ok(updated)
    }
}

impl Drop for MatchFeed {
    fn drop(&mut self) {
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
        if let Some(task) = self.connectivity_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::MatchSource;
    use crate::connectivity::ManualConnectivity;
    use crate::testing::{records, FakeSource, MemoryStore};
    use async_trait::async_trait;

    struct PanickingSource;

    #[async_trait]
    impl MatchSource for PanickingSource {
        async fn fetch_page(&self, _page: u32, _page_size: u32) -> SyncResult<Vec<MatchRecord>> {
            panic!("source blew up");
        }
    }

    struct Harness {
        feed: MatchFeed,
        source: Arc<FakeSource>,
        store: Arc<MemoryStore>,
        connectivity: Arc<ManualConnectivity>,
    }

    fn harness(source: FakeSource, store: MemoryStore, online: bool, page_size: u32) -> Harness {
        let source = Arc::new(source);
        let store = Arc::new(store);
        let connectivity = Arc::new(ManualConnectivity::new(online));
        let sync = Arc::new(SyncOrchestrator::new(
            source.clone(),
            store.clone(),
            connectivity.clone(),
        ));
        Harness {
            feed: MatchFeed::new(sync, page_size),
            source,
            store,
            connectivity,
        }
    }

    #[tokio::test]
    async fn test_first_page_online() {
        let mut h = harness(
            FakeSource::with_pages(vec![Ok(records("p1", 10))]),
            MemoryStore::default(),
            true,
            10,
        );

        assert!(h.feed.load_more());
        assert!(h.feed.is_loading());
        h.feed.wait_for_load().await;

        let state = h.feed.state();
        assert_eq!(state.records.len(), 10);
        assert_eq!(state.current_page, 2);
        assert!(state.can_load_more);
        assert!(!state.is_loading);
        assert!(state.last_error.is_none());
        assert_eq!(h.store.len(), 10);
    }

    #[tokio::test]
    async fn test_short_page_ends_pagination() {
        let mut h = harness(
            FakeSource::with_pages(vec![Ok(records("p1", 10)), Ok(records("p2", 4))]),
            MemoryStore::default(),
            true,
            10,
        );

        h.feed.load_more();
        h.feed.wait_for_load().await;
        h.feed.load_more();
        h.feed.wait_for_load().await;

        assert_eq!(h.feed.records().len(), 14);
        assert!(!h.feed.can_load_more());
        assert_eq!(h.feed.state().current_page, 2);
        assert!(!h.feed.load_more());
        assert_eq!(h.source.calls(), vec![(1, 10), (2, 10)]);
    }

    #[tokio::test]
    async fn test_double_trigger_is_dropped() {
        let mut h = harness(
            FakeSource::with_pages(vec![Ok(records("p1", 10))]),
            MemoryStore::default(),
            true,
            10,
        );

        assert!(h.feed.load_more());
        assert!(!h.feed.load_more());
        h.feed.wait_for_load().await;

        assert_eq!(h.source.calls().len(), 1);
        assert_eq!(h.feed.records().len(), 10);
    }

    #[tokio::test]
    async fn test_offline_fallback_once() {
        let mut h = harness(
            FakeSource::default(),
            MemoryStore::seeded(records("cached", 10)),
            false,
            10,
        );

        h.feed.load_more();
        h.feed.wait_for_load().await;
        assert_eq!(h.feed.records().len(), 10);
        assert!(h.feed.state().last_error.is_none());

        for _ in 0..3 {
            assert!(h.feed.load_more());
            h.feed.wait_for_load().await;
            assert_eq!(
                h.feed.state().last_error,
                Some(SyncError::NoInternetConnection)
            );
            // Retry stays possible
            assert!(h.feed.can_load_more());
        }
        assert_eq!(h.feed.records().len(), 10);
        assert!(h.source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_offline_empty_store() {
        let mut h = harness(FakeSource::default(), MemoryStore::default(), false, 10);

        h.feed.load_more();
        h.feed.wait_for_load().await;

        assert_eq!(h.feed.state().last_error, Some(SyncError::NoResults));
        assert!(!h.feed.can_load_more());
        assert!(h.feed.error_message().is_some());
        assert!(!h.feed.load_more());
    }

    #[tokio::test]
    async fn test_refresh_replaces_records() {
        let mut h = harness(
            FakeSource::with_pages(vec![
                Ok(records("p1", 5)),
                Ok(records("p2", 5)),
                Ok(records("fresh", 5)),
            ]),
            MemoryStore::default(),
            true,
            5,
        );

        h.feed.load_more();
        h.feed.wait_for_load().await;
        h.feed.load_more();
        h.feed.wait_for_load().await;
        assert_eq!(h.feed.records().len(), 10);
        assert_eq!(h.feed.state().current_page, 3);

        h.feed.refresh();
        h.feed.wait_for_load().await;

        let ids: Vec<_> = h.feed.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh-0", "fresh-1", "fresh-2", "fresh-3", "fresh-4"]);
        assert_eq!(h.feed.state().current_page, 2);
        assert_eq!(h.source.calls().last(), Some(&(1, 5)));
    }

    #[tokio::test]
    async fn test_refresh_rearms_offline_fallback() {
        let mut h = harness(
            FakeSource::default(),
            MemoryStore::seeded(records("cached", 10)),
            false,
            10,
        );

        h.feed.load_more();
        h.feed.wait_for_load().await;
        h.feed.load_more();
        h.feed.wait_for_load().await;
        assert_eq!(h.feed.state().last_error, Some(SyncError::NoInternetConnection));

        h.feed.refresh();
        h.feed.wait_for_load().await;
        assert!(h.feed.state().last_error.is_none());
        assert_eq!(h.feed.records().len(), 10);
    }

    #[tokio::test]
    async fn test_error_keeps_page_and_allows_retry() {
        let mut h = harness(
            FakeSource::with_pages(vec![Err(SyncError::StatusCode(500)), Ok(records("p1", 10))]),
            MemoryStore::default(),
            true,
            10,
        );

        h.feed.load_more();
        h.feed.wait_for_load().await;
        assert_eq!(h.feed.state().last_error, Some(SyncError::StatusCode(500)));
        assert!(h.feed.can_load_more());
        assert_eq!(h.feed.state().current_page, 1);

        h.feed.load_more();
        h.feed.wait_for_load().await;
        assert!(h.feed.state().last_error.is_none());
        assert_eq!(h.feed.records().len(), 10);
        assert_eq!(h.source.calls(), vec![(1, 10), (1, 10)]);
    }

    #[tokio::test]
    async fn test_stale_result_after_refresh_is_discarded() {
        let mut h = harness(
            FakeSource::with_pages(vec![Ok(records("stale", 10)), Ok(records("fresh", 10))])
                .with_delays(vec![Duration::from_millis(200)]),
            MemoryStore::default(),
            true,
            10,
        );

        h.feed.load_more();
        // Let the first fetch start before superseding it
        tokio::task::yield_now().await;
        h.feed.refresh();
        h.feed.wait_for_load().await;
        assert!(h.feed.records().iter().all(|r| r.id.starts_with("fresh")));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(h.feed.check_background_tasks(), 1);
        assert!(h.feed.records().iter().all(|r| r.id.starts_with("fresh")));
        assert_eq!(h.feed.records().len(), 10);
        assert!(!h.feed.is_loading());
    }

    #[tokio::test]
    async fn test_update_status_patches_loaded_records() {
        let mut h = harness(
            FakeSource::with_pages(vec![Ok(records("p1", 3))]),
            MemoryStore::default(),
            true,
            10,
        );
        h.feed.load_more();
        h.feed.wait_for_load().await;

        let updated = h.feed.update_status("p1-1", MatchStatus::Accepted).await.unwrap();
        assert_eq!(updated, 1);
        assert_eq!(h.feed.records()[1].status, MatchStatus::Accepted);
        assert_eq!(h.store.status_of("p1-1"), Some(MatchStatus::Accepted));

        let missing = h.feed.update_status("nope", MatchStatus::Declined).await.unwrap();
        assert_eq!(missing, 0);
    }

    #[tokio::test]
    async fn test_connectivity_changes_reach_state() {
        let mut h = harness(FakeSource::default(), MemoryStore::default(), true, 10);
        assert!(h.feed.state().is_online);

        h.feed.watch_connectivity();
        h.connectivity.set_connected(false);

        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                h.feed.check_background_tasks();
                if !h.feed.state().is_online {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_panicked_load_clears_loading() {
        let connectivity = Arc::new(ManualConnectivity::new(true));
        let sync = Arc::new(SyncOrchestrator::new(
            Arc::new(PanickingSource),
            Arc::new(MemoryStore::default()),
            connectivity,
        ));
        let mut feed = MatchFeed::new(sync, 10);

        assert!(feed.load_more());
        tokio::time::timeout(Duration::from_secs(1), feed.wait_for_load())
            .await
            .unwrap();

        assert!(!feed.is_loading());
        assert!(matches!(feed.state().last_error, Some(SyncError::Unknown(_))));
        assert!(feed.can_load_more());
        assert_eq!(feed.state().current_page, 1);
    }

    #[tokio::test]
    async fn test_panicked_load_seen_by_polling() {
        let connectivity = Arc::new(ManualConnectivity::new(true));
        let sync = Arc::new(SyncOrchestrator::new(
            Arc::new(PanickingSource),
            Arc::new(MemoryStore::default()),
            connectivity,
        ));
        let mut feed = MatchFeed::new(sync, 10);

        feed.load_more();
        tokio::time::timeout(Duration::from_secs(1), async {
            while feed.is_loading() {
                feed.check_background_tasks();
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(matches!(feed.state().last_error, Some(SyncError::Unknown(_))));
    }
}
