//! In-memory collaborators for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::MatchSource;
use crate::error::{SyncError, SyncResult};
use crate::models::{MatchRecord, MatchStatus};
use crate::store::MatchStore;

/// `n` pending records with ids `<prefix>-0 .. <prefix>-(n-1)`.
pub fn records(prefix: &str, n: usize) -> Vec<MatchRecord> {
    (0..n)
        .map(|i| {
            MatchRecord::new(
                format!("{}-{}", prefix, i),
                "",
                format!("Person {} {}", prefix, i),
                "1 Test Street",
            )
        })
        .collect()
}

/// Replays canned pages in order; an exhausted script yields empty pages.
#[derive(Default)]
pub struct FakeSource {
    pages: Mutex<VecDeque<SyncResult<Vec<MatchRecord>>>>,
    delays: Mutex<VecDeque<Duration>>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl FakeSource {
    pub fn with_pages(pages: Vec<SyncResult<Vec<MatchRecord>>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    /// Delay the n-th call by the n-th duration.
    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delays.lock().unwrap() = delays.into();
        self
    }

    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MatchSource for FakeSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> SyncResult<Vec<MatchRecord>> {
        self.calls.lock().unwrap().push((page, page_size));
        let delay = self.delays.lock().unwrap().pop_front();
        let result = self.pages.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<MatchRecord>>,
    inserts: Mutex<usize>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn seeded(records: Vec<MatchRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    /// Accept `n` inserts, then reject every further one.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn insert_count(&self) -> usize {
        *self.inserts.lock().unwrap()
    }

    pub fn status_of(&self, id: &str) -> Option<MatchStatus> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
    }

    pub fn ids_are_unique(&self) -> bool {
        let records = self.records.lock().unwrap();
        let ids: HashSet<_> = records.iter().map(|r| r.id.as_str()).collect();
        ids.len() == records.len()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn exists(&self, id: &str) -> SyncResult<bool> {
        Ok(self.records.lock().unwrap().iter().any(|r| r.id == id))
    }

    async fn insert(&self, record: &MatchRecord) -> SyncResult<bool> {
        let mut inserts = self.inserts.lock().unwrap();
        if self.fail_after.is_some_and(|n| *inserts >= n) {
            return Err(SyncError::PersistenceError("disk full".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.id == record.id) {
            return Ok(false);
        }
        *inserts += 1;
        records.push(record.clone());
        Ok(true)
    }

    async fn fetch_all(&self) -> SyncResult<Vec<MatchRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update(&self, id: &str, status: MatchStatus) -> SyncResult<usize> {
        let mut records = self.records.lock().unwrap();
        let mut updated = 0;
        for record in records.iter_mut().filter(|r| r.id == id) {
            record.status = status;
            updated += 1;
        }
        Ok(updated)
    }
}
