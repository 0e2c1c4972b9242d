//! Local match storage for offline access.
//!
//! This module provides the `MatchStore` trait the sync layer persists through,
//! and `JsonMatchStore`, a durable single-file implementation. Every mutating
//! call is committed to disk before it returns.

pub mod json;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::{MatchRecord, MatchStatus};

pub use json::{JsonMatchStore, StoredMatch};

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn exists(&self, id: &str) -> SyncResult<bool>;

    /// Persist a single record unless its id is already stored. Returns
    /// `false` (and writes nothing) for an id that is present. Each call is an
    /// independent write.
    async fn insert(&self, record: &MatchRecord) -> SyncResult<bool>;

    /// All stored records in insertion order.
    async fn fetch_all(&self) -> SyncResult<Vec<MatchRecord>>;

    /// Set the status of every record with `id`. Returns how many matched;
    /// zero is not an error.
    async fn update(&self, id: &str, status: MatchStatus) -> SyncResult<usize>;
}
