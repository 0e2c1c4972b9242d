//! Remote match source.
//!
//! This module provides the `MatchSource` trait the sync layer fetches pages
//! through, and `RandomUserClient`, the reqwest-backed implementation that talks
//! to the public random-profile service.

pub mod client;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::MatchRecord;

pub use client::RandomUserClient;

#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Fetch one page of profiles, already converted to canonical records.
    /// Pages are 1-based.
    async fn fetch_page(&self, page: u32, page_size: u32) -> SyncResult<Vec<MatchRecord>>;
}
