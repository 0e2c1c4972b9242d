//! matchmilan-core - match synchronization and offline cache.
//!
//! Fetches paginated profiles from a remote service, writes them through to a
//! durable local store, falls back to the stored snapshot when offline, and
//! drives an incremental-loading state machine for a display layer.
//!
//! Collaborators are injected explicitly:
//!
//! ```text
//! MatchFeed -> SyncOrchestrator -> { MatchSource | MatchStore }
//!                                   gated by ConnectivityMonitor
//! ```

pub mod api;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod feed;
pub mod models;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{MatchSource, RandomUserClient};
pub use config::Config;
pub use connectivity::{ConnectivityMonitor, ManualConnectivity, NetworkMonitor};
pub use error::{SyncError, SyncResult};
pub use feed::{MatchFeed, SyncState, DEFAULT_PAGE_SIZE};
pub use models::{MatchRecord, MatchStatus};
pub use store::{JsonMatchStore, MatchStore};
pub use sync::SyncOrchestrator;
