//! Data models for profile matches.
//!
//! This module contains:
//!
//! - `MatchRecord`, `MatchStatus`: the canonical, locally owned match entity
//! - `RemotePage`, `RemoteProfile` and friends: the raw, loosely shaped payload
//!   returned by the remote profile service

pub mod matches;
pub mod remote;

pub use matches::{MatchRecord, MatchStatus};
pub use remote::{PageInfo, RemotePage, RemoteProfile};
