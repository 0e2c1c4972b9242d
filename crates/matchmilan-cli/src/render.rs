//! Plain-text rendering of feed state.

use chrono::{DateTime, Utc};
use matchmilan_core::{MatchRecord, MatchStatus, SyncState};

fn status_badge(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Accepted => "[matched]",
        MatchStatus::Declined => "[not interested]",
        MatchStatus::Pending => "[ ]",
    }
}

pub fn record_line(position: usize, record: &MatchRecord) -> String {
    let address = if record.address.is_empty() {
        String::new()
    } else {
        format!(" - {}", record.address)
    };
    format!(
        "{:>3}. {} {}{} ({})",
        position,
        status_badge(record.status),
        record.display_name_or_placeholder(),
        address,
        record.id
    )
}

/// Lines for records starting at `from` (0-based), numbered from `from + 1`.
pub fn records_from(state: &SyncState, from: usize) -> Vec<String> {
    state
        .records
        .iter()
        .enumerate()
        .skip(from)
        .map(|(i, r)| record_line(i + 1, r))
        .collect()
}

pub fn summary(state: &SyncState) -> String {
    let decided = state.records.iter().filter(|r| r.status.is_decided()).count();
    let mut line = format!(
        "{} loaded ({} decided), next page {}, {}, {}",
        state.records.len(),
        decided,
        state.current_page,
        if state.can_load_more { "more available" } else { "end of list" },
        if state.is_online { "online" } else { "offline" },
    );
    if let Some(message) = state.error_message() {
        line.push_str(&format!(" | error: {}", message));
    }
    line
}

/// Rough age of `at` relative to `now`, in the largest whole unit.
fn age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    match (elapsed.num_days(), elapsed.num_hours(), elapsed.num_minutes()) {
        (d, _, _) if d > 0 => format!("{}d ago", d),
        (_, h, _) if h > 0 => format!("{}h ago", h),
        (_, _, m) if m > 0 => format!("{}m ago", m),
        _ => "just now".to_string(),
    }
}

/// One line describing the local store.
pub fn store_line(stored: usize, saved_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format!("{} stored locally, last written {}", stored, age(saved_at, now))
}
