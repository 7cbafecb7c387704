use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::{dto::format_system_time, state::session::LiveSession};

/// Kind of entry in the recent-activity feed.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateItemKind {
    /// Marker for the session start.
    SessionStart,
    /// A (possibly merged) chip-stack observation.
    ChipUpdate,
}

/// One display entry of the recent-activity feed. Derived on every read from
/// the live session and its ledger; never persisted.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateItem {
    /// What this entry represents.
    pub kind: UpdateItemKind,
    /// Stack amount (or buy-in for the session-start marker).
    pub amount: f64,
    /// Display note, synthesized for merged groups.
    pub note: Option<String>,
    /// Timestamp, RFC3339.
    pub timestamp: String,
    /// Number of raw ledger entries behind this item (1 unless merged).
    pub merged_count: usize,
}

/// Build the feed: merged ledger entries newest-first, with the session-start
/// marker at the bottom.
pub fn build_feed(session: &LiveSession, merge_window: Duration) -> Vec<UpdateItem> {
    let mut items: Vec<UpdateItem> = session
        .ledger
        .merged_for_display(merge_window)
        .into_iter()
        .rev()
        .map(|merged| UpdateItem {
            kind: UpdateItemKind::ChipUpdate,
            amount: merged.amount,
            note: merged.note,
            timestamp: format_system_time(merged.timestamp),
            merged_count: merged.merged_count,
        })
        .collect();

    items.push(UpdateItem {
        kind: UpdateItemKind::SessionStart,
        amount: session.buy_in,
        note: Some(session_start_note(session)),
        timestamp: format_system_time(session.clock.start_time()),
        merged_count: 1,
    });

    items
}

fn session_start_note(session: &LiveSession) -> String {
    if session.stakes_label.is_empty() {
        format!("Session started: {}", session.game_name)
    } else {
        format!(
            "Session started: {} ({})",
            session.game_name, session.stakes_label
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn feed_is_newest_first_with_start_marker_last() {
        let mut session = LiveSession::new(
            "p1".into(),
            "Bellagio 2/5".into(),
            "$2/$5 NLH".into(),
            None,
            500.0,
            at(0),
        );
        session.ledger.append(500.0, None, at(0));
        session.ledger.append(620.0, None, at(600));

        let feed = build_feed(&session, Duration::from_secs(30));
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[0].kind, UpdateItemKind::ChipUpdate);
        assert_eq!(feed[0].amount, 620.0);
        assert_eq!(feed[2].kind, UpdateItemKind::SessionStart);
        assert_eq!(
            feed[2].note.as_deref(),
            Some("Session started: Bellagio 2/5 ($2/$5 NLH)")
        );
    }
}
