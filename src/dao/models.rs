use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// One persisted chip-stack observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChipStackUpdateEntity {
    /// Stable identifier for the observation.
    pub id: Uuid,
    /// Absolute chip count, not a delta.
    pub amount: f64,
    /// Optional free-text note.
    pub note: Option<String>,
    /// Wall-clock time of the observation.
    pub timestamp: SystemTime,
}

/// Tournament metadata persisted alongside a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TournamentEntity {
    /// Tournament name as announced by the venue.
    pub name: String,
    /// Buy-in for a single entry, before rebuys.
    pub base_buy_in: f64,
    /// Game type label (e.g. "NLH").
    pub game_type: String,
    /// Format label (e.g. "Freezeout").
    pub format: String,
    /// Day the player is currently on, >= 1.
    pub current_day: u32,
}

/// Staker configuration persisted with the live session and the local cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StakerConfigEntity {
    /// True for off-app stakers entered by hand.
    pub is_manual_entry: bool,
    /// Registered staker's user id.
    pub staker_user_id: Option<String>,
    /// Display name for an off-app staker.
    pub manual_staker_name: Option<String>,
    /// Percentage of the action sold, string-encoded as captured by the UI.
    pub percentage_sold: String,
    /// Markup multiplier, string-encoded as captured by the UI.
    pub markup: String,
    /// Pre-existing stake record being edited, if any.
    pub original_stake_id: Option<Uuid>,
    /// Staker user id of the pre-existing stake being edited.
    pub original_stake_user_id: Option<String>,
}

/// Snapshot of an in-flight session, persisted so a session survives a
/// process restart and multi-day breaks can resume elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveSessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Player the session belongs to.
    pub player_id: String,
    /// Display label for the game.
    pub game_name: String,
    /// Display label for the stakes.
    pub stakes_label: String,
    /// Tournament metadata when this is a tournament session.
    pub tournament: Option<TournamentEntity>,
    /// Cumulative total buy-in (initial plus rebuys).
    pub buy_in: f64,
    /// Wall-clock session start (may have been edited retroactively).
    pub start_time: SystemTime,
    /// Sum of completed active intervals.
    pub accumulated_active: Duration,
    /// Start of the active interval in flight.
    pub interval_start: SystemTime,
    /// Whether the clock is running.
    pub is_active: bool,
    /// Most recent pause timestamp.
    pub last_paused_at: Option<SystemTime>,
    /// True during a multi-day tournament break.
    pub paused_for_next_day: bool,
    /// Scheduled start of the next tournament day.
    pub next_day_starts_at: Option<SystemTime>,
    /// Ledger entries in append order.
    pub ledger: Vec<ChipStackUpdateEntity>,
    /// Pending staker configurations in edit order.
    pub staker_configs: Vec<StakerConfigEntity>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time this snapshot was updated.
    pub updated_at: SystemTime,
}

/// Lifecycle of a persisted stake record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StakeStatus {
    /// Stake is live against an ongoing session.
    Active,
    /// Session ended; settlement computed but not yet paid out.
    AwaitingSettlement,
    /// Settlement paid and acknowledged.
    Settled,
}

/// Persisted settlement record between a player and one staker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StakeEntity {
    /// Primary key of the stake.
    pub id: Uuid,
    /// Session this stake settles against.
    pub session_id: Uuid,
    /// Registered user id or `offapp:<name>` placeholder.
    pub staker_user_id: String,
    /// Player whose action was staked.
    pub staked_player_user_id: String,
    /// Share of the action as a decimal, 0–1.
    pub stake_percentage: f64,
    /// Markup multiplier the staker paid.
    pub markup: f64,
    /// Player's cumulative buy-in for the session.
    pub total_player_buy_in_for_session: f64,
    /// Player's cashout for the session.
    pub player_cashout_for_session: f64,
    /// Settlement amount; positive means the staker nets a profit.
    pub settlement_amount: f64,
    /// Current lifecycle status.
    pub status: StakeStatus,
    /// Whether the underlying session was a tournament.
    pub is_tournament_session: bool,
    /// Last time this record was written.
    pub updated_at: SystemTime,
}

/// Historical record of a completed session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecordEntity {
    /// Primary key; matches the live session id it was produced from.
    pub id: Uuid,
    /// Player the session belonged to.
    pub player_id: String,
    /// Display label for the game.
    pub game_name: String,
    /// Display label for the stakes.
    pub stakes_label: String,
    /// Tournament metadata when this was a tournament session.
    pub tournament: Option<TournamentEntity>,
    /// Final cumulative buy-in.
    pub buy_in: f64,
    /// Final cashout amount.
    pub cashout: f64,
    /// `cashout - buy_in`.
    pub profit: f64,
    /// Wall-clock session start.
    pub start_time: SystemTime,
    /// Wall-clock session end.
    pub end_time: SystemTime,
    /// Total active seconds, computed once at session end.
    pub elapsed_seconds: u64,
    /// Number of tournament days played (1 for cash sessions).
    pub days_played: u32,
    /// Full ledger in append order.
    pub ledger: Vec<ChipStackUpdateEntity>,
}
