use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{format_system_time, validation::validate_rfc3339},
    state::session::{LiveSession, TournamentInfo},
};

/// Payload used to start a new live session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartSessionRequest {
    /// Display label for the game (e.g. "Bellagio 2/5").
    #[validate(length(min = 1, message = "game name must not be empty"))]
    pub game_name: String,
    /// Display label for the stakes (e.g. "$2/$5 NLH").
    #[serde(default)]
    pub stakes_label: String,
    /// Initial buy-in; must be strictly positive.
    pub buy_in: f64,
    /// Tournament metadata; omit for cash sessions.
    #[serde(default)]
    #[validate(nested)]
    pub tournament: Option<TournamentInput>,
}

/// Tournament metadata supplied when starting a tournament session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TournamentInput {
    /// Tournament name as announced by the venue.
    #[validate(length(min = 1, message = "tournament name must not be empty"))]
    pub name: String,
    /// Buy-in for a single entry, before rebuys.
    pub base_buy_in: f64,
    /// Game type label (e.g. "NLH").
    #[serde(default)]
    pub game_type: String,
    /// Format label (e.g. "Freezeout").
    #[serde(default)]
    pub format: String,
}

impl From<TournamentInput> for TournamentInfo {
    fn from(value: TournamentInput) -> Self {
        Self {
            name: value.name,
            base_buy_in: value.base_buy_in,
            game_type: value.game_type,
            format: value.format,
            current_day: 1,
        }
    }
}

/// Payload for a rebuy during a live session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RebuyRequest {
    /// Additional buy-in amount; must be strictly positive.
    pub amount: f64,
}

/// Payload reporting the current chip stack.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChipUpdateRequest {
    /// Absolute chip count, not a delta.
    pub amount: f64,
    /// Optional note; quick-update buttons send `"Quick add: +$N"` /
    /// `"Quick subtract: -$N"`.
    #[serde(default)]
    pub note: Option<String>,
}

/// Payload correcting the cumulative total buy-in.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EditBuyInRequest {
    /// Replacement total; must be strictly positive. Overwrites, not adds.
    pub amount: f64,
}

/// Payload retroactively moving the session start time.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct EditStartTimeRequest {
    /// New session start, RFC3339.
    #[validate(custom(function = validate_rfc3339))]
    pub start_time: String,
}

/// Payload scheduling a multi-day tournament break.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NextDayRequest {
    /// Scheduled start of the next day, RFC3339.
    #[serde(default)]
    pub starts_at: Option<String>,
}

impl Validate for NextDayRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref starts_at) = self.starts_at {
            if let Err(e) = validate_rfc3339(starts_at) {
                errors.add("starts_at", e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload finishing a session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EndSessionRequest {
    /// Final cashout amount; must be non-negative.
    pub cashout: f64,
}

/// Projection of the live session returned by every lifecycle operation.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: Uuid,
    /// Display label for the game.
    pub game_name: String,
    /// Display label for the stakes.
    pub stakes_label: String,
    /// Whether this session tracks a tournament.
    pub is_tournament: bool,
    /// Tournament metadata when applicable.
    pub tournament: Option<TournamentSummary>,
    /// Cumulative total buy-in.
    pub buy_in: f64,
    /// The stack as last reported.
    pub current_stack: f64,
    /// Current stack minus buy-in.
    pub profit: f64,
    /// Total active seconds as of this response.
    pub elapsed_seconds: u64,
    /// Whether the clock is running.
    pub is_active: bool,
    /// True during a multi-day tournament break.
    pub paused_for_next_day: bool,
    /// Scheduled start of the next tournament day, RFC3339.
    pub next_day_starts_at: Option<String>,
    /// Session start, RFC3339.
    pub start_time: String,
    /// Most recent pause, RFC3339.
    pub last_paused_at: Option<String>,
}

/// Tournament metadata inside a [`SessionSummary`].
#[derive(Debug, Serialize, ToSchema)]
pub struct TournamentSummary {
    /// Tournament name.
    pub name: String,
    /// Buy-in for a single entry.
    pub base_buy_in: f64,
    /// Game type label.
    pub game_type: String,
    /// Format label.
    pub format: String,
    /// Day the player is currently on.
    pub current_day: u32,
}

impl From<TournamentInfo> for TournamentSummary {
    fn from(value: TournamentInfo) -> Self {
        Self {
            name: value.name,
            base_buy_in: value.base_buy_in,
            game_type: value.game_type,
            format: value.format,
            current_day: value.current_day,
        }
    }
}

impl SessionSummary {
    /// Project a live session as of `now` (elapsed time is derived, never stored).
    pub fn from_session(session: &LiveSession, now: SystemTime) -> Self {
        Self {
            id: session.id,
            game_name: session.game_name.clone(),
            stakes_label: session.stakes_label.clone(),
            is_tournament: session.is_tournament(),
            tournament: session.tournament.clone().map(Into::into),
            buy_in: session.buy_in,
            current_stack: session.current_amount(),
            profit: session.profit(),
            elapsed_seconds: session.elapsed(now).as_secs(),
            is_active: session.clock.is_active(),
            paused_for_next_day: session.paused_for_next_day,
            next_day_starts_at: session.next_day_starts_at.map(format_system_time),
            start_time: format_system_time(session.clock.start_time()),
            last_paused_at: session.clock.last_paused_at().map(format_system_time),
        }
    }
}

/// Result of ending a session: the durable record plus settlement counts.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndSessionResponse {
    /// Identifier of the persisted historical record.
    pub record_id: Uuid,
    /// Final profit: cashout minus total buy-in.
    pub profit: f64,
    /// Total active seconds over the whole session.
    pub elapsed_seconds: u64,
    /// Number of staker configs settled successfully.
    pub stakes_settled: usize,
    /// Number of staker configs whose settlement write failed; these are
    /// surfaced for retry and never block the session end.
    pub stakes_failed: usize,
}

/// Generic acknowledgement for operations without a richer payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human-readable confirmation.
    pub message: String,
}
