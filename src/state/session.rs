use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{
        ChipStackUpdateEntity, LiveSessionEntity, StakerConfigEntity, TournamentEntity,
    },
    state::{
        clock::SessionClock,
        ledger::{ChipLedger, ChipStackUpdate},
        staking::StakerConfig,
    },
};

/// Tournament metadata attached to a live session.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentInfo {
    /// Tournament name as announced by the venue.
    pub name: String,
    /// Buy-in for a single entry, before rebuys.
    pub base_buy_in: f64,
    /// Game type label (e.g. "NLH").
    pub game_type: String,
    /// Format label (e.g. "Freezeout").
    pub format: String,
    /// Day the player is currently on, >= 1. Incremented when the player
    /// actually resumes on the next day, not when the break starts.
    pub current_day: u32,
}

/// The one in-flight session a player can have.
///
/// Owned exclusively by the player's slot in [`crate::state::AppState`]; all
/// mutation goes through the session service under the slot's gate.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSession {
    /// Stable identifier, assigned at start, kept until end/discard.
    pub id: Uuid,
    /// Player the session belongs to.
    pub player_id: String,
    /// Display label for the game.
    pub game_name: String,
    /// Display label for the stakes.
    pub stakes_label: String,
    /// Tournament metadata; `None` for cash sessions.
    pub tournament: Option<TournamentInfo>,
    /// Cumulative total buy-in: initial plus all rebuys. Monotonically
    /// non-decreasing except via the explicit edit-total-buy-in override.
    pub buy_in: f64,
    /// Pause/resume bookkeeping; elapsed time is always derived from here.
    pub clock: SessionClock,
    /// Append-only stack observations.
    pub ledger: ChipLedger,
    /// Pending staker configurations keyed by [`StakerConfig::key`],
    /// insertion-ordered so the UI edit order survives round-trips.
    pub staker_configs: IndexMap<String, StakerConfig>,
    /// True while the session sits in a multi-day tournament break.
    pub paused_for_next_day: bool,
    /// Scheduled start of the next tournament day.
    pub next_day_starts_at: Option<SystemTime>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last mutation timestamp.
    pub updated_at: SystemTime,
}

impl LiveSession {
    /// Build a fresh session starting now-ish at `started_at`.
    pub fn new(
        player_id: String,
        game_name: String,
        stakes_label: String,
        tournament: Option<TournamentInfo>,
        buy_in: f64,
        started_at: SystemTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            game_name,
            stakes_label,
            tournament,
            buy_in,
            clock: SessionClock::started_at(started_at),
            ledger: ChipLedger::new(),
            staker_configs: IndexMap::new(),
            paused_for_next_day: false,
            next_day_starts_at: None,
            created_at: started_at,
            updated_at: started_at,
        }
    }

    /// Whether this session tracks a tournament.
    pub fn is_tournament(&self) -> bool {
        self.tournament.is_some()
    }

    /// Current tournament day (1 for cash sessions).
    pub fn current_day(&self) -> u32 {
        self.tournament.as_ref().map(|t| t.current_day).unwrap_or(1)
    }

    /// The stack as last reported, falling back to the buy-in.
    pub fn current_amount(&self) -> f64 {
        self.ledger.current_amount(self.buy_in)
    }

    /// Net result so far.
    pub fn profit(&self) -> f64 {
        self.ledger.profit(self.buy_in)
    }

    /// Total active time as of `now`.
    pub fn elapsed(&self, now: SystemTime) -> Duration {
        self.clock.elapsed(now)
    }

    /// Stamp a mutation time.
    pub fn touch(&mut self, now: SystemTime) {
        self.updated_at = now;
    }
}

impl From<TournamentInfo> for TournamentEntity {
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

impl From<TournamentEntity> for TournamentInfo {
    fn from(value: TournamentEntity) -> Self {
        Self {
            name: value.name,
            base_buy_in: value.base_buy_in,
            game_type: value.game_type,
            format: value.format,
            current_day: value.current_day,
        }
    }
}

impl From<ChipStackUpdate> for ChipStackUpdateEntity {
    fn from(value: ChipStackUpdate) -> Self {
        Self {
            id: value.id,
            amount: value.amount,
            note: value.note,
            timestamp: value.timestamp,
        }
    }
}

impl From<ChipStackUpdateEntity> for ChipStackUpdate {
    fn from(value: ChipStackUpdateEntity) -> Self {
        Self {
            id: value.id,
            amount: value.amount,
            note: value.note,
            timestamp: value.timestamp,
        }
    }
}

impl From<StakerConfig> for StakerConfigEntity {
    fn from(value: StakerConfig) -> Self {
        Self {
            is_manual_entry: value.is_manual_entry,
            staker_user_id: value.staker_user_id,
            manual_staker_name: value.manual_staker_name,
            percentage_sold: value.percentage_sold,
            markup: value.markup,
            original_stake_id: value.original_stake_id,
            original_stake_user_id: value.original_stake_user_id,
        }
    }
}

impl From<StakerConfigEntity> for StakerConfig {
    fn from(value: StakerConfigEntity) -> Self {
        Self {
            is_manual_entry: value.is_manual_entry,
            staker_user_id: value.staker_user_id,
            manual_staker_name: value.manual_staker_name,
            percentage_sold: value.percentage_sold,
            markup: value.markup,
            original_stake_id: value.original_stake_id,
            original_stake_user_id: value.original_stake_user_id,
        }
    }
}

impl From<LiveSession> for LiveSessionEntity {
    fn from(value: LiveSession) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            game_name: value.game_name,
            stakes_label: value.stakes_label,
            tournament: value.tournament.map(Into::into),
            buy_in: value.buy_in,
            start_time: value.clock.start_time(),
            accumulated_active: value.clock.accumulated(),
            interval_start: value.clock.interval_start(),
            is_active: value.clock.is_active(),
            last_paused_at: value.clock.last_paused_at(),
            paused_for_next_day: value.paused_for_next_day,
            next_day_starts_at: value.next_day_starts_at,
            ledger: value
                .ledger
                .entries()
                .iter()
                .cloned()
                .map(Into::into)
                .collect(),
            staker_configs: value
                .staker_configs
                .into_values()
                .map(Into::into)
                .collect(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<LiveSessionEntity> for LiveSession {
    fn from(value: LiveSessionEntity) -> Self {
        let mut staker_configs = IndexMap::new();
        for (index, entity) in value.staker_configs.into_iter().enumerate() {
            let config: StakerConfig = entity.into();
            let key = config.key().unwrap_or_else(|| format!("draft-{index}"));
            staker_configs.insert(key, config);
        }

        Self {
            id: value.id,
            player_id: value.player_id,
            game_name: value.game_name,
            stakes_label: value.stakes_label,
            tournament: value.tournament.map(Into::into),
            buy_in: value.buy_in,
            clock: SessionClock::restore(
                value.start_time,
                value.accumulated_active,
                value.interval_start,
                value.is_active,
                value.last_paused_at,
            ),
            ledger: ChipLedger::from_entries(
                value.ledger.into_iter().map(Into::into).collect(),
            ),
            staker_configs,
            paused_for_next_day: value.paused_for_next_day,
            next_day_starts_at: value.next_day_starts_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
