use std::time::Duration;

use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    ChipStackUpdateEntity, LiveSessionEntity, SessionRecordEntity, StakeEntity, StakeStatus,
    StakerConfigEntity, TournamentEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChipUpdate {
    id: Uuid,
    amount: f64,
    note: Option<String>,
    timestamp: DateTime,
}

impl From<ChipStackUpdateEntity> for MongoChipUpdate {
    fn from(value: ChipStackUpdateEntity) -> Self {
        Self {
            id: value.id,
            amount: value.amount,
            note: value.note,
            timestamp: DateTime::from_system_time(value.timestamp),
        }
    }
}

impl From<MongoChipUpdate> for ChipStackUpdateEntity {
    fn from(value: MongoChipUpdate) -> Self {
        Self {
            id: value.id,
            amount: value.amount,
            note: value.note,
            timestamp: value.timestamp.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLiveSessionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    player_id: String,
    game_name: String,
    stakes_label: String,
    tournament: Option<TournamentEntity>,
    buy_in: f64,
    start_time: DateTime,
    accumulated_active_ms: u64,
    interval_start: DateTime,
    is_active: bool,
    last_paused_at: Option<DateTime>,
    paused_for_next_day: bool,
    next_day_starts_at: Option<DateTime>,
    ledger: Vec<MongoChipUpdate>,
    #[serde(default)]
    staker_configs: Vec<StakerConfigEntity>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<LiveSessionEntity> for MongoLiveSessionDocument {
    fn from(value: LiveSessionEntity) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            game_name: value.game_name,
            stakes_label: value.stakes_label,
            tournament: value.tournament,
            buy_in: value.buy_in,
            start_time: DateTime::from_system_time(value.start_time),
            accumulated_active_ms: value.accumulated_active.as_millis() as u64,
            interval_start: DateTime::from_system_time(value.interval_start),
            is_active: value.is_active,
            last_paused_at: value.last_paused_at.map(DateTime::from_system_time),
            paused_for_next_day: value.paused_for_next_day,
            next_day_starts_at: value.next_day_starts_at.map(DateTime::from_system_time),
            ledger: value.ledger.into_iter().map(Into::into).collect(),
            staker_configs: value.staker_configs,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoLiveSessionDocument> for LiveSessionEntity {
    fn from(value: MongoLiveSessionDocument) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            game_name: value.game_name,
            stakes_label: value.stakes_label,
            tournament: value.tournament,
            buy_in: value.buy_in,
            start_time: value.start_time.to_system_time(),
            accumulated_active: Duration::from_millis(value.accumulated_active_ms),
            interval_start: value.interval_start.to_system_time(),
            is_active: value.is_active,
            last_paused_at: value.last_paused_at.map(|at| at.to_system_time()),
            paused_for_next_day: value.paused_for_next_day,
            next_day_starts_at: value.next_day_starts_at.map(|at| at.to_system_time()),
            ledger: value.ledger.into_iter().map(Into::into).collect(),
            staker_configs: value.staker_configs,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionRecordDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    player_id: String,
    game_name: String,
    stakes_label: String,
    tournament: Option<TournamentEntity>,
    buy_in: f64,
    cashout: f64,
    profit: f64,
    start_time: DateTime,
    end_time: DateTime,
    elapsed_seconds: u64,
    days_played: u32,
    ledger: Vec<MongoChipUpdate>,
}

impl From<SessionRecordEntity> for MongoSessionRecordDocument {
    fn from(value: SessionRecordEntity) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            game_name: value.game_name,
            stakes_label: value.stakes_label,
            tournament: value.tournament,
            buy_in: value.buy_in,
            cashout: value.cashout,
            profit: value.profit,
            start_time: DateTime::from_system_time(value.start_time),
            end_time: DateTime::from_system_time(value.end_time),
            elapsed_seconds: value.elapsed_seconds,
            days_played: value.days_played,
            ledger: value.ledger.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<MongoSessionRecordDocument> for SessionRecordEntity {
    fn from(value: MongoSessionRecordDocument) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            game_name: value.game_name,
            stakes_label: value.stakes_label,
            tournament: value.tournament,
            buy_in: value.buy_in,
            cashout: value.cashout,
            profit: value.profit,
            start_time: value.start_time.to_system_time(),
            end_time: value.end_time.to_system_time(),
            elapsed_seconds: value.elapsed_seconds,
            days_played: value.days_played,
            ledger: value.ledger.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStakeDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    session_id: Uuid,
    staker_user_id: String,
    staked_player_user_id: String,
    stake_percentage: f64,
    markup: f64,
    total_player_buy_in_for_session: f64,
    player_cashout_for_session: f64,
    settlement_amount: f64,
    status: StakeStatus,
    is_tournament_session: bool,
    updated_at: DateTime,
}

impl From<StakeEntity> for MongoStakeDocument {
    fn from(value: StakeEntity) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            staker_user_id: value.staker_user_id,
            staked_player_user_id: value.staked_player_user_id,
            stake_percentage: value.stake_percentage,
            markup: value.markup,
            total_player_buy_in_for_session: value.total_player_buy_in_for_session,
            player_cashout_for_session: value.player_cashout_for_session,
            settlement_amount: value.settlement_amount,
            status: value.status,
            is_tournament_session: value.is_tournament_session,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoStakeDocument> for StakeEntity {
    fn from(value: MongoStakeDocument) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            staker_user_id: value.staker_user_id,
            staked_player_user_id: value.staked_player_user_id,
            stake_percentage: value.stake_percentage,
            markup: value.markup,
            total_player_buy_in_for_session: value.total_player_buy_in_for_session,
            player_cashout_for_session: value.player_cashout_for_session,
            settlement_amount: value.settlement_amount,
            status: value.status,
            is_tournament_session: value.is_tournament_session,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
