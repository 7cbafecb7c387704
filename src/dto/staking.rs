use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{StakeEntity, StakeStatus},
    dto::format_system_time,
    state::staking::StakerConfig,
};

/// One staker arrangement as edited in the staking sheet.
///
/// Deliberately loose: identity, percentage, and markup are accepted as-is and
/// validated at settlement time; problems show up in the staking summary's
/// `validation_errors` rather than rejecting the save.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StakerConfigInput {
    /// True for an off-app staker entered by hand.
    #[serde(default)]
    pub is_manual_entry: bool,
    /// Registered staker's user id.
    #[serde(default)]
    pub staker_user_id: Option<String>,
    /// Display name for an off-app staker.
    #[serde(default)]
    pub manual_staker_name: Option<String>,
    /// Percentage of the action sold, string-encoded as typed.
    pub percentage_sold: String,
    /// Markup multiplier, string-encoded as typed.
    pub markup: String,
    /// Pre-existing stake record being edited, if any.
    #[serde(default)]
    pub original_stake_id: Option<Uuid>,
    /// Staker user id of the pre-existing stake being edited.
    #[serde(default)]
    pub original_stake_user_id: Option<String>,
}

impl From<StakerConfigInput> for StakerConfig {
    fn from(value: StakerConfigInput) -> Self {
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

impl From<StakerConfig> for StakerConfigInput {
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

/// Payload replacing the pending staker configuration set for the session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveStakersRequest {
    /// Full config set in edit order; replaces what was saved before.
    pub stakers: Vec<StakerConfigInput>,
}

/// Projection of a persisted stake record.
#[derive(Debug, Serialize, ToSchema)]
pub struct StakeSummary {
    /// Stake record identifier.
    pub id: Uuid,
    /// Session the stake settles against.
    pub session_id: Uuid,
    /// Registered user id or `offapp:<name>` placeholder.
    pub staker_user_id: String,
    /// Share of the action as a decimal, 0–1.
    pub stake_percentage: f64,
    /// Markup multiplier.
    pub markup: f64,
    /// Player's cumulative buy-in for the session.
    pub total_player_buy_in_for_session: f64,
    /// Player's cashout for the session.
    pub player_cashout_for_session: f64,
    /// Settlement amount; positive means the staker nets a profit.
    pub settlement_amount: f64,
    /// Lifecycle status.
    pub status: String,
    /// Whether the underlying session was a tournament.
    pub is_tournament_session: bool,
    /// Last write, RFC3339.
    pub updated_at: String,
}

fn status_label(status: StakeStatus) -> &'static str {
    match status {
        StakeStatus::Active => "active",
        StakeStatus::AwaitingSettlement => "awaiting_settlement",
        StakeStatus::Settled => "settled",
    }
}

impl From<StakeEntity> for StakeSummary {
    fn from(value: StakeEntity) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            staker_user_id: value.staker_user_id,
            stake_percentage: value.stake_percentage,
            markup: value.markup,
            total_player_buy_in_for_session: value.total_player_buy_in_for_session,
            player_cashout_for_session: value.player_cashout_for_session,
            settlement_amount: value.settlement_amount,
            status: status_label(value.status).to_owned(),
            is_tournament_session: value.is_tournament_session,
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Staking state for the current session: persisted stakes, pending configs,
/// and whatever keeps the pending configs from settling cleanly.
#[derive(Debug, Serialize, ToSchema)]
pub struct StakingSummaryResponse {
    /// Stake records already persisted for this session.
    pub existing_stakes: Vec<StakeSummary>,
    /// Pending configs in edit order.
    pub configured_stakers: Vec<StakerConfigInput>,
    /// One message per config that would be excluded from settlement today.
    pub validation_errors: Vec<String>,
}
