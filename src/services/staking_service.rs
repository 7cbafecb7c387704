//! The staking engine: pending config management, the staking summary with
//! its local-cache fallback, and per-config settlement at session end.

use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{StakeEntity, StakeStatus, StakerConfigEntity},
    dto::staking::{SaveStakersRequest, StakingSummaryResponse},
    error::ServiceError,
    state::{
        SharedState,
        session::LiveSession,
        staking::{self, StakerConfig},
    },
};

use crate::dao::session_store::SessionStore;

/// Counts reported back after settling a session's configs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementOutcome {
    /// Configs whose stake record was written successfully.
    pub settled: usize,
    /// Configs whose write failed; surfaced for retry, never blocking.
    pub failed: usize,
}

/// Replace the pending staker config set for the live session.
///
/// Configs are stored as-is; validation happens at read/settlement time so a
/// half-filled sheet survives app restarts. The set is mirrored into the
/// local cache and the live snapshot on a best-effort basis.
pub async fn save_staker_configs(
    state: &SharedState,
    player_id: &str,
    request: SaveStakersRequest,
) -> Result<StakingSummaryResponse, ServiceError> {
    let slot = state.player(player_id);
    let now = SystemTime::now();

    let (session_id, entities) = slot
        .with_session_mut(|session| {
            session.staker_configs.clear();
            for (index, input) in request.stakers.into_iter().enumerate() {
                let config: StakerConfig = input.into();
                // Duplicate identities collapse, last edit wins; incomplete
                // configs keep their sheet position.
                let key = config.key().unwrap_or_else(|| format!("draft-{index}"));
                session.staker_configs.insert(key, config);
            }
            session.touch(now);

            let entities: Vec<StakerConfigEntity> = session
                .staker_configs
                .values()
                .cloned()
                .map(Into::into)
                .collect();
            Ok((session.id, entities))
        })
        .await?;

    state.stake_cache().write(session_id, &entities);
    super::session_service::persist_live_snapshot(state, &slot).await;

    staking_summary(state, player_id).await
}

/// Staking state for the current session: persisted stakes, pending configs
/// (restored from the local cache when both the store and memory come up
/// empty), and the validation problems that would exclude configs today.
pub async fn staking_summary(
    state: &SharedState,
    player_id: &str,
) -> Result<StakingSummaryResponse, ServiceError> {
    let slot = state.player(player_id);

    let (session_id, buy_in, mut configs) = slot
        .with_session(|session| {
            Ok((
                session.id,
                session.buy_in,
                session
                    .staker_configs
                    .values()
                    .cloned()
                    .collect::<Vec<_>>(),
            ))
        })
        .await?;

    let existing = match state.session_store().await {
        Some(store) => match store.fetch_stakes_for_session(session_id).await {
            Ok(stakes) => stakes,
            Err(err) => {
                warn!(error = %err, "failed to fetch stakes; continuing with local state");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    if existing.is_empty() && configs.is_empty() {
        if let Some(cached) = state.stake_cache().read(session_id) {
            let restored: Vec<StakerConfig> = cached.into_iter().map(Into::into).collect();
            if !restored.is_empty() {
                slot.with_session_mut(|session| {
                    for (index, config) in restored.iter().enumerate() {
                        let key = config.key().unwrap_or_else(|| format!("draft-{index}"));
                        session.staker_configs.insert(key, config.clone());
                    }
                    Ok(())
                })
                .await?;
                info!(%session_id, "restored staker configs from local cache");
                configs = restored;
            }
        }
    }

    let validation_errors = configs
        .iter()
        .filter_map(|config| {
            config
                .validate(buy_in)
                .err()
                .map(|err| format!("{}: {err}", describe(config)))
        })
        .collect();

    Ok(StakingSummaryResponse {
        existing_stakes: existing.into_iter().map(Into::into).collect(),
        configured_stakers: configs.into_iter().map(Into::into).collect(),
        validation_errors,
    })
}

fn describe(config: &StakerConfig) -> String {
    config
        .staker_identity()
        .unwrap_or_else(|| "unnamed staker".into())
}

/// Settle every valid config against the session's final numbers.
///
/// Each config settles independently: a failing write is counted and logged
/// but never blocks the others, and invalid configs are skipped outright.
/// A config carrying `original_stake_id` updates that record in place instead
/// of creating a duplicate.
pub async fn settle_configs(
    store: &dyn SessionStore,
    session: &LiveSession,
    cashout: f64,
) -> SettlementOutcome {
    let now = SystemTime::now();
    let mut outcome = SettlementOutcome::default();

    for config in session.staker_configs.values() {
        let stake = match config.validate(session.buy_in) {
            Ok(Some(stake)) => stake,
            Ok(None) => continue,
            Err(err) => {
                debug!(
                    staker = %describe(config),
                    error = %err,
                    "skipping staker config at settlement"
                );
                continue;
            }
        };

        let settlement = staking::settle(session.buy_in, cashout, &stake);

        let updating = stake.original_stake_id;
        let staker_user_id = if updating.is_some() {
            config
                .original_stake_user_id
                .clone()
                .unwrap_or_else(|| stake.staker_user_id.clone())
        } else {
            stake.staker_user_id.clone()
        };

        let entity = StakeEntity {
            id: updating.unwrap_or_else(Uuid::new_v4),
            session_id: session.id,
            staker_user_id,
            staked_player_user_id: session.player_id.clone(),
            stake_percentage: stake.fraction,
            markup: stake.markup,
            total_player_buy_in_for_session: session.buy_in,
            player_cashout_for_session: cashout,
            settlement_amount: settlement.amount,
            status: StakeStatus::AwaitingSettlement,
            is_tournament_session: session.is_tournament(),
            updated_at: now,
        };

        let result = if updating.is_some() {
            store.update_stake(entity).await
        } else {
            store.create_stake(entity).await.map(|_| ())
        };

        match result {
            Ok(()) => outcome.settled += 1,
            Err(err) => {
                warn!(
                    staker = %stake.staker_user_id,
                    error = %err,
                    "stake settlement write failed; surfaced for retry"
                );
                outcome.failed += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::{
        config::AppConfig,
        dao::session_store::memory::InMemorySessionStore,
        dto::{
            session::StartSessionRequest,
            staking::StakerConfigInput,
        },
        services::session_service,
        state::{AppState, SharedState},
    };

    fn harness_config(dir: &tempfile::TempDir) -> AppConfig {
        AppConfig::new(Duration::from_secs(30), dir.path().join("stakes"))
    }

    async fn started_session(
        state: &SharedState,
        player_id: &str,
        buy_in: f64,
    ) {
        session_service::start_session(
            state,
            player_id,
            StartSessionRequest {
                game_name: "Aria 5/10".into(),
                stakes_label: "$5/$10 NLH".into(),
                buy_in,
                tournament: None,
            },
        )
        .await
        .unwrap();
    }

    fn backer(percentage: &str, markup: &str) -> StakerConfigInput {
        StakerConfigInput {
            is_manual_entry: false,
            staker_user_id: Some("backer-1".into()),
            manual_staker_name: None,
            percentage_sold: percentage.into(),
            markup: markup.into(),
            original_stake_id: None,
            original_stake_user_id: None,
        }
    }

    fn session_with_config(buy_in: f64, config: StakerConfig) -> LiveSession {
        let mut session = LiveSession::new(
            "p1".into(),
            "Aria 5/10".into(),
            "$5/$10 NLH".into(),
            None,
            buy_in,
            SystemTime::now(),
        );
        let key = config.key().unwrap_or_else(|| "draft-0".into());
        session.staker_configs.insert(key, config);
        session
    }

    #[tokio::test]
    async fn settlement_creates_a_record_with_the_contract_numbers() {
        let store = InMemorySessionStore::new();
        let session = session_with_config(
            1000.0,
            StakerConfig {
                is_manual_entry: false,
                staker_user_id: Some("backer-1".into()),
                manual_staker_name: None,
                percentage_sold: "50".into(),
                markup: "1.2".into(),
                original_stake_id: None,
                original_stake_user_id: None,
            },
        );

        let outcome = settle_configs(&store, &session, 1500.0).await;
        assert_eq!(outcome, SettlementOutcome { settled: 1, failed: 0 });

        let stakes = store.stakes();
        assert_eq!(stakes.len(), 1);
        let stake = &stakes[0];
        assert_eq!(stake.stake_percentage, 0.5);
        assert_eq!(stake.markup, 1.2);
        assert_eq!(stake.total_player_buy_in_for_session, 1000.0);
        assert_eq!(stake.player_cashout_for_session, 1500.0);
        assert_eq!(stake.settlement_amount, 150.0);
        assert_eq!(stake.status, StakeStatus::AwaitingSettlement);
        assert_eq!(stake.staked_player_user_id, "p1");
    }

    #[tokio::test]
    async fn settlement_is_idempotent_on_the_original_stake_id() {
        let store = InMemorySessionStore::new();
        let stake_id = Uuid::new_v4();
        let session = session_with_config(
            1000.0,
            StakerConfig {
                is_manual_entry: false,
                staker_user_id: Some("backer-1".into()),
                manual_staker_name: None,
                percentage_sold: "50".into(),
                markup: "1.2".into(),
                original_stake_id: Some(stake_id),
                original_stake_user_id: Some("backer-1".into()),
            },
        );

        settle_configs(&store, &session, 1500.0).await;
        settle_configs(&store, &session, 1500.0).await;

        let stakes = store.stakes();
        assert_eq!(stakes.len(), 1);
        assert_eq!(stakes[0].id, stake_id);
        assert_eq!(stakes[0].settlement_amount, 150.0);
    }

    #[tokio::test]
    async fn invalid_and_zero_configs_are_skipped_cleanly() {
        let store = InMemorySessionStore::new();
        let mut session = session_with_config(
            1000.0,
            StakerConfig {
                is_manual_entry: false,
                staker_user_id: Some("backer-1".into()),
                manual_staker_name: None,
                percentage_sold: "25".into(),
                markup: "1.0".into(),
                original_stake_id: None,
                original_stake_user_id: None,
            },
        );
        // Zero percentage: accepted but produces no settlement.
        session.staker_configs.insert(
            "backer-2".into(),
            StakerConfig {
                is_manual_entry: false,
                staker_user_id: Some("backer-2".into()),
                manual_staker_name: None,
                percentage_sold: "0".into(),
                markup: "1.5".into(),
                original_stake_id: None,
                original_stake_user_id: None,
            },
        );
        // No staker selected: excluded, but never an error.
        session.staker_configs.insert(
            "draft-2".into(),
            StakerConfig {
                is_manual_entry: true,
                staker_user_id: None,
                manual_staker_name: None,
                percentage_sold: "10".into(),
                markup: "1.1".into(),
                original_stake_id: None,
                original_stake_user_id: None,
            },
        );

        let outcome = settle_configs(&store, &session, 800.0).await;
        assert_eq!(outcome, SettlementOutcome { settled: 1, failed: 0 });
        assert_eq!(store.stakes().len(), 1);
    }

    #[tokio::test]
    async fn summary_reports_validation_errors_without_rejecting_the_save() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(harness_config(&dir));
        let store = InMemorySessionStore::new();
        state.install_session_store(Arc::new(store.clone())).await;
        started_session(&state, "p1", 1000.0).await;

        let summary = save_staker_configs(
            &state,
            "p1",
            SaveStakersRequest {
                stakers: vec![backer("50", "1.2"), backer("150", "1.0")],
            },
        )
        .await
        .unwrap();

        // Same identity twice: the last edit wins.
        assert_eq!(summary.configured_stakers.len(), 1);
        assert_eq!(summary.validation_errors.len(), 1);
        assert!(summary.validation_errors[0].contains("percentage"));
    }

    #[tokio::test]
    async fn summary_falls_back_to_the_local_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemorySessionStore::new();

        // First run: configs saved, then the process dies.
        let session_entity = {
            let state = AppState::new(harness_config(&dir));
            state.install_session_store(Arc::new(store.clone())).await;
            started_session(&state, "p1", 1000.0).await;
            save_staker_configs(
                &state,
                "p1",
                SaveStakersRequest {
                    stakers: vec![backer("50", "1.2")],
                },
            )
            .await
            .unwrap();
            store.live_session("p1").unwrap()
        };

        // Second run: the authoritative write is gone, the cache is not.
        let mut wiped = session_entity;
        wiped.staker_configs.clear();
        store.seed_live_session(wiped);

        let state = AppState::new(harness_config(&dir));
        state.install_session_store(Arc::new(store.clone())).await;
        session_service::current_session(&state, "p1").await.unwrap();

        let summary = staking_summary(&state, "p1").await.unwrap();
        assert_eq!(summary.configured_stakers.len(), 1);
        assert_eq!(
            summary.configured_stakers[0].staker_user_id.as_deref(),
            Some("backer-1")
        );
        assert!(summary.validation_errors.is_empty());
    }
}
