//! Business logic for the session lifecycle routes. These helpers coordinate
//! storage persistence, in-memory state updates, and state-machine
//! transitions while honouring the single-transition-at-a-time requirement
//! per player.
//!
//! The in-memory session is the source of truth while a session runs, so
//! ledger and buy-in writes are optimistic and degrade silently. Only
//! `end_session` is write-through: the session leaves memory only once its
//! historical record is confirmed durable.

use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::models::{LiveSessionEntity, SessionRecordEntity},
    dto::{
        activity::{self, UpdateItem},
        parse_system_time,
        session::{
            ActionResponse, ChipUpdateRequest, EditBuyInRequest, EditStartTimeRequest,
            EndSessionRequest, EndSessionResponse, NextDayRequest, RebuyRequest, SessionSummary,
            StartSessionRequest,
        },
    },
    error::ServiceError,
    services::staking_service,
    state::{
        PlayerSlot, SharedState,
        ledger::format_signed_dollars,
        session::LiveSession,
        state_machine::{RunningPhase, SessionEvent, SessionPhase},
    },
};

fn ensure_positive(amount: f64, what: &str) -> Result<(), ServiceError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ServiceError::InvalidAmount(format!(
            "{what} must be strictly positive, got {amount}"
        )));
    }
    Ok(())
}

fn ensure_non_negative(amount: f64, what: &str) -> Result<(), ServiceError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ServiceError::InvalidAmount(format!(
            "{what} must be non-negative, got {amount}"
        )));
    }
    Ok(())
}

async fn require_session(slot: &PlayerSlot) -> Result<(), ServiceError> {
    if slot.has_session().await {
        Ok(())
    } else {
        Err(ServiceError::NoActiveSession)
    }
}

/// Persist the current live snapshot, tolerating storage failures: the local
/// state already reflects the user's action and stays authoritative.
pub(crate) async fn persist_live_snapshot(state: &SharedState, slot: &PlayerSlot) {
    let Some(store) = state.session_store().await else {
        warn!("storage unavailable; live session snapshot not persisted");
        return;
    };

    let entity = slot.read_session(|s| s.map(|s| s.clone().into())).await;
    if let Some(entity) = entity {
        if let Err(err) = store.save_live_session(entity).await {
            warn!(error = %err, "failed to persist live session snapshot; keeping local state");
        }
    }
}

/// Start a new session. Only legal from setup; cash games get their ledger
/// seeded with an initial entry equal to the buy-in.
pub async fn start_session(
    state: &SharedState,
    player_id: &str,
    request: StartSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    ensure_positive(request.buy_in, "buy-in")?;

    let slot = state.player(player_id);
    let now = SystemTime::now();

    let state = state.clone();
    let slot_in_work = slot.clone();
    let player_id = player_id.to_owned();

    let (summary, _next) = slot
        .run_transition(SessionEvent::StartSession, move || async move {
            let mut session = LiveSession::new(
                player_id,
                request.game_name,
                request.stakes_label,
                request.tournament.map(Into::into),
                request.buy_in,
                now,
            );

            // The ledger is never empty once a cash session is active.
            if !session.is_tournament() && session.ledger.is_empty() {
                session.ledger.append(session.buy_in, None, now);
            }

            let summary = SessionSummary::from_session(&session, now);
            slot_in_work.set_session(session).await;
            persist_live_snapshot(&state, &slot_in_work).await;

            Ok(summary)
        })
        .await?;

    Ok(summary)
}

/// Stop the clock. Rejected (without flipping anything) when already paused.
pub async fn pause_session(
    state: &SharedState,
    player_id: &str,
) -> Result<SessionSummary, ServiceError> {
    let slot = state.player(player_id);
    require_session(&slot).await?;
    let now = SystemTime::now();

    let state = state.clone();
    let slot_in_work = slot.clone();

    let (summary, _next) = slot
        .run_transition(SessionEvent::Pause, move || async move {
            let summary = slot_in_work
                .with_session_mut(|session| {
                    session.clock.pause(now)?;
                    session.touch(now);
                    Ok(SessionSummary::from_session(session, now))
                })
                .await?;
            persist_live_snapshot(&state, &slot_in_work).await;
            Ok(summary)
        })
        .await?;

    Ok(summary)
}

/// Restart the clock after an ordinary pause.
pub async fn resume_session(
    state: &SharedState,
    player_id: &str,
) -> Result<SessionSummary, ServiceError> {
    let slot = state.player(player_id);
    require_session(&slot).await?;
    let now = SystemTime::now();

    let state = state.clone();
    let slot_in_work = slot.clone();

    let (summary, _next) = slot
        .run_transition(SessionEvent::Resume, move || async move {
            let summary = slot_in_work
                .with_session_mut(|session| {
                    session.clock.resume(now)?;
                    session.touch(now);
                    Ok(SessionSummary::from_session(session, now))
                })
                .await?;
            persist_live_snapshot(&state, &slot_in_work).await;
            Ok(summary)
        })
        .await?;

    Ok(summary)
}

/// Add a rebuy: the buy-in grows by `amount` and the ledger records the stack
/// at its new height.
pub async fn rebuy(
    state: &SharedState,
    player_id: &str,
    request: RebuyRequest,
) -> Result<SessionSummary, ServiceError> {
    ensure_positive(request.amount, "rebuy amount")?;
    let slot = state.player(player_id);
    let now = SystemTime::now();

    let summary = slot
        .with_session_mut(|session| {
            let stack_after = session.current_amount() + request.amount;
            session.buy_in += request.amount;
            session.ledger.append(
                stack_after,
                Some(format!(
                    "Rebuy: {}",
                    format_signed_dollars(request.amount)
                )),
                now,
            );
            session.touch(now);
            Ok(SessionSummary::from_session(session, now))
        })
        .await?;

    persist_live_snapshot(state, &slot).await;
    Ok(summary)
}

/// Record a chip-stack observation.
pub async fn quick_update(
    state: &SharedState,
    player_id: &str,
    request: ChipUpdateRequest,
) -> Result<SessionSummary, ServiceError> {
    ensure_non_negative(request.amount, "stack amount")?;
    let slot = state.player(player_id);
    let now = SystemTime::now();

    let summary = slot
        .with_session_mut(|session| {
            session.ledger.append(request.amount, request.note, now);
            session.touch(now);
            Ok(SessionSummary::from_session(session, now))
        })
        .await?;

    persist_live_snapshot(state, &slot).await;
    Ok(summary)
}

/// Overwrite the cumulative total buy-in. Corrects data-entry mistakes; the
/// ledger is left alone.
pub async fn edit_total_buy_in(
    state: &SharedState,
    player_id: &str,
    request: EditBuyInRequest,
) -> Result<SessionSummary, ServiceError> {
    ensure_positive(request.amount, "total buy-in")?;
    let slot = state.player(player_id);
    let now = SystemTime::now();

    let summary = slot
        .with_session_mut(|session| {
            session.buy_in = request.amount;
            session.touch(now);
            Ok(SessionSummary::from_session(session, now))
        })
        .await?;

    persist_live_snapshot(state, &slot).await;
    Ok(summary)
}

/// Retroactively move the session start. Elapsed time is recomputed from a
/// single straight-line interval; see [`crate::state::clock::SessionClock::edit_start_time`].
pub async fn edit_start_time(
    state: &SharedState,
    player_id: &str,
    request: EditStartTimeRequest,
) -> Result<SessionSummary, ServiceError> {
    let new_start = parse_system_time(&request.start_time).ok_or_else(|| {
        ServiceError::Validation(format!(
            "`{}` is not an RFC3339 timestamp",
            request.start_time
        ))
    })?;

    let slot = state.player(player_id);
    let now = SystemTime::now();

    let summary = slot
        .with_session_mut(|session| {
            session.clock.edit_start_time(new_start, now);
            session.touch(now);
            Ok(SessionSummary::from_session(session, now))
        })
        .await?;

    persist_live_snapshot(state, &slot).await;
    Ok(summary)
}

/// Bag up for the night. Pending staker configurations are persisted before
/// the break since the session may resume on a different device; the write is
/// required, not best-effort, and the break is aborted without it.
pub async fn progress_to_next_day(
    state: &SharedState,
    player_id: &str,
    request: NextDayRequest,
) -> Result<SessionSummary, ServiceError> {
    let slot = state.player(player_id);
    require_session(&slot).await?;

    let is_tournament = slot.with_session(|s| Ok(s.is_tournament())).await?;
    if !is_tournament {
        return Err(ServiceError::InvalidState(
            "only tournament sessions can break for the next day".into(),
        ));
    }

    let starts_at = match request.starts_at.as_deref() {
        Some(raw) => Some(parse_system_time(raw).ok_or_else(|| {
            ServiceError::Validation(format!("`{raw}` is not an RFC3339 timestamp"))
        })?),
        None => None,
    };

    let now = SystemTime::now();
    let state = state.clone();
    let slot_in_work = slot.clone();

    let (summary, _next) = slot
        .run_transition(SessionEvent::BreakForNextDay, move || async move {
            let store = state.require_session_store().await?;

            // Mutate a clone so an aborted break leaves the session untouched.
            let bagged = slot_in_work
                .with_session(|session| {
                    let mut next = session.clone();
                    if next.clock.is_active() {
                        next.clock.pause(now)?;
                    }
                    next.paused_for_next_day = true;
                    next.next_day_starts_at = starts_at;
                    next.touch(now);
                    Ok(next)
                })
                .await?;

            let entity: LiveSessionEntity = bagged.clone().into();
            state.stake_cache().write(bagged.id, &entity.staker_configs);
            store.save_live_session(entity).await?;

            let summary = SessionSummary::from_session(&bagged, now);
            slot_in_work.set_session(bagged).await;
            Ok(summary)
        })
        .await?;

    Ok(summary)
}

/// Resume play on the next tournament day. `current_day` is incremented here,
/// not when the break started.
pub async fn start_next_day(
    state: &SharedState,
    player_id: &str,
) -> Result<SessionSummary, ServiceError> {
    let slot = state.player(player_id);
    require_session(&slot).await?;
    let now = SystemTime::now();

    let state = state.clone();
    let slot_in_work = slot.clone();

    let (summary, _next) = slot
        .run_transition(SessionEvent::StartNextDay, move || async move {
            let summary = slot_in_work
                .with_session_mut(|session| {
                    session.clock.resume(now)?;
                    session.paused_for_next_day = false;
                    session.next_day_starts_at = None;
                    if let Some(tournament) = session.tournament.as_mut() {
                        tournament.current_day += 1;
                    }
                    session.touch(now);
                    Ok(SessionSummary::from_session(session, now))
                })
                .await?;
            persist_live_snapshot(&state, &slot_in_work).await;
            Ok(summary)
        })
        .await?;

    Ok(summary)
}

/// End the session: final ledger entry if the cashout differs, durable
/// historical record, then staking settlement. The in-memory session is
/// cleared only after the record write is confirmed; settlement failures are
/// reported but never block the end.
pub async fn end_session(
    state: &SharedState,
    player_id: &str,
    request: EndSessionRequest,
) -> Result<EndSessionResponse, ServiceError> {
    ensure_non_negative(request.cashout, "cashout")?;
    let slot = state.player(player_id);
    require_session(&slot).await?;
    let now = SystemTime::now();

    let state_in_work = state.clone();
    let slot_in_work = slot.clone();
    let player = player_id.to_owned();

    let (response, _next) = slot
        .run_transition(SessionEvent::EndSession, move || async move {
            let store = state_in_work
                .session_store()
                .await
                .ok_or_else(|| ServiceError::Durability("storage unavailable".into()))?;

            let mut session = slot_in_work
                .read_session(|s| s.cloned())
                .await
                .ok_or(ServiceError::NoActiveSession)?;

            if session.current_amount() != request.cashout {
                session
                    .ledger
                    .append(request.cashout, Some("Final cashout amount".into()), now);
            }

            let elapsed_seconds = session.elapsed(now).as_secs();
            let profit = request.cashout - session.buy_in;

            let record = SessionRecordEntity {
                id: session.id,
                player_id: session.player_id.clone(),
                game_name: session.game_name.clone(),
                stakes_label: session.stakes_label.clone(),
                tournament: session.tournament.clone().map(Into::into),
                buy_in: session.buy_in,
                cashout: request.cashout,
                profit,
                start_time: session.clock.start_time(),
                end_time: now,
                elapsed_seconds,
                days_played: session.current_day(),
                ledger: session
                    .ledger
                    .entries()
                    .iter()
                    .cloned()
                    .map(Into::into)
                    .collect(),
            };

            let record_id = store
                .save_session_record(record)
                .await
                .map_err(|err| ServiceError::Durability(err.to_string()))?;

            // The record is durable; from here on nothing may fail the end.
            let outcome =
                staking_service::settle_configs(store.as_ref(), &session, request.cashout).await;

            if let Err(err) = store.delete_live_session(&player).await {
                warn!(error = %err, "failed to delete live session snapshot after end");
            }
            state_in_work.stake_cache().remove(session.id);

            Ok(EndSessionResponse {
                record_id,
                profit,
                elapsed_seconds,
                stakes_settled: outcome.settled,
                stakes_failed: outcome.failed,
            })
        })
        .await?;

    slot.take_session().await;
    info!(profit = response.profit, "session ended");
    Ok(response)
}

/// Drop the session without producing any historical record. Irreversible.
pub async fn discard_session(
    state: &SharedState,
    player_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let slot = state.player(player_id);
    require_session(&slot).await?;

    let state_in_work = state.clone();
    let slot_in_work = slot.clone();
    let player = player_id.to_owned();

    let (_, _next) = slot
        .run_transition(SessionEvent::DiscardSession, move || async move {
            let session_id = slot_in_work.with_session(|s| Ok(s.id)).await?;

            if let Some(store) = state_in_work.session_store().await {
                if let Err(err) = store.delete_live_session(&player).await {
                    warn!(error = %err, "failed to delete live session snapshot on discard");
                }
            }
            state_in_work.stake_cache().remove(session_id);

            Ok(())
        })
        .await?;

    slot.take_session().await;
    Ok(ActionResponse {
        message: "session discarded".into(),
    })
}

/// The current live session, restored from the persisted snapshot when this
/// process has none in memory (e.g. after a restart or a multi-day break).
pub async fn current_session(
    state: &SharedState,
    player_id: &str,
) -> Result<SessionSummary, ServiceError> {
    let slot = state.player(player_id);
    let now = SystemTime::now();

    let in_memory = slot
        .read_session(|s| s.map(|s| SessionSummary::from_session(s, now)))
        .await;
    if let Some(summary) = in_memory {
        return Ok(summary);
    }

    let Some(store) = state.session_store().await else {
        return Err(ServiceError::NoActiveSession);
    };
    let Some(entity) = store.find_live_session(player_id).await? else {
        return Err(ServiceError::NoActiveSession);
    };

    let session: LiveSession = entity.into();
    let phase = if session.paused_for_next_day {
        SessionPhase::Running(RunningPhase::PausedForNextDay)
    } else if session.clock.is_active() {
        SessionPhase::Running(RunningPhase::Active)
    } else {
        SessionPhase::Running(RunningPhase::Paused)
    };

    let summary = SessionSummary::from_session(&session, now);
    slot.restore(phase, session).await;
    info!(player = %player_id, "restored live session from storage");

    Ok(summary)
}

/// Derived activity feed: merged ledger entries plus the session-start marker.
pub async fn recent_activity(
    state: &SharedState,
    player_id: &str,
) -> Result<Vec<UpdateItem>, ServiceError> {
    let slot = state.player(player_id);
    let window = state.config().merge_window();
    slot.with_session(|session| Ok(activity::build_feed(session, window)))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::{
        config::AppConfig,
        dao::session_store::memory::InMemorySessionStore,
        dto::session::TournamentInput,
        state::{AppState, staking::StakerConfig},
    };

    fn test_config(dir: &tempfile::TempDir) -> AppConfig {
        AppConfig::new(Duration::from_secs(30), dir.path().join("stakes"))
    }

    async fn harness() -> (SharedState, InMemorySessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(test_config(&dir));
        let store = InMemorySessionStore::new();
        state.install_session_store(Arc::new(store.clone())).await;
        (state, store, dir)
    }

    fn cash_request(buy_in: f64) -> StartSessionRequest {
        StartSessionRequest {
            game_name: "Bellagio 2/5".into(),
            stakes_label: "$2/$5 NLH".into(),
            buy_in,
            tournament: None,
        }
    }

    fn tournament_request(buy_in: f64) -> StartSessionRequest {
        StartSessionRequest {
            game_name: "Wynn Classic".into(),
            stakes_label: String::new(),
            buy_in,
            tournament: Some(TournamentInput {
                name: "Wynn Summer Classic #5".into(),
                base_buy_in: buy_in,
                game_type: "NLH".into(),
                format: "Freezeout".into(),
            }),
        }
    }

    #[tokio::test]
    async fn start_seeds_the_cash_ledger_and_persists_a_snapshot() {
        let (state, store, _dir) = harness().await;

        let summary = start_session(&state, "p1", cash_request(500.0)).await.unwrap();
        assert_eq!(summary.buy_in, 500.0);
        assert_eq!(summary.current_stack, 500.0);
        assert!(summary.is_active);

        let snapshot = store.live_session("p1").unwrap();
        assert_eq!(snapshot.ledger.len(), 1);
        assert_eq!(snapshot.ledger[0].amount, 500.0);
    }

    #[tokio::test]
    async fn starting_twice_is_an_illegal_transition() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        let err = start_session(&state, "p1", cash_request(200.0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rebuy_grows_buy_in_and_records_the_new_stack() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();
        quick_update(
            &state,
            "p1",
            ChipUpdateRequest {
                amount: 300.0,
                note: None,
            },
        )
        .await
        .unwrap();

        let summary = rebuy(&state, "p1", RebuyRequest { amount: 200.0 }).await.unwrap();
        assert_eq!(summary.buy_in, 700.0);
        assert_eq!(summary.current_stack, 500.0);

        let slot = state.player("p1");
        let (amount, note) = slot
            .read_session(|s| {
                let last = s.unwrap().ledger.last().unwrap();
                (last.amount, last.note.clone())
            })
            .await;
        assert_eq!(amount, 500.0);
        assert_eq!(note.as_deref(), Some("Rebuy: +$200"));
    }

    #[tokio::test]
    async fn edit_total_buy_in_overwrites_without_touching_the_ledger() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        let summary =
            edit_total_buy_in(&state, "p1", EditBuyInRequest { amount: 350.0 }).await.unwrap();
        assert_eq!(summary.buy_in, 350.0);

        let slot = state.player("p1");
        let entries = slot.read_session(|s| s.unwrap().ledger.entries().len()).await;
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn edit_start_time_moves_the_anchor() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        let summary = edit_start_time(
            &state,
            "p1",
            EditStartTimeRequest {
                start_time: "2020-01-01T00:00:00Z".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.start_time, "2020-01-01T00:00:00Z");
        // Elapsed is recomputed straight-line from the new start.
        assert!(summary.elapsed_seconds > 0);
    }

    #[tokio::test]
    async fn pause_twice_errors_without_flipping_state() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        let paused = pause_session(&state, "p1").await.unwrap();
        assert!(!paused.is_active);

        let err = pause_session(&state, "p1").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let slot = state.player("p1");
        assert!(!slot.read_session(|s| s.unwrap().clock.is_active()).await);
        assert_eq!(
            slot.phase().await,
            SessionPhase::Running(RunningPhase::Paused)
        );

        let resumed = resume_session(&state, "p1").await.unwrap();
        assert!(resumed.is_active);
        let err = resume_session(&state, "p1").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn invalid_amounts_are_rejected() {
        let (state, _store, _dir) = harness().await;

        let err = start_session(&state, "p1", cash_request(0.0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidAmount(_)));

        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        for result in [
            rebuy(&state, "p1", RebuyRequest { amount: -50.0 }).await.err(),
            rebuy(&state, "p1", RebuyRequest { amount: 0.0 }).await.err(),
            quick_update(
                &state,
                "p1",
                ChipUpdateRequest {
                    amount: -5.0,
                    note: None,
                },
            )
            .await
            .err(),
            end_session(&state, "p1", EndSessionRequest { cashout: -1.0 }).await.err(),
        ] {
            assert!(matches!(result, Some(ServiceError::InvalidAmount(_))));
        }
    }

    #[tokio::test]
    async fn operations_without_a_session_report_no_active_session() {
        let (state, _store, _dir) = harness().await;

        let err = rebuy(&state, "ghost", RebuyRequest { amount: 100.0 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoActiveSession));

        let err = recent_activity(&state, "ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::NoActiveSession));
    }

    #[tokio::test]
    async fn end_skips_the_final_entry_when_the_ledger_already_matches() {
        let (state, store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();
        quick_update(
            &state,
            "p1",
            ChipUpdateRequest {
                amount: 650.0,
                note: None,
            },
        )
        .await
        .unwrap();

        let response = end_session(&state, "p1", EndSessionRequest { cashout: 650.0 })
            .await
            .unwrap();
        assert_eq!(response.profit, 150.0);

        let record = store.record(response.record_id).unwrap();
        assert_eq!(record.ledger.len(), 2);
        assert!(
            record
                .ledger
                .iter()
                .all(|e| e.note.as_deref() != Some("Final cashout amount"))
        );
    }

    #[tokio::test]
    async fn end_appends_the_final_entry_when_the_cashout_differs() {
        let (state, store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        let response = end_session(&state, "p1", EndSessionRequest { cashout: 900.0 })
            .await
            .unwrap();
        assert_eq!(response.profit, 400.0);

        let record = store.record(response.record_id).unwrap();
        let last = record.ledger.last().unwrap();
        assert_eq!(last.amount, 900.0);
        assert_eq!(last.note.as_deref(), Some("Final cashout amount"));
        assert_eq!(record.cashout, 900.0);
        assert_eq!(record.buy_in, 500.0);
    }

    #[tokio::test]
    async fn a_failed_record_write_keeps_the_session_for_retry() {
        let (state, store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        store.fail_record_writes(true);
        let err = end_session(&state, "p1", EndSessionRequest { cashout: 650.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Durability(_)));

        // Nothing was lost: the session is still live and can be ended again.
        let slot = state.player("p1");
        assert!(slot.has_session().await);
        assert_eq!(
            slot.phase().await,
            SessionPhase::Running(RunningPhase::Active)
        );

        store.fail_record_writes(false);
        end_session(&state, "p1", EndSessionRequest { cashout: 650.0 })
            .await
            .unwrap();
        assert!(!slot.has_session().await);
        assert_eq!(slot.phase().await, SessionPhase::Setup);
        assert!(store.live_session("p1").is_none());
    }

    #[tokio::test]
    async fn settlement_failures_do_not_block_the_end() {
        let (state, store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(1000.0)).await.unwrap();

        let slot = state.player("p1");
        slot.with_session_mut(|session| {
            let config = StakerConfig {
                is_manual_entry: false,
                staker_user_id: Some("backer-1".into()),
                manual_staker_name: None,
                percentage_sold: "50".into(),
                markup: "1.2".into(),
                original_stake_id: None,
                original_stake_user_id: None,
            };
            session
                .staker_configs
                .insert(config.key().unwrap(), config);
            Ok(())
        })
        .await
        .unwrap();

        store.fail_stake_writes(true);
        let response = end_session(&state, "p1", EndSessionRequest { cashout: 1500.0 })
            .await
            .unwrap();
        assert_eq!(response.stakes_settled, 0);
        assert_eq!(response.stakes_failed, 1);
        // The session still ended and the record is durable.
        assert!(store.record(response.record_id).is_some());
        assert!(!state.player("p1").has_session().await);
    }

    #[tokio::test]
    async fn tournament_day_progression_round_trip() {
        let (state, store, _dir) = harness().await;
        start_session(&state, "p1", tournament_request(1100.0)).await.unwrap();

        let bagged = progress_to_next_day(
            &state,
            "p1",
            NextDayRequest {
                starts_at: Some("2026-08-07T12:00:00Z".into()),
            },
        )
        .await
        .unwrap();
        assert!(bagged.paused_for_next_day);
        assert!(!bagged.is_active);
        assert_eq!(bagged.tournament.as_ref().unwrap().current_day, 1);
        assert_eq!(
            bagged.next_day_starts_at.as_deref(),
            Some("2026-08-07T12:00:00Z")
        );

        // The break state reached storage before the transition committed.
        let snapshot = store.live_session("p1").unwrap();
        assert!(snapshot.paused_for_next_day);

        // Day N+1 starts when the player actually resumes.
        let resumed = start_next_day(&state, "p1").await.unwrap();
        assert!(resumed.is_active);
        assert!(!resumed.paused_for_next_day);
        assert_eq!(resumed.tournament.as_ref().unwrap().current_day, 2);
        assert_eq!(resumed.next_day_starts_at, None);
    }

    #[tokio::test]
    async fn cash_sessions_cannot_break_for_the_next_day() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        let err = progress_to_next_day(&state, "p1", NextDayRequest { starts_at: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn a_break_without_storage_is_aborted() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", tournament_request(1100.0)).await.unwrap();
        state.clear_session_store().await;

        let err = progress_to_next_day(&state, "p1", NextDayRequest { starts_at: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));

        let slot = state.player("p1");
        assert_eq!(
            slot.phase().await,
            SessionPhase::Running(RunningPhase::Active)
        );
        assert!(!slot.read_session(|s| s.unwrap().paused_for_next_day).await);
    }

    #[tokio::test]
    async fn discard_leaves_no_trace() {
        let (state, store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();

        discard_session(&state, "p1").await.unwrap();
        assert!(!state.player("p1").has_session().await);
        assert!(store.live_session("p1").is_none());
        assert_eq!(store.stakes().len(), 0);
    }

    #[tokio::test]
    async fn current_session_restores_the_persisted_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemorySessionStore::new();

        // A previous process run left a paused snapshot behind.
        {
            let state = AppState::new(test_config(&dir));
            state.install_session_store(Arc::new(store.clone())).await;
            start_session(&state, "p1", cash_request(500.0)).await.unwrap();
            pause_session(&state, "p1").await.unwrap();
        }

        let state = AppState::new(test_config(&dir));
        state.install_session_store(Arc::new(store.clone())).await;

        let summary = current_session(&state, "p1").await.unwrap();
        assert_eq!(summary.buy_in, 500.0);
        assert!(!summary.is_active);

        let slot = state.player("p1");
        assert_eq!(
            slot.phase().await,
            SessionPhase::Running(RunningPhase::Paused)
        );
        // The restored machine accepts the next legal transition.
        resume_session(&state, "p1").await.unwrap();
    }

    #[tokio::test]
    async fn recent_activity_ends_with_the_start_marker() {
        let (state, _store, _dir) = harness().await;
        start_session(&state, "p1", cash_request(500.0)).await.unwrap();
        quick_update(
            &state,
            "p1",
            ChipUpdateRequest {
                amount: 620.0,
                note: Some("Quick add: +$120".into()),
            },
        )
        .await
        .unwrap();

        let feed = recent_activity(&state, "p1").await.unwrap();
        assert!(feed.len() >= 2);
        assert_eq!(
            feed.last().unwrap().note.as_deref(),
            Some("Session started: Bellagio 2/5 ($2/$5 NLH)")
        );
    }
}
