//! Shared runtime state: one slot per player, each owning its session state
//! machine, the optional live session, and a gate serialising transitions.

pub mod clock;
pub mod ledger;
pub mod session;
pub mod staking;
pub mod state_machine;

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::{cache::StakeConfigCache, session_store::SessionStore},
    error::ServiceError,
    state::{
        session::LiveSession,
        state_machine::{SessionEvent, SessionPhase, SessionStateMachine},
    },
};

pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Upper bound on the persistence work a single transition may perform.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state storing player slots and the storage handle.
pub struct AppState {
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    config: AppConfig,
    stake_cache: StakeConfigCache,
    players: DashMap<String, Arc<PlayerSlot>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let stake_cache = StakeConfigCache::new(config.cache_dir().to_path_buf());
        Arc::new(Self {
            session_store: RwLock::new(None),
            config,
            stake_cache,
            players: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Local best-effort cache for staker configurations.
    pub fn stake_cache(&self) -> &StakeConfigCache {
        &self.stake_cache
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Session store handle, or `Degraded` when none is installed.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn install_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        if self.is_degraded() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }

    /// Slot for `player_id`, created on first use.
    pub fn player(&self, player_id: &str) -> Arc<PlayerSlot> {
        self.players
            .entry(player_id.to_owned())
            .or_insert_with(|| Arc::new(PlayerSlot::new()))
            .clone()
    }
}

/// Per-player state: the session state machine, the live session, and a gate
/// ensuring one transition at a time for this player. Callers are expected to
/// issue one logical sequence of operations per player; the gate enforces it
/// for transitions.
pub struct PlayerSlot {
    machine: RwLock<SessionStateMachine>,
    session: RwLock<Option<LiveSession>>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl Default for PlayerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerSlot {
    /// Fresh slot in the setup phase with no session.
    pub fn new() -> Self {
        Self {
            machine: RwLock::new(SessionStateMachine::new()),
            session: RwLock::new(None),
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        }
    }

    /// Snapshot the current phase of this player's state machine.
    pub async fn phase(&self) -> SessionPhase {
        self.machine.read().await.phase()
    }

    /// Snapshot of the state machine including any pending transition.
    pub async fn snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    /// Whether a live session currently exists in this slot.
    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Read access to the optional live session.
    pub async fn read_session<R>(&self, f: impl FnOnce(Option<&LiveSession>) -> R) -> R {
        let guard = self.session.read().await;
        f(guard.as_ref())
    }

    /// Run `f` against the live session, or fail with `NoActiveSession`.
    pub async fn with_session<R>(
        &self,
        f: impl FnOnce(&LiveSession) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let guard = self.session.read().await;
        match guard.as_ref() {
            Some(session) => f(session),
            None => Err(ServiceError::NoActiveSession),
        }
    }

    /// Mutate the live session, or fail with `NoActiveSession`.
    pub async fn with_session_mut<R>(
        &self,
        f: impl FnOnce(&mut LiveSession) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let mut guard = self.session.write().await;
        match guard.as_mut() {
            Some(session) => f(session),
            None => Err(ServiceError::NoActiveSession),
        }
    }

    /// Install a live session into the slot.
    pub async fn set_session(&self, session: LiveSession) {
        let mut guard = self.session.write().await;
        *guard = Some(session);
    }

    /// Remove and return the live session.
    pub async fn take_session(&self) -> Option<LiveSession> {
        let mut guard = self.session.write().await;
        guard.take()
    }

    /// Reinstate a persisted session and force the machine to its phase.
    /// Only used by the load-after-restart path.
    pub async fn restore(&self, phase: SessionPhase, session: LiveSession) {
        {
            let mut machine = self.machine.write().await;
            *machine = SessionStateMachine::restore(phase);
        }
        self.set_session(session).await;
    }

    /// Plan a transition on this slot's state machine, returning the plan.
    async fn plan_transition(&self, event: SessionEvent) -> Result<Plan, PlanError> {
        let mut sm = self.machine.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let mut sm = self.machine.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition on this slot's state machine.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.machine.write().await;
        sm.abort(plan_id)
    }

    /// Validate `event`, run `work`, then commit the phase change. When
    /// `work` fails or times out the plan is aborted and the slot untouched.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: SessionEvent,
        work: F,
    ) -> Result<(T, SessionPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}
