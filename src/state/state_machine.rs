use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// High-level phases a player's session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No live session; a new one can be configured and started.
    Setup,
    /// A session exists and is in one of the running sub-phases.
    Running(RunningPhase),
}

/// Fine-grained phase while a session is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningPhase {
    /// Clock running, play in progress.
    Active,
    /// Ordinary pause; the player intends to resume the same day.
    Paused,
    /// Multi-day tournament break; resuming starts the next day.
    PausedForNextDay,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Player starts a new session from setup.
    StartSession,
    /// Stop the clock without ending the session.
    Pause,
    /// Restart the clock after an ordinary pause.
    Resume,
    /// Bag up for the night; the session continues on another day.
    BreakForNextDay,
    /// Resume play on the scheduled next day.
    StartNextDay,
    /// Finish the session and persist the historical record.
    EndSession,
    /// Drop the session without persisting anything.
    DiscardSession,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: SessionPhase,
    /// Phase the state machine will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: SessionPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<SessionPhase>,
}

/// State machine enforcing the legal session lifecycle.
///
/// Transitions follow a plan/apply/abort protocol: `plan` validates the event
/// against the current phase, the caller performs whatever persistence work
/// the transition requires, then `apply` commits (or `abort` rolls back) the
/// phase change. The end-of-session durability rule falls out of this shape:
/// the session leaves `Running` only once its historical write succeeded.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Setup,
            version: 0,
            pending: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the setup state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a machine at `phase`, used when restoring a persisted live
    /// session after a restart.
    pub fn restore(phase: SessionPhase) -> Self {
        Self {
            phase,
            version: 0,
            pending: None,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use RunningPhase::*;
        use SessionEvent::*;
        use SessionPhase::*;

        let next = match (self.phase, event) {
            (Setup, StartSession) => Running(Active),
            (Running(Active), Pause) => Running(Paused),
            (Running(Paused), Resume) => Running(Active),
            (Running(Active), BreakForNextDay) => Running(PausedForNextDay),
            (Running(Paused), BreakForNextDay) => Running(PausedForNextDay),
            (Running(PausedForNextDay), StartNextDay) => Running(Active),
            (Running(_), EndSession) => Setup,
            (Running(_), DiscardSession) => Setup,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_setup() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Setup);
    }

    #[test]
    fn full_happy_path_through_a_cash_session() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(
            apply(&mut sm, SessionEvent::StartSession),
            SessionPhase::Running(RunningPhase::Active)
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Pause),
            SessionPhase::Running(RunningPhase::Paused)
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Resume),
            SessionPhase::Running(RunningPhase::Active)
        );
        assert_eq!(apply(&mut sm, SessionEvent::EndSession), SessionPhase::Setup);
    }

    #[test]
    fn tournament_day_progression() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::StartSession);
        apply(&mut sm, SessionEvent::Pause);

        assert_eq!(
            apply(&mut sm, SessionEvent::BreakForNextDay),
            SessionPhase::Running(RunningPhase::PausedForNextDay)
        );
        // An ordinary resume is not how a next day starts.
        let err = sm.plan(SessionEvent::Resume).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));

        assert_eq!(
            apply(&mut sm, SessionEvent::StartNextDay),
            SessionPhase::Running(RunningPhase::Active)
        );
        assert_eq!(apply(&mut sm, SessionEvent::EndSession), SessionPhase::Setup);
    }

    #[test]
    fn pause_twice_is_an_invalid_transition() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::StartSession);
        apply(&mut sm, SessionEvent::Pause);

        let err = sm.plan(SessionEvent::Pause).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(
                    invalid.from,
                    SessionPhase::Running(RunningPhase::Paused)
                );
                assert_eq!(invalid.event, SessionEvent::Pause);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The rejected plan left no pending transition behind.
        assert_eq!(sm.snapshot().pending, None);
    }

    #[test]
    fn operations_require_a_running_session() {
        let mut sm = SessionStateMachine::new();
        for event in [
            SessionEvent::Pause,
            SessionEvent::Resume,
            SessionEvent::BreakForNextDay,
            SessionEvent::StartNextDay,
            SessionEvent::EndSession,
        ] {
            let err = sm.plan(event).unwrap_err();
            assert!(matches!(err, PlanError::InvalidTransition(_)), "{event:?}");
        }
    }

    #[test]
    fn discard_returns_to_setup_from_any_running_phase() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::StartSession);
        apply(&mut sm, SessionEvent::BreakForNextDay);
        assert_eq!(
            apply(&mut sm, SessionEvent::DiscardSession),
            SessionPhase::Setup
        );
    }

    #[test]
    fn abort_clears_pending_and_keeps_the_phase() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::StartSession).unwrap();
        sm.abort(plan.id).unwrap();
        assert_eq!(sm.phase(), SessionPhase::Setup);
        assert_eq!(sm.snapshot().pending, None);

        // A fresh plan can be made after the abort.
        assert!(sm.plan(SessionEvent::StartSession).is_ok());
    }

    #[test]
    fn apply_with_wrong_plan_id_is_rejected() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::StartSession).unwrap();
        let bogus = Uuid::new_v4();
        match sm.apply(bogus).unwrap_err() {
            ApplyError::IdMismatch { expected, got } => {
                assert_eq!(expected, plan.id);
                assert_eq!(got, bogus);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The pending plan survives a mismatched apply.
        assert!(sm.apply(plan.id).is_ok());
    }
}
