//! Submission state machine.
//!
//! `Idle → Validating → Submitting(progress) → Success | Failed`. Each submit intent
//! opens a new attempt id; events tagged with an older id are refused so a late
//! callback from a superseded attempt cannot overwrite the current state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use beyond_api_client::Acknowledgment;
use beyond_core::{FieldErrors, SubmissionError};
use thiserror::Error;
use tokio::sync::watch;

pub type AttemptId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting { progress: u8 },
    Success(Acknowledgment),
    Failed(SubmissionError),
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::Submitting { .. } => "submitting",
            SubmissionState::Success(_) => "success",
            SubmissionState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Success(_) | SubmissionState::Failed(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SubmissionState::Validating | SubmissionState::Submitting { .. }
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Submitting { progress } => write!(f, "submitting ({}%)", progress),
            SubmissionState::Failed(e) => write!(f, "failed: {}", e),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {event} while {state}")]
    Invalid {
        state: &'static str,
        event: &'static str,
    },

    #[error("attempt {0} has been superseded")]
    StaleAttempt(AttemptId),
}

/// Publishes the current `SubmissionState` to subscribers.
#[derive(Debug)]
pub struct SubmissionMachine {
    tx: watch::Sender<SubmissionState>,
    attempt: AtomicU64,
}

impl Default for SubmissionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SubmissionState::Idle);
        Self {
            tx,
            attempt: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.tx.subscribe()
    }

    /// Id of the most recent attempt, if any was started.
    pub fn current_attempt(&self) -> Option<AttemptId> {
        match self.attempt.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    /// Submit intent. Always re-enters at `Validating`; a pending attempt is
    /// superseded and its late events are refused as stale.
    pub fn begin(&self) -> AttemptId {
        let mut superseded = None;
        let mut id = 0;
        self.tx.send_modify(|state| {
            if state.is_busy() {
                superseded = self.current_attempt();
            }
            id = self.attempt.fetch_add(1, Ordering::AcqRel) + 1;
            *state = SubmissionState::Validating;
        });
        match superseded {
            Some(old) => {
                tracing::info!(attempt = id, superseded = old, "Submission attempt restarted")
            }
            None => tracing::debug!(attempt = id, "Submission attempt started"),
        }
        id
    }

    /// Drop a pending attempt back to `Idle`. No-op once it is terminal or superseded.
    pub fn abandon(&self, attempt: AttemptId) -> bool {
        let abandoned = self.tx.send_if_modified(|state| {
            if self.attempt.load(Ordering::Acquire) != attempt || !state.is_busy() {
                return false;
            }
            *state = SubmissionState::Idle;
            true
        });
        if abandoned {
            tracing::info!(attempt, "Submission attempt abandoned");
        }
        abandoned
    }

    pub fn validation_failed(
        &self,
        attempt: AttemptId,
        errors: FieldErrors,
    ) -> Result<(), TransitionError> {
        self.transition(attempt, "fail validation", |state| match state {
            SubmissionState::Validating => {
                Some(SubmissionState::Failed(SubmissionError::Validation(errors)))
            }
            _ => None,
        })
    }

    pub fn validation_passed(&self, attempt: AttemptId) -> Result<(), TransitionError> {
        self.transition(attempt, "pass validation", |state| match state {
            SubmissionState::Validating => Some(SubmissionState::Submitting { progress: 0 }),
            _ => None,
        })
    }

    /// Raise progress. Lower values than the current one are ignored.
    pub fn progress(&self, attempt: AttemptId, percent: u8) -> Result<(), TransitionError> {
        let percent = percent.min(100);
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| {
            if self.attempt.load(Ordering::Acquire) != attempt {
                outcome = Err(TransitionError::StaleAttempt(attempt));
                return false;
            }
            match state {
                SubmissionState::Submitting { progress } if percent > *progress => {
                    *progress = percent;
                    true
                }
                SubmissionState::Submitting { .. } => false,
                other => {
                    outcome = Err(TransitionError::Invalid {
                        state: other.name(),
                        event: "report progress",
                    });
                    false
                }
            }
        });
        outcome
    }

    pub fn succeed(&self, attempt: AttemptId, ack: Acknowledgment) -> Result<(), TransitionError> {
        self.transition(attempt, "succeed", |state| match state {
            SubmissionState::Submitting { .. } => Some(SubmissionState::Success(ack)),
            _ => None,
        })
    }

    pub fn fail(&self, attempt: AttemptId, error: SubmissionError) -> Result<(), TransitionError> {
        self.transition(attempt, "fail", |state| match state {
            SubmissionState::Validating | SubmissionState::Submitting { .. } => {
                Some(SubmissionState::Failed(error))
            }
            _ => None,
        })
    }

    /// Back to `Idle` from a terminal state.
    pub fn reset(&self) -> Result<(), TransitionError> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| {
            if state.is_busy() {
                outcome = Err(TransitionError::Invalid {
                    state: state.name(),
                    event: "reset",
                });
                return false;
            }
            let changed = *state != SubmissionState::Idle;
            *state = SubmissionState::Idle;
            changed
        });
        outcome
    }

    fn transition<F>(
        &self,
        attempt: AttemptId,
        event: &'static str,
        next: F,
    ) -> Result<(), TransitionError>
    where
        F: FnOnce(&SubmissionState) -> Option<SubmissionState>,
    {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| {
            if self.attempt.load(Ordering::Acquire) != attempt {
                outcome = Err(TransitionError::StaleAttempt(attempt));
                return false;
            }
            match next(state) {
                Some(new_state) => {
                    tracing::debug!(
                        attempt,
                        from = state.name(),
                        to = new_state.name(),
                        "Submission state transition"
                    );
                    *state = new_state;
                    true
                }
                None => {
                    outcome = Err(TransitionError::Invalid {
                        state: state.name(),
                        event,
                    });
                    false
                }
            }
        });
        outcome
    }
}
