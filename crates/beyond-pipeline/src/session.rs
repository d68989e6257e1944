//! A draft, its state machine and the orchestrator that submits it.

use std::sync::Arc;

use beyond_core::{Draft, TokenProvider};
use tokio::sync::watch;

use crate::orchestrator::Orchestrator;
use crate::progress::PercentTracker;
use crate::state::{AttemptId, SubmissionMachine, SubmissionState, TransitionError};

/// Returns the machine to `Idle` if the attempt never reached a terminal state.
struct PendingAttempt<'a> {
    machine: &'a SubmissionMachine,
    attempt: AttemptId,
}

impl Drop for PendingAttempt<'_> {
    fn drop(&mut self) {
        self.machine.abandon(self.attempt);
    }
}

pub struct SubmissionSession {
    draft: Draft,
    machine: Arc<SubmissionMachine>,
    orchestrator: Arc<Orchestrator>,
}

impl SubmissionSession {
    pub fn new(draft: Draft, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            draft,
            machine: Arc::new(SubmissionMachine::new()),
            orchestrator,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Field edits between attempts.
    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn state(&self) -> SubmissionState {
        self.machine.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.machine.subscribe()
    }

    pub fn machine(&self) -> Arc<SubmissionMachine> {
        self.machine.clone()
    }

    /// Validate and submit the draft, returning the terminal state.
    ///
    /// On success the draft is reset and its previews released; on failure it is
    /// left exactly as it was so the user can correct and retry. Dropping the
    /// returned future abandons the attempt and leaves the session `Idle`.
    pub async fn submit(
        &mut self,
        tokens: &dyn TokenProvider,
    ) -> Result<SubmissionState, TransitionError> {
        let attempt = self.machine.begin();
        let _pending = PendingAttempt {
            machine: &self.machine,
            attempt,
        };

        if let Err(errors) = self.draft.validate() {
            tracing::info!(attempt, fields = %errors, "Draft failed validation");
            self.machine.validation_failed(attempt, errors)?;
            return Ok(self.machine.state());
        }
        self.machine.validation_passed(attempt)?;

        let machine = self.machine.clone();
        let tracker = PercentTracker::new(move |percent| {
            if let Err(e) = machine.progress(attempt, percent) {
                tracing::debug!(attempt, error = %e, "Progress update dropped");
            }
        });

        let result = self
            .orchestrator
            .submit(&self.draft, tokens, Arc::new(tracker))
            .await;

        match result {
            Ok(ack) => {
                self.machine.succeed(attempt, ack)?;
                self.draft.reset();
            }
            Err(error) => self.machine.fail(attempt, error)?,
        }

        Ok(self.machine.state())
    }
}
