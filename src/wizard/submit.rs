//! Final submission of a wizard session.
//!
//! Submission is split in two so the "in flight" window is observable:
//! [`WizardSession::begin_submit`] validates every step and raises the
//! submitting flag, [`WizardSession::finish_submit`] lowers it again. The
//! async [`WizardSession::submit`] drives both around a caller supplied
//! completion future and guarantees the flag is lowered on every exit path.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::wizard::schema::ValidationErrors;
use crate::wizard::session::WizardSession;
use crate::wizard::values::FormValues;

/// Reason a submit request was refused before the completion callback ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitBlocked {
    AlreadySubmitting,
    NotOnLastStep { current: usize, last: usize },
    /// `step` is the first step whose values no longer validate.
    Invalid { step: usize, errors: ValidationErrors },
    Closed,
}

impl fmt::Display for SubmitBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitBlocked::AlreadySubmitting => write!(f, "a submission is already in flight"),
            SubmitBlocked::NotOnLastStep { current, last } => {
                write!(f, "on step {} of {}", current + 1, last + 1)
            }
            SubmitBlocked::Invalid { step, errors } => {
                write!(f, "step {} is invalid: {}", step + 1, errors)
            }
            SubmitBlocked::Closed => write!(f, "wizard already completed"),
        }
    }
}

/// Values handed out by a successful [`WizardSession::begin_submit`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    session_id: Uuid,
    values: FormValues,
}

impl SubmitTicket {
    pub(crate) fn new(session_id: Uuid, values: FormValues) -> Self {
        Self { session_id, values }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn into_values(self) -> FormValues {
        self.values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    Completed(T),
    Blocked(SubmitBlocked),
}

impl<T> SubmitOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            SubmitOutcome::Completed(value) => Some(value),
            SubmitOutcome::Blocked(_) => None,
        }
    }
}

/// Failure of the completion callback. The caller's error type is carried
/// through untouched.
#[derive(Debug, Error)]
pub enum SubmitError<E> {
    #[error("submission rejected: {0}")]
    Rejected(E),
    #[error("submission timed out after {0:?}")]
    TimedOut(Duration),
}

/// Lowers the submitting flag if the submit future is dropped mid-flight.
struct InFlight<'a> {
    session: &'a mut WizardSession,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, succeeded: bool) {
        self.settled = true;
        self.session.finish_submit(succeeded);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(wizard = %self.session.name(), "submission dropped before settling");
            self.session.finish_submit(false);
        }
    }
}

impl WizardSession {
    /// Validates every step, runs `on_complete` with the aggregate values
    /// and settles the session. A rejection leaves the session editable on
    /// the last step and is returned to the caller.
    pub async fn submit<F, Fut, T, E>(
        &mut self,
        on_complete: F,
    ) -> Result<SubmitOutcome<T>, SubmitError<E>>
    where
        F: FnOnce(FormValues) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ticket = match self.begin_submit() {
            Ok(ticket) => ticket,
            Err(blocked) => {
                tracing::debug!(wizard = %self.name(), reason = %blocked, "submit blocked");
                return Ok(SubmitOutcome::Blocked(blocked));
            }
        };
        let timeout = self.options().submit_timeout;
        let guard = InFlight {
            session: self,
            settled: false,
        };

        let pending = on_complete(ticket.into_values());
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(settled) => settled.map_err(SubmitError::Rejected),
                Err(_) => Err(SubmitError::TimedOut(limit)),
            },
            None => pending.await.map_err(SubmitError::Rejected),
        };

        if let Err(SubmitError::TimedOut(limit)) = &result {
            tracing::warn!(wizard = %guard.session.name(), ?limit, "completion callback timed out");
        }
        guard.settle(result.is_ok());
        result.map(SubmitOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::schema::{FieldSchema, ObjectSchema};
    use crate::wizard::session::{WizardOptions, WizardState};
    use crate::wizard::step::Step;

    fn on_last_step(options: WizardOptions) -> WizardSession {
        let steps = vec![
            Step::new("Amount")
                .with_schema(ObjectSchema::new().field("amount", FieldSchema::number().min(0.0))),
            Step::new("Confirm")
                .with_schema(ObjectSchema::new().field("agree", FieldSchema::boolean())),
        ];
        let mut session =
            WizardSession::new("submit", steps, FormValues::new(), options).unwrap();
        session.update_field("amount", 10).unwrap();
        session.update_field("agree", true).unwrap();
        session.go_next();
        session
    }

    #[tokio::test]
    async fn successful_completion_closes_the_session() {
        let mut session = on_last_step(WizardOptions::default());
        let outcome = session
            .submit(|values| async move {
                Ok::<_, String>(values.get_f64("amount").unwrap_or_default())
            })
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Completed(10.0));
        assert_eq!(session.state(), WizardState::Done);
        assert!(!session.is_submitting());
    }

    #[tokio::test]
    async fn rejection_returns_to_last_step() {
        let mut session = on_last_step(WizardOptions::default());
        let err = session
            .submit(|_| async { Err::<(), _>("network error") })
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Rejected("network error")));
        assert_eq!(err.to_string(), "submission rejected: network error");
        assert!(!session.is_submitting());
        assert_eq!(session.state(), WizardState::Editing(1));

        // The user can retry.
        let retry = session.submit(|_| async { Ok::<_, String>(()) }).await;
        assert!(matches!(retry, Ok(SubmitOutcome::Completed(()))));
    }

    #[tokio::test]
    async fn flag_is_raised_only_while_callback_runs() {
        let mut session = on_last_step(WizardOptions::default());
        assert!(!session.is_submitting());
        let observed = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen = observed.clone();
        session
            .submit(|_| async move {
                seen.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await
            .unwrap();
        assert!(observed.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!session.is_submitting());
    }

    #[tokio::test]
    async fn invalid_last_step_is_blocked_without_calling_back() {
        let mut session = on_last_step(WizardOptions::default());
        session.update_field("agree", "yes").unwrap();
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = called.clone();
        let outcome = session
            .submit(|_| async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await
            .unwrap();
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
        match outcome {
            SubmitOutcome::Blocked(SubmitBlocked::Invalid { step, errors }) => {
                assert_eq!(step, 1);
                assert_eq!(errors.first("agree"), Some("Expected true or false"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!session.is_submitting());
    }

    #[tokio::test]
    async fn earlier_step_edited_after_validation_blocks_submit() {
        let mut session = on_last_step(WizardOptions {
            allow_skip_steps: true,
            ..WizardOptions::default()
        });
        session.go_back();
        session.update_field("amount", -5).unwrap();
        assert_eq!(session.go_to_step(1), Ok(1));

        let received = std::sync::Arc::new(std::sync::Mutex::new(None));
        let sink = received.clone();
        let outcome = session
            .submit(|values| async move {
                *sink.lock().unwrap() = values.get_f64("amount");
                Ok::<_, String>(())
            })
            .await
            .unwrap();
        assert!(received.lock().unwrap().is_none());
        match outcome {
            SubmitOutcome::Blocked(blocked @ SubmitBlocked::Invalid { step: 0, .. }) => {
                assert_eq!(blocked.to_string(), "step 1 is invalid: amount: Must be 0 or more");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.state(), WizardState::Editing(1));
    }

    #[tokio::test]
    async fn submit_off_the_last_step_is_blocked() {
        let steps = vec![Step::new("One"), Step::new("Two")];
        let mut session =
            WizardSession::new("early", steps, FormValues::new(), WizardOptions::default())
                .unwrap();
        let outcome = session
            .submit(|_| async { Ok::<_, String>(()) })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Blocked(SubmitBlocked::NotOnLastStep { current: 0, last: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_callback_times_out() {
        let mut session = on_last_step(WizardOptions {
            submit_timeout: Some(Duration::from_secs(5)),
            ..WizardOptions::default()
        });
        let err = session
            .submit(|_| std::future::pending::<Result<(), String>>())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::TimedOut(limit) if limit == Duration::from_secs(5)));
        assert!(!session.is_submitting());
        assert_eq!(session.state(), WizardState::Editing(1));
    }
}
