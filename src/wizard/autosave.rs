//! Debounced, best-effort draft persistence.
//!
//! Every [`AutoSaver::schedule`] call replaces the pending draft and restarts
//! the timer, so only the last draft inside one delay window reaches the
//! sink. Sink failures are logged and dropped; there is no retry.
//!
//! Writes happen while the pending slot is locked. Once `flush` or `cancel`
//! returns, no earlier draft is still being written.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::Result;
use crate::wizard::values::FormValues;

/// Snapshot of a wizard's progress written by autosave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub wizard: String,
    pub session_id: Uuid,
    pub step: usize,
    pub values: FormValues,
    pub saved_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(wizard: impl Into<String>, session_id: Uuid, step: usize, values: FormValues) -> Self {
        Self {
            wizard: wizard.into(),
            session_id,
            step,
            values,
            saved_at: Utc::now(),
        }
    }
}

/// Persistence target for drafts. Delivery is not guaranteed.
pub trait DraftSink: Send + Sync {
    fn persist(&self, draft: &Draft) -> Result<()>;
}

type Slot = Arc<Mutex<Option<Draft>>>;

pub struct AutoSaver {
    sink: Arc<dyn DraftSink>,
    delay: Duration,
    latest: Slot,
    pending: Option<JoinHandle<()>>,
}

impl AutoSaver {
    pub fn new(sink: Arc<dyn DraftSink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            latest: Arc::new(Mutex::new(None)),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces the pending draft and restarts the debounce timer.
    pub fn schedule(&mut self, draft: Draft) {
        replace_slot(&self.latest, Some(draft));
        self.abort_timer();

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("autosave skipped: no async runtime available");
            return;
        };

        let sink = Arc::clone(&self.sink);
        let slot = Arc::clone(&self.latest);
        let delay = self.delay;
        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut pending = lock_slot(&slot);
            if let Some(draft) = pending.take() {
                write_draft(sink.as_ref(), &draft);
            }
        }));
    }

    /// True while a scheduled draft has not been handed to the sink.
    pub fn has_pending(&self) -> bool {
        lock_slot(&self.latest).is_some()
    }

    /// Persists the pending draft immediately, bypassing the timer.
    pub fn flush(&mut self) -> Result<bool> {
        self.abort_timer();
        let mut pending = lock_slot(&self.latest);
        match pending.take() {
            Some(draft) => {
                self.sink.persist(&draft)?;
                tracing::info!(wizard = %draft.wizard, step = draft.step, "draft flushed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops the pending draft without persisting it. Waits for a write
    /// already in progress.
    pub fn cancel(&mut self) {
        self.abort_timer();
        replace_slot(&self.latest, None);
    }

    fn abort_timer(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.abort_timer();
    }
}

fn lock_slot(slot: &Mutex<Option<Draft>>) -> MutexGuard<'_, Option<Draft>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn replace_slot(slot: &Mutex<Option<Draft>>, value: Option<Draft>) -> Option<Draft> {
    std::mem::replace(&mut *lock_slot(slot), value)
}

fn write_draft(sink: &dyn DraftSink, draft: &Draft) {
    match sink.persist(draft) {
        Ok(()) => tracing::info!(wizard = %draft.wizard, step = draft.step, "draft autosaved"),
        Err(err) => tracing::warn!(wizard = %draft.wizard, error = %err, "autosave failed"),
    }
}
