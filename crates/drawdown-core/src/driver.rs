//! Event driver for a drawdown form
//!
//! Hosts push [`FormEvent`]s through a [`FormHandle`]; the [`FormDriver`]
//! takes them off the queue one at a time and runs each to completion before
//! the next. State snapshots are published on a watch channel after every
//! event so views can re-render.

use crate::error::FormError;
use crate::form::{DrawdownForm, SubmitOutcome};
use crate::state::FormState;
use crate::types::{ActivityId, CaseId};
use tokio::sync::{mpsc, oneshot, watch};

/// Reply channel for a submit event
pub type SubmitReply = oneshot::Sender<Result<SubmitOutcome, FormError>>;

/// Events a host can send to a form
#[derive(Debug)]
pub enum FormEvent {
    /// Activity id input changed
    RecordIdChanged(Option<ActivityId>),
    /// Case override input changed
    CaseOverrideChanged(Option<CaseId>),
    /// Amount field edited
    AmountEdited(String),
    /// Submit pressed
    Submit(Option<SubmitReply>),
    /// Host saved the record itself
    Saved,
    /// Cancel pressed
    Cancel,
}

/// Sending side of a running form
#[derive(Debug, Clone)]
pub struct FormHandle {
    sender: mpsc::Sender<FormEvent>,
    state: watch::Receiver<FormState>,
}

impl FormHandle {
    /// Queue an event
    pub async fn send(&self, event: FormEvent) -> Result<(), FormError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| FormError::DriverClosed)
    }

    /// Queue an amount edit
    pub async fn edit_amount(&self, raw: impl Into<String>) -> Result<(), FormError> {
        self.send(FormEvent::AmountEdited(raw.into())).await
    }

    /// Queue a cancel
    pub async fn cancel(&self) -> Result<(), FormError> {
        self.send(FormEvent::Cancel).await
    }

    /// Queue a submit and wait for its outcome
    pub async fn submit(&self) -> Result<SubmitOutcome, FormError> {
        let (reply, outcome) = oneshot::channel();
        self.send(FormEvent::Submit(Some(reply))).await?;
        outcome.await.map_err(|_| FormError::DriverClosed)?
    }

    /// Latest published state
    #[must_use]
    pub fn state(&self) -> FormState {
        self.state.borrow().clone()
    }

    /// Subscribe to state snapshots
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.clone()
    }
}

/// Receiving side; owns the form
pub struct FormDriver {
    form: DrawdownForm,
    events: mpsc::Receiver<FormEvent>,
    publisher: watch::Sender<FormState>,
}

impl FormDriver {
    /// Wrap a form with an event queue of the given depth
    #[must_use]
    pub fn new(form: DrawdownForm, queue_depth: usize) -> (Self, FormHandle) {
        let (sender, events) = mpsc::channel(queue_depth.max(1));
        let (publisher, state) = watch::channel(form.state().clone());
        let driver = Self {
            form,
            events,
            publisher,
        };
        (driver, FormHandle { sender, state })
    }

    /// Handle events until every handle is dropped, then hand the form back
    pub async fn run(mut self) -> DrawdownForm {
        tracing::debug!("Form driver started");
        while let Some(event) = self.events.recv().await {
            let reply = self.dispatch(event).await;
            self.publisher.send_replace(self.form.state().clone());
            if let Some((reply, outcome)) = reply {
                // Caller may have stopped waiting.
                let _ = reply.send(outcome);
            }
        }
        tracing::debug!("Form driver stopped");
        self.form
    }

    async fn dispatch(
        &mut self,
        event: FormEvent,
    ) -> Option<(SubmitReply, Result<SubmitOutcome, FormError>)> {
        let mut pending = None;
        let result = match event {
            FormEvent::RecordIdChanged(id) => self.form.set_record_id(id).await,
            FormEvent::CaseOverrideChanged(id) => self.form.set_case_override(id).await,
            FormEvent::AmountEdited(raw) => {
                self.form.edit_amount(&raw);
                Ok(())
            }
            FormEvent::Submit(reply) => {
                let outcome = self.form.submit().await;
                let result = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
                pending = reply.map(|reply| (reply, outcome));
                result
            }
            FormEvent::Saved => {
                self.form.handle_success();
                Ok(())
            }
            FormEvent::Cancel => {
                self.form.cancel();
                Ok(())
            }
        };

        if let Err(err) = result {
            // Already surfaced inline and, where applicable, notified.
            tracing::debug!("Form event finished with error: {}", err);
        }
        pending
    }
}
