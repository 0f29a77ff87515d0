//! Drawdown form controller
//!
//! Owns the form state and the three boundary ports. Record loads follow the
//! identifier bindings; edits, submit and cancel run the pure state handlers
//! and then perform whatever side effects the result calls for.

use crate::binding::{BindingChange, IdBinding};
use crate::config::{FormConfig, FormInputs};
use crate::error::{FormError, RecordKind};
use crate::ports::{
    FlowAction, Notification, NotificationSink, RecordStore, Severity, WorkflowHost,
};
use crate::state::FormState;
use crate::state_machine::FormPhase;
use crate::types::{decimal_to_json, ActivityId, CaseId, FieldValues};
use crate::validation::ValidationState;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Result of a successful submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Amount written to the activity
    pub amount: Decimal,
    /// Whether the host was asked to advance
    pub advanced: bool,
}

/// The drawdown form
///
/// One instance per form on screen. Every mutating method takes `&mut self`,
/// so events are handled one at a time.
pub struct DrawdownForm {
    config: FormConfig,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn NotificationSink>,
    host: Arc<dyn WorkflowHost>,
    state: FormState,
    offered_actions: Option<Vec<FlowAction>>,
    activity_binding: IdBinding<ActivityId>,
    case_binding: IdBinding<CaseId>,
}

impl DrawdownForm {
    /// Create a form in the loading phase
    pub fn new(
        config: FormConfig,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn NotificationSink>,
        host: Arc<dyn WorkflowHost>,
    ) -> Self {
        Self {
            config,
            store,
            notifier,
            host,
            state: FormState::new(),
            offered_actions: None,
            activity_binding: IdBinding::new(),
            case_binding: IdBinding::new(),
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Validation result for the current inputs
    #[must_use]
    pub fn validate(&self) -> ValidationState {
        self.state.validate()
    }

    /// Apply the host's inputs
    ///
    /// The case override is recorded first so the activity load resolves the
    /// right case on its first pass. An action list in the inputs replaces
    /// the workflow host's own.
    pub async fn initialize(&mut self, inputs: &FormInputs) -> Result<(), FormError> {
        tracing::info!(
            "Initializing drawdown form for activity {:?}",
            inputs.record_id
        );
        self.offered_actions = inputs.actions();
        self.set_case_override(inputs.case_override()).await?;
        self.set_record_id(inputs.activity_id()).await
    }

    /// Host changed the activity id
    pub async fn set_record_id(&mut self, id: Option<ActivityId>) -> Result<(), FormError> {
        if self.activity_binding.current() == id.as_ref() {
            return Ok(());
        }
        if let Some(id) = id {
            return self.load_activity(&id).await;
        }

        self.enter(FormPhase::Loading)?;
        self.activity_binding.update(None);
        self.state = self.state.clone().clear_activity();
        tracing::debug!("Activity id cleared; waiting for a new one");
        self.sync_case().await
    }

    /// Host changed the case override
    pub async fn set_case_override(&mut self, id: Option<CaseId>) -> Result<(), FormError> {
        if self.state.case_override == id {
            return Ok(());
        }
        tracing::debug!("Case override set to {:?}", id);
        self.state = self.state.clone().with_case_override(id);
        if !self.state.activity_loaded {
            return Ok(());
        }
        self.sync_case().await?;
        self.finish_loading()
    }

    /// Fetch the activity and resolve its case
    pub async fn load_activity(&mut self, id: &ActivityId) -> Result<(), FormError> {
        self.enter(FormPhase::Loading)?;
        self.activity_binding.update(Some(id.clone()));
        self.state = self.state.clone().begin_activity_load(id.clone());

        tracing::info!("Loading activity {}", id);
        let fields = self.config.activity.fetch_list();
        let fetched = self.store.fetch(id.record_id(), &fields).await;
        let record = match fetched {
            Ok(record) => record,
            Err(source) => {
                return Err(self.load_failed(FormError::Load {
                    kind: RecordKind::Activity,
                    source,
                }))
            }
        };

        let amount = record.decimal_field(&self.config.activity.drawdown_amount);
        let parent = record.reference_field(&self.config.activity.case_reference);
        let (amount, parent) = match (amount, parent) {
            (Ok(amount), Ok(parent)) => (amount, parent),
            (Err(source), _) | (_, Err(source)) => {
                return Err(self.load_failed(FormError::Field {
                    kind: RecordKind::Activity,
                    source,
                }))
            }
        };

        tracing::debug!(
            "Activity {} loaded: amount={:?}, case={:?}",
            id,
            amount,
            parent
        );
        self.state = self
            .state
            .clone()
            .apply_activity(amount, parent.map(CaseId::from));

        self.sync_case().await?;
        self.finish_loading()
    }

    /// Fetch the capacity limit of a case
    pub async fn load_case(&mut self, id: &CaseId) -> Result<(), FormError> {
        self.enter(FormPhase::Loading)?;
        self.case_binding.update(Some(id.clone()));
        self.state = self.state.clone().begin_case_load();

        tracing::info!("Loading case {}", id);
        let fields = self.config.case.fetch_list();
        let fetched = self.store.fetch(id.record_id(), &fields).await;
        let record = match fetched {
            Ok(record) => record,
            Err(source) => {
                return Err(self.load_failed(FormError::Load {
                    kind: RecordKind::Case,
                    source,
                }))
            }
        };

        let capacity = match record.decimal_field(&self.config.case.facility_amount) {
            Ok(capacity) => capacity,
            Err(source) => {
                return Err(self.load_failed(FormError::Field {
                    kind: RecordKind::Case,
                    source,
                }))
            }
        };

        tracing::debug!("Case {} loaded: capacity={:?}", id, capacity);
        self.state = self.state.clone().apply_case(capacity);
        self.finish_loading()
    }

    /// User edited the amount field
    ///
    /// Ignored once the form is completed or failed to load.
    pub fn edit_amount(&mut self, raw: &str) -> &ValidationState {
        let phase = self.state.phase;
        if matches!(phase, FormPhase::Completed | FormPhase::LoadError) {
            tracing::debug!("Amount edit ignored while {}", phase);
            return &self.state.validation;
        }
        self.state = self.state.clone().on_amount_edited(raw);
        tracing::debug!(
            "Amount edited to {:?}: valid={}",
            self.state.requested,
            self.state.validation.is_valid()
        );
        &self.state.validation
    }

    /// Validate and save the amount
    ///
    /// # Errors
    /// - `FormError::SubmitUnavailable` outside the ready phases
    /// - `FormError::Validation` if the amount fails the live check
    /// - `FormError::Persistence` if the update call fails
    pub async fn submit(&mut self) -> Result<SubmitOutcome, FormError> {
        let phase = self.state.phase;
        if !phase.is_ready() {
            tracing::warn!("Submit ignored while {}", phase);
            return Err(FormError::SubmitUnavailable(phase));
        }

        self.state = self.state.clone().revalidate();
        let amount = match self.state.outcome() {
            Ok(amount) => amount,
            Err(err) => {
                tracing::debug!("Submit blocked: {}", err);
                return Err(err.into());
            }
        };
        let activity_id = self
            .state
            .activity_id
            .clone()
            .ok_or(FormError::MissingRecordId)?;

        self.enter(FormPhase::Submitting)?;
        let mut values = FieldValues::new();
        values.insert(
            self.config.activity.drawdown_amount.clone(),
            decimal_to_json(amount),
        );

        tracing::info!("Saving drawdown amount {} on activity {}", amount, activity_id);
        let saved = self.store.update(activity_id.record_id(), values).await;
        match saved {
            Ok(()) => {
                self.enter(FormPhase::Completed)?;
                let advanced = self.handle_success();
                Ok(SubmitOutcome { amount, advanced })
            }
            Err(source) => {
                let err = FormError::Persistence(source);
                self.enter(FormPhase::Failed)?;
                self.handle_error(&err);
                self.enter(FormPhase::Invalid)?;
                Err(err)
            }
        }
    }

    /// Announce a saved amount and advance the flow when the host allows it
    ///
    /// Returns whether the advance signal was sent.
    pub fn handle_success(&self) -> bool {
        let text = &self.config.notifications;
        self.notifier.notify(Notification::new(
            text.success_title.clone(),
            text.success_message.clone(),
            Severity::Success,
        ));

        let proceed = self.config.proceed();
        if self.available_actions().contains(&proceed) {
            tracing::info!("Advancing flow via {}", proceed);
            self.host.advance();
            true
        } else {
            tracing::debug!("Host does not offer {}; staying on step", proceed);
            false
        }
    }

    /// Reset the amount and clear errors; nothing is saved
    pub fn cancel(&mut self) {
        self.state = self.state.clone().cancel();
        tracing::info!("Drawdown edit cancelled");
    }

    /// Show a failure inline and notify the host
    pub fn handle_error(&mut self, err: &FormError) {
        let message = err.user_message(&self.config.notifications.fallback_error);
        tracing::error!("Drawdown form error: {}", err);
        self.state = self.state.clone().with_error(message.clone());
        self.notifier.notify(Notification::new(
            self.config.notifications.error_title.clone(),
            message,
            Severity::Error,
        ));
    }

    fn available_actions(&self) -> Vec<FlowAction> {
        self.offered_actions
            .clone()
            .unwrap_or_else(|| self.host.available_actions())
    }

    async fn sync_case(&mut self) -> Result<(), FormError> {
        match self.case_binding.update(self.state.effective_case_id()) {
            BindingChange::Unchanged => Ok(()),
            BindingChange::Pending => {
                self.enter(FormPhase::Loading)?;
                self.state = self.state.clone().begin_case_load();
                tracing::debug!("Case id not known yet; capacity load pending");
                Ok(())
            }
            BindingChange::Fetch(case_id) => self.load_case(&case_id).await,
        }
    }

    fn finish_loading(&mut self) -> Result<(), FormError> {
        if self.state.phase == FormPhase::Loading && self.state.is_loaded() {
            let ready = self.state.ready_phase();
            self.enter(ready)?;
            tracing::info!("Drawdown form ready ({})", ready);
        }
        Ok(())
    }

    fn load_failed(&mut self, err: FormError) -> FormError {
        // Forget the failed id so supplying it again retries the fetch.
        match &err {
            FormError::Load { kind, .. } | FormError::Field { kind, .. } => match kind {
                RecordKind::Activity => self.activity_binding.reset(),
                RecordKind::Case => self.case_binding.reset(),
            },
            _ => {}
        }
        if let Err(transition) = self.enter(FormPhase::LoadError) {
            tracing::warn!("{}", transition);
        }
        self.handle_error(&err);
        err
    }

    fn enter(&mut self, to: FormPhase) -> Result<(), FormError> {
        self.state = self.state.clone().transition(to)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::ports::MockRecordStore;
    use crate::types::{AmountInput, Record, RecordId};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Toasts(Mutex<Vec<Notification>>);

    impl NotificationSink for Toasts {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    struct Host {
        actions: Vec<FlowAction>,
        advanced: Mutex<u32>,
    }

    impl WorkflowHost for Host {
        fn available_actions(&self) -> Vec<FlowAction> {
            self.actions.clone()
        }

        fn advance(&self) {
            *self.advanced.lock().unwrap() += 1;
        }
    }

    fn store_with_records(update_calls: usize) -> MockRecordStore {
        let mut store = MockRecordStore::new();
        store.expect_fetch().returning(|id, _| match id.as_str() {
            "a1" => Ok(Record::new(id.clone())
                .with_field("Case__c", json!("c1"))
                .with_field("Amount_of_Drawdown__c", json!(0))),
            "c1" => Ok(Record::new(id.clone()).with_field("Facility_Amount__c", json!(10000))),
            _ => Err(StoreError::NotFound(id.clone())),
        });
        store
            .expect_update()
            .times(update_calls)
            .returning(|_, _| Ok(()));
        store
    }

    fn form(store: MockRecordStore, actions: Vec<FlowAction>) -> (DrawdownForm, Arc<Toasts>, Arc<Host>) {
        let toasts = Arc::new(Toasts::default());
        let host = Arc::new(Host {
            actions,
            advanced: Mutex::new(0),
        });
        let form = DrawdownForm::new(
            FormConfig::new(),
            Arc::new(store),
            toasts.clone(),
            host.clone(),
        );
        (form, toasts, host)
    }

    #[tokio::test]
    async fn invalid_amount_never_reaches_the_store() {
        let (mut form, toasts, _) = form(store_with_records(0), vec![FlowAction::Next]);
        form.set_record_id(Some(ActivityId::new("a1"))).await.unwrap();

        form.edit_amount("15000");
        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::Validation(_)));

        form.edit_amount("");
        assert!(form.submit().await.is_err());
        assert!(toasts.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn valid_amount_is_saved_once() {
        let (mut form, toasts, host) = form(store_with_records(1), vec![FlowAction::Next]);
        form.set_record_id(Some(ActivityId::new("a1"))).await.unwrap();

        form.edit_amount("5000");
        let outcome = form.submit().await.unwrap();
        assert_eq!(outcome.amount, Decimal::new(5000, 0));
        assert!(outcome.advanced);
        assert_eq!(*host.advanced.lock().unwrap(), 1);
        assert_eq!(toasts.0.lock().unwrap()[0].severity, Severity::Success);

        let again = form.submit().await.unwrap_err();
        assert_eq!(again, FormError::SubmitUnavailable(FormPhase::Completed));
    }

    #[tokio::test]
    async fn missing_activity_surfaces_load_error() {
        let (mut form, toasts, _) = form(store_with_records(0), vec![]);
        let err = form
            .set_record_id(Some(ActivityId::new("missing")))
            .await
            .unwrap_err();

        assert!(matches!(err, FormError::Load { kind: RecordKind::Activity, .. }));
        assert_eq!(form.state().phase, FormPhase::LoadError);
        assert!(form.state().validation.show_error);
        assert_eq!(toasts.0.lock().unwrap().len(), 1);
        assert_eq!(
            form.submit().await.unwrap_err(),
            FormError::SubmitUnavailable(FormPhase::LoadError)
        );
    }

    #[tokio::test]
    async fn handle_error_marks_valid_form_invalid() {
        let (mut form, toasts, _) = form(store_with_records(0), vec![]);
        form.set_record_id(Some(ActivityId::new("a1"))).await.unwrap();
        form.edit_amount("500");
        assert_eq!(form.state().phase, FormPhase::Valid);

        let err = FormError::Persistence(StoreError::rejected("boom"));
        form.handle_error(&err);

        assert_eq!(form.state().phase, FormPhase::Invalid);
        assert_eq!(form.state().validation, ValidationState::invalid("boom"));
        assert_eq!(toasts.0.lock().unwrap()[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn edits_after_completion_are_ignored() {
        let (mut form, _, _) = form(store_with_records(1), vec![FlowAction::Next]);
        form.set_record_id(Some(ActivityId::new("a1"))).await.unwrap();
        form.edit_amount("5000");
        form.submit().await.unwrap();

        let shown = form.edit_amount("999999").clone();
        assert_eq!(shown, ValidationState::clear());
        assert_eq!(
            form.state().requested,
            Some(AmountInput::Text("5000".to_string()))
        );
        assert_eq!(form.state().phase, FormPhase::Completed);
    }

    #[tokio::test]
    async fn edits_after_load_error_are_ignored() {
        let (mut form, _, _) = form(store_with_records(0), vec![]);
        let _ = form.set_record_id(Some(ActivityId::new("missing"))).await;
        let before = form.state().clone();

        form.edit_amount("10");
        assert_eq!(form.state(), &before);
    }

    #[tokio::test]
    async fn input_actions_replace_host_actions() {
        let (mut form, _, host) = form(store_with_records(1), vec![]);
        let inputs = FormInputs::for_activity("a1").with_actions(["NEXT"]);
        form.initialize(&inputs).await.unwrap();

        form.edit_amount("100");
        let outcome = form.submit().await.unwrap();
        assert!(outcome.advanced);
        assert_eq!(*host.advanced.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn same_record_id_does_not_refetch() {
        let mut store = MockRecordStore::new();
        store
            .expect_fetch()
            .withf(|id, _| id == &RecordId::new("a1"))
            .times(1)
            .returning(|id, _| Ok(Record::new(id.clone())));

        let (mut form, _, _) = form(store, vec![]);
        form.set_record_id(Some(ActivityId::new("a1"))).await.unwrap();
        form.set_record_id(Some(ActivityId::new("a1"))).await.unwrap();

        // No case reference and no override: the capacity load stays pending.
        assert_eq!(form.state().phase, FormPhase::Loading);
        assert_eq!(form.state().effective_case_id(), None);
    }
}
