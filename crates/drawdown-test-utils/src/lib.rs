//! Testing utilities for the drawdown workspace
//!
//! In-memory ports, recorders and fixtures shared by integration tests.

#![allow(missing_docs)]

use dashmap::DashMap;
use drawdown_core::{
    ActivityId, CaseId, DrawdownForm, FieldValues, FlowAction, FormConfig, Notification,
    NotificationSink, Record, RecordId, RecordStore, Severity, StoreError, WorkflowHost,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use ulid::Ulid;

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("drawdown_core=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Record store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<RecordId, Record>,
    fetch_failures: DashMap<RecordId, StoreError>,
    update_failure: Mutex<Option<StoreError>>,
    fetches: Mutex<Vec<RecordId>>,
    updates: Mutex<Vec<(RecordId, FieldValues)>>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Record) {
        self.records.insert(record.id.clone(), record);
    }

    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    /// Make every fetch of `id` fail
    pub fn fail_fetch(&self, id: &RecordId, error: StoreError) {
        self.fetch_failures.insert(id.clone(), error);
    }

    /// Make the next update fail
    pub fn fail_next_update(&self, error: StoreError) {
        *self.update_failure.lock() = Some(error);
    }

    /// Ids fetched so far, in order
    #[must_use]
    pub fn fetches(&self) -> Vec<RecordId> {
        self.fetches.lock().clone()
    }

    /// Updates applied or attempted so far, in order
    #[must_use]
    pub fn updates(&self) -> Vec<(RecordId, FieldValues)> {
        self.updates.lock().clone()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch(&self, id: &RecordId, fields: &[String]) -> Result<Record, StoreError> {
        self.fetches.lock().push(id.clone());
        if let Some(error) = self.fetch_failures.get(id) {
            return Err(error.value().clone());
        }

        let stored = self
            .records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let mut record = Record::new(id.clone());
        for field in fields {
            if let Some(value) = stored.fields.get(field) {
                record.fields.insert(field.clone(), value.clone());
            }
        }
        Ok(record)
    }

    async fn update(&self, id: &RecordId, values: FieldValues) -> Result<(), StoreError> {
        self.updates.lock().push((id.clone(), values.clone()));
        if let Some(error) = self.update_failure.lock().take() {
            return Err(error);
        }

        let mut stored = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        stored.fields.extend(values);
        Ok(())
    }
}

/// Notification sink that keeps everything it is sent
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}

/// Workflow host with a fixed action list that counts advance signals
#[derive(Debug, Default)]
pub struct RecordingHost {
    actions: Vec<FlowAction>,
    advances: Mutex<usize>,
}

impl RecordingHost {
    #[must_use]
    pub fn new(actions: Vec<FlowAction>) -> Self {
        Self {
            actions,
            advances: Mutex::new(0),
        }
    }

    /// Host built from raw action tokens, as a flow would supply them
    #[must_use]
    pub fn from_tokens(tokens: &[&str]) -> Self {
        Self::new(FlowAction::parse_tokens(tokens))
    }

    #[must_use]
    pub fn advances(&self) -> usize {
        *self.advances.lock()
    }
}

impl WorkflowHost for RecordingHost {
    fn available_actions(&self) -> Vec<FlowAction> {
        self.actions.clone()
    }

    fn advance(&self) {
        *self.advances.lock() += 1;
    }
}

/// Activity and case seeded into a store
#[derive(Debug, Clone)]
pub struct LendingFixture {
    pub activity_id: ActivityId,
    pub case_id: CaseId,
}

/// Fresh opaque id with an object prefix
#[must_use]
pub fn new_record_id(prefix: &str) -> RecordId {
    RecordId::new(format!("{prefix}{}", Ulid::new()))
}

/// Seed a case with `capacity` and an activity pointing at it
pub fn seed_lending(
    store: &InMemoryRecordStore,
    config: &FormConfig,
    capacity: Option<Decimal>,
    amount: Option<Decimal>,
) -> LendingFixture {
    let case_id = new_record_id("500");
    let activity_id = new_record_id("a0X");

    store.insert(
        Record::new(case_id.clone())
            .with_field(config.case.id.clone(), json!(case_id.as_str()))
            .with_field(config.case.facility_amount.clone(), decimal_value(capacity)),
    );
    store.insert(
        Record::new(activity_id.clone())
            .with_field(config.activity.id.clone(), json!(activity_id.as_str()))
            .with_field(config.activity.case_reference.clone(), json!(case_id.as_str()))
            .with_field(config.activity.drawdown_amount.clone(), decimal_value(amount)),
    );

    tracing::debug!("Seeded activity {} -> case {}", activity_id, case_id);
    LendingFixture {
        activity_id: ActivityId::from(activity_id),
        case_id: CaseId::from(case_id),
    }
}

/// Seed a standalone case
pub fn seed_case(store: &InMemoryRecordStore, config: &FormConfig, capacity: Decimal) -> CaseId {
    let case_id = new_record_id("500");
    store.insert(
        Record::new(case_id.clone())
            .with_field(config.case.facility_amount.clone(), decimal_value(Some(capacity))),
    );
    CaseId::from(case_id)
}

fn decimal_value(value: Option<Decimal>) -> Value {
    value.map_or(Value::Null, drawdown_core::types::decimal_to_json)
}

/// A form wired to in-memory ports
pub struct Harness {
    pub form: DrawdownForm,
    pub store: Arc<InMemoryRecordStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub host: Arc<RecordingHost>,
}

impl Harness {
    /// Build a harness around an already seeded store
    #[must_use]
    pub fn new(config: FormConfig, store: Arc<InMemoryRecordStore>, host: RecordingHost) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let host = Arc::new(host);
        let form = DrawdownForm::new(config, store.clone(), notifier.clone(), host.clone());
        Self {
            form,
            store,
            notifier,
            host,
        }
    }
}

/// Seed a standard lending scenario and build a harness for it
pub fn lending_harness(
    capacity: i64,
    actions: &[&str],
) -> anyhow::Result<(Harness, LendingFixture)> {
    init_tracing();
    let config = FormConfig::new();
    let store = Arc::new(InMemoryRecordStore::new());
    let fixture = seed_lending(&store, &config, Some(Decimal::new(capacity, 0)), None);
    anyhow::ensure!(
        store.get(fixture.activity_id.record_id()).is_some(),
        "activity fixture was not stored"
    );
    let harness = Harness::new(config, store, RecordingHost::from_tokens(actions));
    Ok((harness, fixture))
}
