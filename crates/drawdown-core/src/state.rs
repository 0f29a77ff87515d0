//! Form state
//!
//! All component state lives in one [`FormState`] value. Handlers consume the
//! current state and return the next one, so validation can be exercised
//! without a store or host.

use crate::error::StateMachineError;
use crate::state_machine::{validate_transition, FormPhase};
use crate::types::{ActivityId, AmountInput, CaseId};
use crate::validation::{self, ValidationError, ValidationState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of a drawdown form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    /// Lifecycle phase
    pub phase: FormPhase,
    /// Activity being edited
    pub activity_id: Option<ActivityId>,
    /// Case id supplied by the host, wins over the activity's reference
    pub case_override: Option<CaseId>,
    /// Case referenced by the loaded activity
    pub parent_case_id: Option<CaseId>,
    /// Requested drawdown amount; `None` when the field is blank
    pub requested: Option<AmountInput>,
    /// Facility capacity from the case, zero until loaded
    pub capacity: Decimal,
    /// Inline validation shown next to the field
    pub validation: ValidationState,
    /// Activity fetch completed for `activity_id`
    pub activity_loaded: bool,
    /// Case fetch completed for the effective case id
    pub case_loaded: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            phase: FormPhase::Loading,
            activity_id: None,
            case_override: None,
            parent_case_id: None,
            requested: Some(AmountInput::zero()),
            capacity: Decimal::ZERO,
            validation: ValidationState::clear(),
            activity_loaded: false,
            case_loaded: false,
        }
    }
}

impl FormState {
    /// Fresh state in the loading phase
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Case the capacity should be read from
    ///
    /// Unknown until the activity has loaded; the host override wins over
    /// the activity's own reference.
    #[must_use]
    pub fn effective_case_id(&self) -> Option<CaseId> {
        if !self.activity_loaded {
            return None;
        }
        self.case_override
            .clone()
            .or_else(|| self.parent_case_id.clone())
    }

    /// Both records are in
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.activity_loaded && self.case_loaded
    }

    /// Run the validation predicate against the current amount and capacity
    pub fn outcome(&self) -> Result<Decimal, ValidationError> {
        validation::validate(self.requested.as_ref(), self.capacity)
    }

    /// Validation result for the current inputs, without touching the state
    #[must_use]
    pub fn validate(&self) -> ValidationState {
        ValidationState::from(&self.outcome())
    }

    /// Ready sub-state matching the current inputs
    #[must_use]
    pub fn ready_phase(&self) -> FormPhase {
        FormPhase::ready(self.outcome().is_ok())
    }

    /// Store an edit and re-run validation
    #[must_use]
    pub fn on_amount_edited(mut self, raw: &str) -> Self {
        self.requested = AmountInput::from_edit(raw);
        self.revalidate()
    }

    /// Refresh the inline message and the ready sub-state
    #[must_use]
    pub fn revalidate(mut self) -> Self {
        self.validation = self.validate();
        self.settle()
    }

    /// Reset the amount to zero and clear any error
    #[must_use]
    pub fn cancel(mut self) -> Self {
        self.requested = Some(AmountInput::zero());
        self.validation = ValidationState::clear();
        self.settle()
    }

    /// Show an error message inline; a ready form becomes `Invalid`
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.validation = ValidationState::invalid(message);
        if self.phase.is_ready() {
            self.phase = FormPhase::Invalid;
        }
        self
    }

    /// Record the host's case override
    #[must_use]
    pub fn with_case_override(mut self, case_id: Option<CaseId>) -> Self {
        self.case_override = case_id;
        self
    }

    /// Start loading an activity
    #[must_use]
    pub fn begin_activity_load(mut self, activity_id: ActivityId) -> Self {
        self.activity_id = Some(activity_id);
        self.activity_loaded = false;
        self
    }

    /// Forget the activity when its id becomes unknown
    #[must_use]
    pub fn clear_activity(mut self) -> Self {
        self.activity_id = None;
        self.parent_case_id = None;
        self.activity_loaded = false;
        self
    }

    /// Apply the loaded activity fields
    #[must_use]
    pub fn apply_activity(mut self, amount: Option<Decimal>, parent: Option<CaseId>) -> Self {
        self.requested = Some(AmountInput::Value(amount.unwrap_or(Decimal::ZERO)));
        self.parent_case_id = parent;
        self.activity_loaded = true;
        self
    }

    /// Start loading a case, or wait for one when the id is unknown
    ///
    /// The previous case's capacity no longer applies.
    #[must_use]
    pub fn begin_case_load(mut self) -> Self {
        self.capacity = Decimal::ZERO;
        self.case_loaded = false;
        self
    }

    /// Apply the loaded capacity
    #[must_use]
    pub fn apply_case(mut self, capacity: Option<Decimal>) -> Self {
        self.capacity = capacity.unwrap_or(Decimal::ZERO);
        self.case_loaded = true;
        self
    }

    /// Move to another phase if the transition table allows it
    pub fn transition(mut self, to: FormPhase) -> Result<Self, StateMachineError> {
        validate_transition(self.phase, to)?;
        if self.phase != to {
            tracing::debug!("Form phase {} -> {}", self.phase, to);
        }
        self.phase = to;
        Ok(self)
    }

    fn settle(mut self) -> Self {
        if self.phase.is_ready() {
            self.phase = self.ready_phase();
        }
        self
    }
}
