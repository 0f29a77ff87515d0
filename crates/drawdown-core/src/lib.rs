//! Drawdown Core - facility capacity validation for drawdown requests
//!
//! The form:
//! - Loads an activity and its parent case from a record store
//! - Derives the requested amount and the facility capacity
//! - Re-validates the amount on every edit
//! - Gates submit on validity and saves the amount
//! - Notifies the host and advances the flow on success
//!
//! # Example
//!
//! ```rust,ignore
//! use drawdown_core::prelude::*;
//!
//! # async fn example(
//! #     store: std::sync::Arc<dyn RecordStore>,
//! #     toasts: std::sync::Arc<dyn NotificationSink>,
//! #     host: std::sync::Arc<dyn WorkflowHost>,
//! # ) -> Result<(), FormError> {
//! let mut form = DrawdownForm::new(FormConfig::new(), store, toasts, host);
//! form.initialize(&FormInputs::for_activity("a0X5g00000AbCdE")).await?;
//!
//! form.edit_amount("5000");
//! let outcome = form.submit().await?;
//! println!("saved {}", outcome.amount);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod binding;
pub mod config;
pub mod driver;
pub mod error;
pub mod form;
pub mod ports;
pub mod state;
pub mod state_machine;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use binding::{BindingChange, IdBinding};
pub use config::{ActivityFields, CaseFields, FormConfig, FormInputs, NotificationText};
pub use driver::{FormDriver, FormEvent, FormHandle};
pub use error::{ConfigError, FormError, RecordKind, StateMachineError, StoreError};
pub use form::{DrawdownForm, SubmitOutcome};
pub use ports::{FlowAction, Notification, NotificationSink, RecordStore, Severity, WorkflowHost};
pub use state::FormState;
pub use state_machine::FormPhase;
pub use types::{ActivityId, AmountInput, CaseId, FieldValues, Record, RecordId};
pub use validation::{validate, ValidationError, ValidationState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the drawdown form
    pub use crate::{
        ActivityId, CaseId, DrawdownForm, FlowAction, FormConfig, FormDriver, FormError,
        FormEvent, FormInputs, FormPhase, FormState, Notification, NotificationSink, RecordStore,
        Severity, SubmitOutcome, ValidationState, WorkflowHost,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
