//! Form configuration
//!
//! [`FormConfig`] holds everything that is fixed per deployment: the field
//! API names on both records, the notification texts and the action that
//! counts as "proceed". [`FormInputs`] holds what the host supplies per
//! form instance.

use crate::error::{ConfigError, FALLBACK_ERROR_MESSAGE};
use crate::ports::FlowAction;
use crate::types::{ActivityId, CaseId, RecordId};
use serde::{Deserialize, Serialize};

/// Field API names on the activity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityFields {
    pub id: String,
    pub case_reference: String,
    pub drawdown_amount: String,
}

impl Default for ActivityFields {
    fn default() -> Self {
        Self {
            id: "Id".to_string(),
            case_reference: "Case__c".to_string(),
            drawdown_amount: "Amount_of_Drawdown__c".to_string(),
        }
    }
}

impl ActivityFields {
    /// Fields requested when loading the activity
    #[must_use]
    pub fn fetch_list(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.case_reference.clone(),
            self.drawdown_amount.clone(),
        ]
    }
}

/// Field API names on the case record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseFields {
    pub id: String,
    pub facility_amount: String,
}

impl Default for CaseFields {
    fn default() -> Self {
        Self {
            id: "Id".to_string(),
            facility_amount: "Facility_Amount__c".to_string(),
        }
    }
}

impl CaseFields {
    /// Fields requested when loading the case
    #[must_use]
    pub fn fetch_list(&self) -> Vec<String> {
        vec![self.id.clone(), self.facility_amount.clone()]
    }
}

/// Notification texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationText {
    pub success_title: String,
    pub success_message: String,
    pub error_title: String,
    /// Shown when a failure carries no message
    pub fallback_error: String,
}

impl Default for NotificationText {
    fn default() -> Self {
        Self {
            success_title: "Success".to_string(),
            success_message: "Drawdown amount updated".to_string(),
            error_title: "Error".to_string(),
            fallback_error: FALLBACK_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Drawdown form configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub activity: ActivityFields,
    pub case: CaseFields,
    pub notifications: NotificationText,
    /// Action whose presence lets the form advance the flow after saving
    pub proceed_action: ProceedAction,
}

/// Wrapper so a missing `proceed_action` defaults to `NEXT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProceedAction(pub FlowAction);

impl Default for ProceedAction {
    fn default() -> Self {
        Self(FlowAction::Next)
    }
}

impl FormConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML, filling unset keys with defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.check()?;
        Ok(config)
    }

    /// With proceed action
    #[inline]
    #[must_use]
    pub fn with_proceed_action(mut self, action: FlowAction) -> Self {
        self.proceed_action = ProceedAction(action);
        self
    }

    /// With activity field names
    #[inline]
    #[must_use]
    pub fn with_activity_fields(mut self, fields: ActivityFields) -> Self {
        self.activity = fields;
        self
    }

    /// With case field names
    #[inline]
    #[must_use]
    pub fn with_case_fields(mut self, fields: CaseFields) -> Self {
        self.case = fields;
        self
    }

    /// With notification texts
    #[inline]
    #[must_use]
    pub fn with_notifications(mut self, text: NotificationText) -> Self {
        self.notifications = text;
        self
    }

    /// The configured proceed action
    #[inline]
    #[must_use]
    pub fn proceed(&self) -> FlowAction {
        self.proceed_action.0
    }

    fn check(&self) -> Result<(), ConfigError> {
        let required = [
            ("activity.case_reference", &self.activity.case_reference),
            ("activity.drawdown_amount", &self.activity.drawdown_amount),
            ("case.facility_amount", &self.case.facility_amount),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        Ok(())
    }
}

/// Per-instance inputs supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormInputs {
    /// Activity record id
    pub record_id: Option<String>,
    /// Case record id override
    pub case_record_id: Option<String>,
    /// Raw action tokens offered by the host; when absent the form asks the
    /// workflow host instead
    pub available_actions: Option<Vec<String>>,
}

impl FormInputs {
    /// Inputs for an activity
    #[must_use]
    pub fn for_activity(record_id: impl Into<String>) -> Self {
        Self {
            record_id: Some(record_id.into()),
            ..Self::default()
        }
    }

    /// With case override
    #[must_use]
    pub fn with_case_override(mut self, case_id: impl Into<String>) -> Self {
        self.case_record_id = Some(case_id.into());
        self
    }

    /// With available action tokens
    #[must_use]
    pub fn with_actions<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_actions = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Activity id, if supplied
    #[must_use]
    pub fn activity_id(&self) -> Option<ActivityId> {
        self.record_id
            .as_deref()
            .and_then(RecordId::from_input)
            .map(ActivityId::from)
    }

    /// Case override, if supplied
    #[must_use]
    pub fn case_override(&self) -> Option<CaseId> {
        self.case_record_id
            .as_deref()
            .and_then(RecordId::from_input)
            .map(CaseId::from)
    }

    /// Offered actions the form understands, if the host supplied a list
    #[must_use]
    pub fn actions(&self) -> Option<Vec<FlowAction>> {
        self.available_actions.as_deref().map(FlowAction::parse_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_lending_schema() {
        let config = FormConfig::new();
        assert_eq!(config.activity.drawdown_amount, "Amount_of_Drawdown__c");
        assert_eq!(config.case.facility_amount, "Facility_Amount__c");
        assert_eq!(config.proceed(), FlowAction::Next);
        assert_eq!(config.notifications.success_message, "Drawdown amount updated");
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config = FormConfig::from_toml_str(
            r#"
            proceed_action = "FINISH"

            [case]
            facility_amount = "Available_Amount__c"
            "#,
        )
        .unwrap();

        assert_eq!(config.proceed(), FlowAction::Finish);
        assert_eq!(config.case.facility_amount, "Available_Amount__c");
        assert_eq!(config.case.id, "Id");
        assert_eq!(config.activity, ActivityFields::default());
    }

    #[test]
    fn empty_field_name_is_rejected() {
        let err = FormConfig::from_toml_str("[activity]\ndrawdown_amount = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Empty("activity.drawdown_amount")));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(
            FormConfig::from_toml_str("proceed_action = [").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn inputs_normalize_blank_ids() {
        let inputs = FormInputs::for_activity("a0X1")
            .with_case_override("  ")
            .with_actions(["NEXT", "BOGUS"]);

        assert_eq!(inputs.activity_id(), Some(ActivityId::new("a0X1")));
        assert_eq!(inputs.case_override(), None);
        assert_eq!(inputs.actions(), Some(vec![FlowAction::Next]));
        assert_eq!(FormInputs::for_activity("a0X1").actions(), None);
    }

    #[test]
    fn inputs_deserialize_from_host_json() {
        let inputs: FormInputs = serde_json::from_str(
            r#"{"recordId":"a0X1","caseRecordId":"500A","availableActions":["NEXT","BACK"]}"#,
        )
        .unwrap();
        assert_eq!(inputs.case_override(), Some(CaseId::new("500A")));
        assert_eq!(inputs.actions(), Some(vec![FlowAction::Next, FlowAction::Back]));
    }
}
