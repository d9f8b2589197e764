// SPDX-License-Identifier: MIT

//! Definition types for wizards
//!
//! These structures describe a wizard: its ordered steps, the fields each
//! step introduces and the side effect that runs when leaving a step. They
//! deserialize from YAML, see [`super::loader`].

use serde::{Deserialize, Serialize};

use super::state::{FieldMap, FieldValue, StepSchema};

/// Top-level wizard definition
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WizardDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Label of the forward button on non-final steps
    #[serde(default = "default_next_label")]
    pub next_label: String,
    /// Label of the forward button on the final step
    #[serde(default = "default_submit_label")]
    pub submit_label: String,
    pub steps: Vec<StepDefinition>,
}

/// A single step
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StepDefinition {
    /// 1-indexed position
    pub index: usize,
    pub title: String,
    /// May reference field values as `{field}`
    #[serde(default)]
    pub description: Option<String>,
    /// Fields this step introduces or tightens
    #[serde(default)]
    pub fields: StepSchema,
    /// Side effect run before leaving this step
    #[serde(default)]
    pub on_advance: Option<StepEffect>,
}

/// Collaborator call gated on a step transition
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepEffect {
    /// Send a verification code to the phone number
    SendCode {
        #[serde(default = "default_phone_field")]
        phone_field: String,
    },
    /// Confirm the submitted code; must yield a token
    ConfirmCode {
        #[serde(default = "default_phone_field")]
        phone_field: String,
        #[serde(default = "default_code_field")]
        code_field: String,
    },
}

fn default_next_label() -> String {
    "Next".to_string()
}

fn default_submit_label() -> String {
    "Submit".to_string()
}

fn default_phone_field() -> String {
    "phone".to_string()
}

fn default_code_field() -> String {
    "code".to_string()
}

impl StepEffect {
    pub fn send_code() -> Self {
        Self::SendCode {
            phone_field: default_phone_field(),
        }
    }

    pub fn confirm_code() -> Self {
        Self::ConfirmCode {
            phone_field: default_phone_field(),
            code_field: default_code_field(),
        }
    }

    /// Field names the effect reads
    pub fn reads(&self) -> Vec<&str> {
        match self {
            StepEffect::SendCode { phone_field } => vec![phone_field.as_str()],
            StepEffect::ConfirmCode {
                phone_field,
                code_field,
            } => vec![phone_field.as_str(), code_field.as_str()],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StepEffect::SendCode { .. } => "send-code",
            StepEffect::ConfirmCode { .. } => "confirm-code",
        }
    }
}

impl StepDefinition {
    pub fn new(index: usize, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            description: None,
            fields: StepSchema::default(),
            on_advance: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fields(mut self, fields: StepSchema) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_effect(mut self, effect: StepEffect) -> Self {
        self.on_advance = Some(effect);
        self
    }

    /// Description with `{field}` placeholders replaced by current values
    ///
    /// Unset fields render as an empty string.
    pub fn render_description(&self, fields: &FieldMap) -> Option<String> {
        let template = self.description.as_ref()?;
        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    match fields.get(&after[..end]) {
                        Some(FieldValue::Text(s)) => out.push_str(s),
                        Some(FieldValue::Date(d)) => out.push_str(&d.format("%d/%m/%Y").to_string()),
                        None => {}
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        Some(out)
    }
}
