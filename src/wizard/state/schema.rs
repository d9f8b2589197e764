// SPDX-License-Identifier: MIT

//! Step schema definitions and field validation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::store::{FieldMap, FieldValue};
use crate::error::WizardError;
use crate::phone;

/// Fields and rules that apply once a step is reached
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct StepSchema {
    /// Field definitions keyed by field name
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldDef>,
}

/// Definition of a single field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldDef {
    /// Kind of value the field holds
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Rules checked in addition to presence and type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    /// Raw default value, parsed according to `field_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Display mask applied by the presentation layer while typing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Mask>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Date,
}

/// Input masks understood by the presentation layer
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mask {
    /// `(DD) DDDDD-DDDD`, see [`crate::phone::format`]
    Phone,
}

/// A single constraint on a text field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    MinLength { value: usize },
    MaxLength { value: usize },
    Length { value: usize },
    /// Only ASCII digits
    Digits,
    /// Value must be one of the listed options
    OneOf { values: Vec<String> },
    /// A complete formatted phone number, see [`crate::phone::is_complete`]
    Phone,
}

/// A failed constraint on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Date => write!(f, "date"),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Rule {
    /// Check a text value, returning a message when the rule fails
    fn check(&self, text: &str) -> Option<String> {
        let len = text.chars().count();
        match self {
            Rule::MinLength { value } if len < *value => {
                Some(format!("must be at least {} characters", value))
            }
            Rule::MaxLength { value } if len > *value => {
                Some(format!("must be at most {} characters", value))
            }
            Rule::Length { value } if len != *value => {
                Some(format!("must be exactly {} characters", value))
            }
            Rule::Digits if !text.chars().all(|c| c.is_ascii_digit()) => {
                Some("must contain only digits".to_string())
            }
            Rule::OneOf { values } if !values.iter().any(|v| v == text) => {
                Some(format!("must be one of: {}", values.join(", ")))
            }
            Rule::Phone if !phone::is_complete(text) => {
                Some("must be a complete phone number (DD) DDDDD-DDDD".to_string())
            }
            _ => None,
        }
    }

    /// Rule name as written in definitions
    pub fn name(&self) -> &'static str {
        match self {
            Rule::MinLength { .. } => "min_length",
            Rule::MaxLength { .. } => "max_length",
            Rule::Length { .. } => "length",
            Rule::Digits => "digits",
            Rule::OneOf { .. } => "one_of",
            Rule::Phone => "phone",
        }
    }

    /// Every rule constrains text; none apply to dates
    pub fn applies_to(&self, field_type: FieldType) -> bool {
        field_type == FieldType::Text
    }
}

impl FieldDef {
    pub fn text() -> Self {
        Self {
            field_type: FieldType::Text,
            rules: Vec::new(),
            default: None,
            mask: None,
        }
    }

    pub fn date() -> Self {
        Self {
            field_type: FieldType::Date,
            ..Self::text()
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Parse raw input into the value kind this field holds
    pub fn parse(&self, name: &str, raw: &str) -> Result<FieldValue, WizardError> {
        match self.field_type {
            FieldType::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldType::Date => chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|e| WizardError::invalid_value(name, format!("expected YYYY-MM-DD: {}", e))),
        }
    }

    /// Reject rules that can never apply to this field's type
    pub fn check_rules(&self, name: &str, step: usize) -> Result<(), WizardError> {
        match self.rules.iter().find(|r| !r.applies_to(self.field_type)) {
            Some(rule) => Err(WizardError::config(format!(
                "field '{}' at step {}: rule '{}' does not apply to {} fields",
                name,
                step,
                rule.name(),
                self.field_type
            ))),
            None => Ok(()),
        }
    }

    fn check(&self, name: &str, value: Option<&FieldValue>, out: &mut Vec<Violation>) {
        let value = match value {
            Some(v) => v,
            None => {
                out.push(Violation::new(name, "is required"));
                return;
            }
        };

        if value.field_type() != self.field_type {
            out.push(Violation::new(name, format!("expected {}", self.field_type)));
            return;
        }

        if let FieldValue::Text(text) = value {
            out.extend(
                self.rules
                    .iter()
                    .filter_map(|rule| rule.check(text))
                    .map(|message| Violation::new(name, message)),
            );
        }
    }
}

impl StepSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Validate every declared field against `values`
    ///
    /// Values for fields the schema does not declare are ignored.
    pub fn validate(&self, values: &FieldMap) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        for (name, def) in &self.fields {
            def.check(name, values.get(name), &mut violations);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Build the cumulative schema for `step` from this one plus `additions`
    ///
    /// Redefining an existing field only adds rules; the type must match.
    /// Rules that do not apply to a field's type are rejected.
    pub fn extend(&self, step: usize, additions: &StepSchema) -> Result<StepSchema, WizardError> {
        let mut merged = self.clone();

        for (name, def) in &additions.fields {
            def.check_rules(name, step)?;
            match merged.fields.get_mut(name) {
                Some(existing) => {
                    if existing.field_type != def.field_type {
                        return Err(WizardError::SchemaConflict {
                            field: name.clone(),
                            step,
                            expected: existing.field_type.to_string(),
                            found: def.field_type.to_string(),
                        });
                    }
                    for rule in &def.rules {
                        if !existing.rules.contains(rule) {
                            existing.rules.push(rule.clone());
                        }
                    }
                    if existing.default.is_none() {
                        existing.default = def.default.clone();
                    }
                    if existing.mask.is_none() {
                        existing.mask = def.mask;
                    }
                }
                None => {
                    merged.fields.insert(name.clone(), def.clone());
                }
            }
        }

        Ok(merged)
    }
}
