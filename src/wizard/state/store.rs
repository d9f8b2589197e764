// SPDX-License-Identifier: MIT

//! Caller-owned wizard state

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::schema::FieldType;

/// Accumulated field values keyed by field name
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Date(_) => FieldType::Date,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Date(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

/// State of one wizard session
///
/// Created by [`WizardEngine::start`](crate::wizard::WizardEngine::start) and
/// owned by the caller. Only the engine moves `step` or raises `in_flight`;
/// field edits go straight in.
#[derive(Debug, Clone)]
pub struct WizardState {
    id: Uuid,
    pub(crate) step: usize,
    fields: FieldMap,
    pub(crate) in_flight: bool,
    pub(crate) token: Option<String>,
}

impl WizardState {
    pub(crate) fn new(fields: FieldMap) -> Self {
        Self {
            id: Uuid::new_v4(),
            step: 1,
            fields,
            in_flight: false,
            token: None,
        }
    }

    /// Session identifier used in log lines
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current step, 1-indexed
    pub fn step(&self) -> usize {
        self.step
    }

    /// Whether a collaborator call is outstanding
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Token handed back by a successful code confirmation
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text value of a field, if set and textual
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// Write a field value; no validation happens here
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Remove a field value
    pub fn clear_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_at_step_one() {
        let state = WizardState::new(FieldMap::new());
        assert_eq!(state.step(), 1);
        assert!(!state.in_flight());
        assert!(state.token().is_none());
        assert!(state.fields().is_empty());
    }

    #[test]
    fn test_set_field_overwrites() {
        let mut state = WizardState::new(FieldMap::new());
        state.set_field("name", "first");
        state.set_field("name", "second");
        assert_eq!(state.text("name"), Some("second"));
    }

    #[test]
    fn test_clear_field() {
        let mut state = WizardState::new(FieldMap::new());
        state.set_field("name", "Maria");
        assert_eq!(state.clear_field("name"), Some(FieldValue::from("Maria")));
        assert!(state.get("name").is_none());
    }

    #[test]
    fn test_text_of_date_field_is_none() {
        let mut state = WizardState::new(FieldMap::new());
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        state.set_field("date", date);
        assert!(state.text("date").is_none());
        assert_eq!(state.get("date"), Some(&FieldValue::Date(date)));
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let a = WizardState::new(FieldMap::new());
        let b = WizardState::new(FieldMap::new());
        assert_ne!(a.id(), b.id());
    }
}
