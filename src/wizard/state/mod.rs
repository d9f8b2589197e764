// SPDX-License-Identifier: MIT

//! State management for wizards
//!
//! This module provides:
//! - `StepSchema` - the fields and rules a step requires
//! - `WizardState` - caller-owned session state
//! - `FieldValue` - text or date values held by fields

mod schema;
mod store;

pub use schema::{FieldDef, FieldType, Mask, Rule, StepSchema, Violation};
pub use store::{FieldMap, FieldValue, WizardState};
