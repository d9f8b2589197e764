// SPDX-License-Identifier: MIT

pub mod engine;
pub mod loader;
pub mod registry;
pub mod sink;
pub mod state;
pub mod types;

pub use engine::{Blocked, EffectOutcome, PendingEffect, Submission, Transition, WizardEngine};
pub use registry::StepSchemaRegistry;
pub use state::{FieldMap, FieldValue, StepSchema, Violation, WizardState};
pub use types::{StepDefinition, StepEffect, WizardDefinition};
