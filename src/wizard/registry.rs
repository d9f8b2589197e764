// SPDX-License-Identifier: MIT

use super::state::StepSchema;
use super::types::StepDefinition;
use crate::error::WizardError;

/// Cumulative schemas indexed by step
///
/// `schema(k)` holds every field and rule from steps `1..=k`.
#[derive(Debug, Clone, Default)]
pub struct StepSchemaRegistry {
    schemas: Vec<StepSchema>,
}

impl StepSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from ordered step definitions
    ///
    /// Step indices must run `1..=n` in order.
    pub fn from_steps(steps: &[StepDefinition]) -> Result<Self, WizardError> {
        let mut registry = Self::new();
        for (position, step) in steps.iter().enumerate() {
            if step.index != position + 1 {
                return Err(WizardError::UnknownStep {
                    step: step.index,
                    max: steps.len(),
                });
            }
            registry.push(&step.fields)?;
        }
        Ok(registry)
    }

    /// Append the next step, extending the previous step's schema
    ///
    /// Returns the index of the new step.
    pub fn push(&mut self, additions: &StepSchema) -> Result<usize, WizardError> {
        let step = self.schemas.len() + 1;
        let schema = match self.schemas.last() {
            Some(previous) => previous.extend(step, additions)?,
            None => StepSchema::new().extend(step, additions)?,
        };
        self.schemas.push(schema);
        Ok(step)
    }

    /// Cumulative schema for `step`
    pub fn lookup(&self, step: usize) -> Result<&StepSchema, WizardError> {
        step.checked_sub(1)
            .and_then(|i| self.schemas.get(i))
            .ok_or(WizardError::UnknownStep {
                step,
                max: self.schemas.len(),
            })
    }

    pub fn max_steps(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
