//! Wizard loader - YAML file loading and checking
//!
//! Definitions are checked as they load: step indices, field types across
//! steps, rule/type compatibility and declared defaults must all hold before
//! a definition is handed out.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::engine::WizardEngine;
use super::registry::StepSchemaRegistry;
use super::types::WizardDefinition;
use crate::error::WizardError;
use crate::verify::CodeVerifier;

/// Loads wizard definitions from YAML files
pub struct WizardLoader;

impl WizardLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and check a wizard definition from a YAML file
    pub fn load_wizard<P: AsRef<Path>>(&self, path: P) -> Result<WizardDefinition, WizardError> {
        let path = path.as_ref();
        log::debug!("Loading wizard definition from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Load a definition and build an engine for it
    ///
    /// Also fails when a step's effect cannot run with `verifier`.
    pub fn load_engine<P: AsRef<Path>>(
        &self,
        path: P,
        verifier: Option<Arc<dyn CodeVerifier>>,
    ) -> Result<WizardEngine, WizardError> {
        let definition = self.load_wizard(path)?;
        WizardEngine::new(definition, verifier)
    }

    /// Parse and check a wizard definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<WizardDefinition, WizardError> {
        let def: WizardDefinition = serde_yaml::from_str(content)?;
        Self::check(&def)?;
        Ok(def)
    }

    /// Check everything about a definition that does not need a verifier
    pub fn check(def: &WizardDefinition) -> Result<(), WizardError> {
        if def.steps.is_empty() {
            return Err(WizardError::config(format!(
                "wizard '{}' has no steps",
                def.name
            )));
        }

        let registry = StepSchemaRegistry::from_steps(&def.steps)?;
        let final_schema = registry.lookup(registry.max_steps())?;
        for (name, field) in &final_schema.fields {
            if let Some(raw) = &field.default {
                field.parse(name, raw)?;
            }
        }

        log::debug!(
            "Checked wizard '{}': {} steps, {} fields",
            def.name,
            registry.max_steps(),
            final_schema.fields.len()
        );
        Ok(())
    }
}

impl Default for WizardLoader {
    fn default() -> Self {
        Self::new()
    }
}
