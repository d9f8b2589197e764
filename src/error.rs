// SPDX-License-Identifier: MIT

//! Typed error handling for stepwise-rs
//!
//! Two families of errors exist. `WizardError` covers definition and
//! configuration problems that stop an engine from being built or a file from
//! being loaded. `VerifyError` covers collaborator calls made while advancing;
//! those are always recovered by the engine and never escalate.

use thiserror::Error;

/// Engine, definition and I/O errors
#[derive(Debug, Error)]
pub enum WizardError {
    /// Schema lookup for a step outside `[1, max]`
    #[error("Unknown step {step} (wizard has {max} steps)")]
    UnknownStep { step: usize, max: usize },

    /// A step redefined an earlier field with a different type
    #[error("Field '{field}' redefined as {found} at step {step}, previously {expected}")]
    SchemaConflict {
        field: String,
        step: usize,
        expected: String,
        found: String,
    },

    /// Raw input could not be turned into a field value
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Configuration errors (missing env vars, malformed definitions)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Verification collaborator could not be constructed
    #[error("Verifier error: {0}")]
    Verify(#[from] VerifyError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Failures of the send-code / confirm-code collaborator calls
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Transport-level failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The remote endpoint answered with a non-success status
    #[error("Verification endpoint rejected {operation} with status {status}: {body}")]
    Rejected {
        operation: String,
        status: u16,
        body: String,
    },

    /// Confirm-code succeeded without handing back a token
    #[error("Verification endpoint returned no token")]
    MissingToken,

    /// The field an effect reads from is not set
    #[error("Field '{0}' is not set")]
    MissingField(String),

    /// An effect ran on an engine built without a verifier
    #[error("No verifier configured")]
    NotConfigured,

    /// Invalid endpoint URL
    #[error("Invalid verification URL: {0}")]
    Url(#[from] url::ParseError),
}

impl WizardError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl VerifyError {
    /// Create a rejection error
    pub fn rejected(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }
}
