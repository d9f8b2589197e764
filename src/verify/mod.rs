// SPDX-License-Identifier: MIT

//! Verification collaborators
//!
//! The wizard engine calls a [`CodeVerifier`] when leaving steps that declare
//! a `send_code` or `confirm_code` effect. Implementations:
//! - [http] - remote verification endpoint over HTTP
//! - [dry_run] - logs calls and always succeeds

pub mod dry_run;
pub mod http;

use async_trait::async_trait;

use crate::error::VerifyError;

pub use dry_run::DryRunVerifier;
pub use http::{HttpVerifier, VerifierConfig};

/// Sends and confirms one-time verification codes
#[async_trait]
pub trait CodeVerifier: Send + Sync {
    /// Ask the remote side to send a code to `phone` (digits only)
    async fn send_code(&self, phone: &str) -> Result<(), VerifyError>;

    /// Confirm `code` for `phone`, returning the issued token if any
    ///
    /// `Ok(None)` means the call went through but no token came back; the
    /// engine treats that as a failure.
    async fn confirm_code(&self, phone: &str, code: &str) -> Result<Option<String>, VerifyError>;
}
