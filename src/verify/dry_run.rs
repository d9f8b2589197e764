// SPDX-License-Identifier: MIT

use super::CodeVerifier;
use crate::error::VerifyError;
use async_trait::async_trait;

/// Verifier for local runs: logs every call and accepts any code
pub struct DryRunVerifier {
    token: String,
}

impl DryRunVerifier {
    pub fn new() -> Self {
        Self {
            token: "dry-run".to_string(),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Default for DryRunVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeVerifier for DryRunVerifier {
    async fn send_code(&self, phone: &str) -> Result<(), VerifyError> {
        log::info!("[dry-run] would send code to {}", phone);
        Ok(())
    }

    async fn confirm_code(&self, phone: &str, code: &str) -> Result<Option<String>, VerifyError> {
        log::info!("[dry-run] would confirm code {} for {}", code, phone);
        Ok(Some(self.token.clone()))
    }
}
