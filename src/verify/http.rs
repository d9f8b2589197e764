// SPDX-License-Identifier: MIT

//! HTTP verification endpoint

use super::CodeVerifier;
use crate::error::{VerifyError, WizardError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

const DEFAULT_TEMPLATE_ID: &str = "verification-code";
const DEFAULT_CODE_TYPE: &str = "sms";

/// Endpoint configuration
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub base_url: Url,
    /// Message template used when sending codes
    pub template_id: String,
    /// Delivery channel of the code
    pub code_type: String,
}

impl VerifierConfig {
    pub fn new(base_url: &str) -> Result<Self, VerifyError> {
        Ok(Self {
            base_url: parse_base(base_url)?,
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            code_type: DEFAULT_CODE_TYPE.to_string(),
        })
    }

    /// Read configuration from the environment
    ///
    /// Requires `VERIFY_BASE_URL`. `VERIFY_TEMPLATE_ID` and `VERIFY_CODE_TYPE`
    /// are optional.
    pub fn from_env() -> Result<Self, WizardError> {
        let base_url = env::var("VERIFY_BASE_URL")
            .map_err(|_| WizardError::config("VERIFY_BASE_URL must be set"))?;
        let mut config = Self::new(&base_url)?;
        if let Ok(template_id) = env::var("VERIFY_TEMPLATE_ID") {
            config.template_id = template_id;
        }
        if let Ok(code_type) = env::var("VERIFY_CODE_TYPE") {
            config.code_type = code_type;
        }
        Ok(config)
    }

    pub fn with_template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }

    pub fn with_code_type(mut self, code_type: impl Into<String>) -> Self {
        self.code_type = code_type.into();
        self
    }
}

/// Keep a trailing slash so `join` appends instead of replacing the last segment
fn parse_base(base_url: &str) -> Result<Url, url::ParseError> {
    if base_url.ends_with('/') {
        Url::parse(base_url)
    } else {
        Url::parse(&format!("{}/", base_url))
    }
}

#[derive(Debug, Serialize)]
struct SendCodeRequest<'a> {
    phone: &'a str,
    template: &'a str,
    #[serde(rename = "type")]
    code_type: &'a str,
}

#[derive(Debug, Serialize)]
struct ConfirmCodeRequest<'a> {
    phone: &'a str,
    code: &'a str,
    #[serde(rename = "type")]
    code_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConfirmCodeResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Verifier backed by a remote HTTP endpoint
pub struct HttpVerifier {
    client: Client,
    config: VerifierConfig,
}

impl HttpVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, WizardError> {
        Ok(Self::new(VerifierConfig::from_env()?))
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        operation: &str,
        body: &T,
    ) -> Result<reqwest::Response, VerifyError> {
        let url = self.config.base_url.join(operation)?;
        log::debug!("POST {}", url);

        let resp = self.client.post(url).json(body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(VerifyError::rejected(operation, status, text));
        }

        Ok(resp)
    }
}

#[async_trait]
impl CodeVerifier for HttpVerifier {
    async fn send_code(&self, phone: &str) -> Result<(), VerifyError> {
        let body = SendCodeRequest {
            phone,
            template: &self.config.template_id,
            code_type: &self.config.code_type,
        };
        self.post("send-code", &body).await?;
        log::info!("Verification code sent");
        Ok(())
    }

    async fn confirm_code(&self, phone: &str, code: &str) -> Result<Option<String>, VerifyError> {
        let body = ConfirmCodeRequest {
            phone,
            code,
            code_type: &self.config.code_type,
        };
        let resp = self.post("confirm-code", &body).await?;

        // An unparseable body carries no token
        let parsed: Option<ConfirmCodeResponse> = resp.json().await.ok();
        Ok(parsed
            .and_then(|r| r.token)
            .filter(|token| !token.is_empty()))
    }
}
