use anyhow::Context;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::VerifyError;

/// A registration number the backend accepted; hands off to the details form
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedRegistration {
    pub reg_no: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    reg_no: &'a str,
}

/// First step of the sell flow: check the car's registration number
pub struct RegistrationVerifier {
    client: Client,
    endpoint: String,
}

impl RegistrationVerifier {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/vehicle-verify", config.api_base_url),
        })
    }

    /// Verify `reg_no` on behalf of the holder of `token`.
    ///
    /// Nothing is sent when the number is blank or the seller is not logged in.
    pub async fn verify(
        &self,
        reg_no: &str,
        token: Option<&str>,
    ) -> Result<VerifiedRegistration, VerifyError> {
        let reg_no = reg_no.trim();
        if reg_no.is_empty() {
            return Err(VerifyError::EmptyRegistration);
        }

        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            info!("Login required before verifying {}", reg_no);
            return Err(VerifyError::LoginRequired);
        };

        debug!("POST {} for {}", self.endpoint, reg_no);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&VerifyRequest { reg_no })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Registration {} verified", reg_no);
            return Ok(VerifiedRegistration {
                reg_no: reg_no.to_string(),
            });
        }

        warn!("Verification of {} failed with status {}", reg_no, status);
        Err(VerifyError::from_status(status.as_u16()))
    }
}
