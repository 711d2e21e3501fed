//! HTTP JSON SMS gateway client.

use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{info, instrument};

use mercato_sales::NotifyError;

use crate::config::SmsConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SmsRequest<'a> {
    username: &'a str,
    message: &'a str,
    sender_id: &'a str,
    phone_numbers: &'a [String],
}

/// Posts bulk SMS requests to the configured gateway endpoint.
#[derive(Clone)]
pub struct SmsGatewayClient {
    http: Client,
    config: SmsConfig,
}

impl SmsGatewayClient {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    #[instrument(skip(self, message), fields(recipients = recipients.len()), err(Display))]
    pub async fn send(&self, recipients: &[String], sender_id: &str, message: &str) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::InvalidAddress("no SMS recipients".into()));
        }

        let payload = SmsRequest {
            username: &self.config.username,
            message,
            sender_id,
            phone_numbers: recipients,
        };

        let resp = self
            .http
            .post(&self.config.api_url)
            .header("apiKey", self.config.api_key.expose_secret())
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                detail: resp.text().await.unwrap_or_default(),
            });
        }

        info!(status = status.as_u16(), "sms accepted by gateway");
        Ok(())
    }
}

impl std::fmt::Debug for SmsGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsGatewayClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
