//! Notification adapters.
//!
//! [`ChannelNotifier`] routes email to SMTP and SMS to the HTTP gateway when
//! each is configured, and falls back to a [`RecordingNotifier`] per channel
//! otherwise.

mod recording;
mod sms;
mod smtp;

use async_trait::async_trait;
use tracing::warn;

use mercato_sales::{Notifier, NotifyError};

use crate::config::AppConfig;

pub use recording::{RecordingNotifier, SentMessage};
pub use sms::SmsGatewayClient;
pub use smtp::SmtpEmailSender;

#[derive(Debug, Default)]
pub struct ChannelNotifier {
    email: Option<SmtpEmailSender>,
    sms: Option<SmsGatewayClient>,
    fallback: RecordingNotifier,
}

impl ChannelNotifier {
    pub fn new(email: Option<SmtpEmailSender>, sms: Option<SmsGatewayClient>) -> Self {
        Self {
            email,
            sms,
            fallback: RecordingNotifier::new(),
        }
    }

    /// Build from whichever channel groups are configured.
    ///
    /// An SMTP host that lettre cannot build a relay for is logged and the
    /// email channel falls back to recording.
    pub fn from_config(config: &AppConfig) -> Self {
        let email = config.email.as_ref().and_then(|c| match SmtpEmailSender::new(c) {
            Ok(sender) => Some(sender),
            Err(e) => {
                warn!(error = %e, host = %c.smtp_host, "smtp relay unavailable; recording emails instead");
                None
            }
        });
        let sms = config.sms.clone().map(SmsGatewayClient::new);
        Self::new(email, sms)
    }

    /// Messages captured for channels that have no real transport.
    pub fn recorded(&self) -> Vec<SentMessage> {
        self.fallback.sent()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        match &self.email {
            Some(smtp) => smtp.send(to, subject, body).await,
            None => self.fallback.send_email(to, subject, body).await,
        }
    }

    async fn send_sms(
        &self,
        recipients: &[String],
        sender_id: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        match &self.sms {
            Some(gateway) => gateway.send(recipients, sender_id, message).await,
            None => self.fallback.send_sms(recipients, sender_id, message).await,
        }
    }
}
