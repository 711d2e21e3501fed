//! Notifier that records messages instead of delivering them.
//!
//! Used when a channel has no credentials configured, and by tests that need
//! to observe or fail deliveries.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use mercato_sales::{Notifier, NotifyError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Email {
        to: String,
        subject: String,
        body: String,
    },
    Sms {
        recipients: Vec<String>,
        sender_id: String,
        message: String,
    },
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failure: Mutex<Option<NotifyError>>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before each delivery. Lets tests cancel mid-send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every following send fail with `err`.
    pub fn fail_with(&self, err: NotifyError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(err);
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    async fn deliver(&self, message: SentMessage) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failure
            .lock()
            .map_err(|_| NotifyError::Transport("recorder lock poisoned".into()))?
            .clone();
        if let Some(err) = failure {
            return Err(err);
        }

        self.sent
            .lock()
            .map_err(|_| NotifyError::Transport("recorder lock poisoned".into()))?
            .push(message);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.deliver(SentMessage::Email {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        })
        .await?;
        info!(to = %to, subject = %subject, "email recorded (no SMTP configured)");
        Ok(())
    }

    async fn send_sms(
        &self,
        recipients: &[String],
        sender_id: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        self.deliver(SentMessage::Sms {
            recipients: recipients.to_vec(),
            sender_id: sender_id.to_string(),
            message: message.to_string(),
        })
        .await?;
        info!(recipients = recipients.len(), "sms recorded (no gateway configured)");
        Ok(())
    }
}
