//! Outbound notification port.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a notification channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The channel could not be reached or the connection failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The channel answered but refused the message.
    #[error("channel rejected message (status {status}): {detail}")]
    Rejected { status: u16, detail: String },
}

/// Sends messages through external channels. No retries of its own.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;

    async fn send_sms(
        &self,
        recipients: &[String],
        sender_id: &str,
        message: &str,
    ) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        (**self).send_email(to, subject, body).await
    }

    async fn send_sms(
        &self,
        recipients: &[String],
        sender_id: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        (**self).send_sms(recipients, sender_id, message).await
    }
}
