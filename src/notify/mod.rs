pub mod chat;
pub mod email;
pub mod router;

use crate::classify::OutcomeStatus;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use chat::ChatSink;
pub use email::EmailSink;
pub use router::{DeliveryResult, Router};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("smtp transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("message build error: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {message}")]
    WebhookStatus { status: u16, message: String },

    #[error("attachment read failed: {0}")]
    Attachment(#[from] std::io::Error),

    #[error("no sink configured for channel {0:?}")]
    ChannelUnconfigured(ChannelKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Chat,
}

/// One configured notification destination: a channel, an address on that
/// channel, and the set of outcome statuses routed to it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NotificationTarget {
    pub channel: ChannelKind,
    pub address: String,
    pub statuses: Vec<OutcomeStatus>,
    /// Attach the cleaned daily archive to digest deliveries.
    #[serde(default)]
    pub attach_archive: bool,
}

impl NotificationTarget {
    pub fn matches(&self, status: OutcomeStatus) -> bool {
        self.statuses.contains(&status)
    }
}

/// Uniform delivery contract across channels. Any sink implementing both
/// operations is a valid target; the router never needs to know which
/// concrete transport sits behind it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_digest(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), SinkError>;

    async fn send_with_attachment(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<(), SinkError>;
}
