use super::{NotificationSink, SinkError};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Webhook message payload. The `channel` field carries the target address
/// so one webhook can serve several rooms.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    channel: &'a str,
    text: String,
}

/// Webhook delivery for the CHAT channel.
///
/// Chat rooms cannot carry file attachments, so `send_with_attachment`
/// inlines a size-capped tail of the attachment below the digest body and
/// names the full path for anyone who needs the rest.
pub struct ChatSink {
    webhook_url: String,
    client: reqwest::Client,
    max_inline_bytes: usize,
}

impl ChatSink {
    pub fn new(webhook_url: &str, max_inline_bytes: usize) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            webhook_url: webhook_url.to_string(),
            client,
            max_inline_bytes,
        })
    }

    async fn post(&self, channel: &str, text: String) -> Result<(), SinkError> {
        let payload = ChatMessage { channel, text };
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SinkError::WebhookStatus {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        debug!(channel = %channel, "chat message delivered");
        Ok(())
    }

    fn tail(&self, content: &str) -> String {
        if content.len() <= self.max_inline_bytes {
            return content.to_string();
        }
        // Cut on a line boundary inside the size cap. The cap is a byte
        // count, so snap forward to the next char boundary first.
        let mut start = content.len() - self.max_inline_bytes;
        while !content.is_char_boundary(start) {
            start += 1;
        }
        let tail = &content[start..];
        match tail.find('\n') {
            Some(idx) => tail[idx + 1..].to_string(),
            None => tail.to_string(),
        }
    }
}

#[async_trait]
impl NotificationSink for ChatSink {
    async fn send_digest(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), SinkError> {
        let mut first_err = None;
        for recipient in recipients {
            if let Err(err) = self
                .post(recipient, format!("**{}**\n{}", subject, body))
                .await
            {
                warn!(channel = %recipient, error = %err, "chat delivery failed");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn send_with_attachment(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<(), SinkError> {
        let content = tokio::fs::read_to_string(attachment).await.unwrap_or_default();
        let tail = self.tail(&content);
        let text = format!(
            "**{}**\n{}\n--- log tail ({}) ---\n{}",
            subject,
            body,
            attachment.display(),
            tail
        );
        let mut first_err = None;
        for recipient in recipients {
            if let Err(err) = self.post(recipient, text.clone()).await {
                warn!(channel = %recipient, error = %err, "chat delivery failed");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
