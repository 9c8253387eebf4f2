use super::{NotificationSink, SinkError};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use tracing::debug;

/// SMTP delivery for the EMAIL channel.
pub struct EmailSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSink {
    /// Build a sink for a plain or STARTTLS relay.
    pub fn new(host: &str, port: u16, starttls: bool, from: &str) -> Result<Self, SinkError> {
        let transport = if starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                .port(port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .port(port)
                .build()
        };
        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }

    fn message_builder(
        &self,
        recipients: &[String],
        subject: &str,
    ) -> Result<lettre::message::MessageBuilder, SinkError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in recipients {
            builder = builder.to(recipient.parse()?);
        }
        Ok(builder)
    }
}

#[async_trait]
impl NotificationSink for EmailSink {
    async fn send_digest(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), SinkError> {
        let message = self
            .message_builder(recipients, subject)?
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        debug!(recipients = recipients.len(), subject = %subject, "sending email digest");
        self.transport.send(message).await?;
        Ok(())
    }

    async fn send_with_attachment(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<(), SinkError> {
        let content = tokio::fs::read(attachment).await?;
        let filename = attachment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run.log".to_string());

        let message = self.message_builder(recipients, subject)?.multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body.to_string()))
                .singlepart(Attachment::new(filename).body(content, ContentType::TEXT_PLAIN)),
        )?;
        debug!(
            recipients = recipients.len(),
            subject = %subject,
            attachment = %attachment.display(),
            "sending email with attachment"
        );
        self.transport.send(message).await?;
        Ok(())
    }
}
