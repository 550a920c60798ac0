#![doc = "SMTP implementation of the core `Mailer` trait."]
//
//! # SMTP delivery (CLI <-> Core)
//!
//! Bridges [`doc_courier_core::contract::Mailer`] to a real mail server with
//! lettre's tokio transport:
//!
//! - one connection per message, upgraded with STARTTLS before `AUTH`,
//! - username/password credentials from the config's `smtp` section,
//! - bundles attached as `application/zip` parts named after the bundle file.
//!
//! Without `smtp.timeout_secs` the transport's built-in timeout applies.

use async_trait::async_trait;
use doc_courier_core::config::SmtpSettings;
use doc_courier_core::contract::{BundleAttachment, Mailer, OutgoingMessage, TransportError};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, TransportError> {
        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| {
                tracing::error!(error = ?e, host = %settings.host, "Failed to configure SMTP relay");
                e
            })?
            .port(settings.port)
            .credentials(credentials);
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Some(Duration::from_secs(secs)));
        }

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            username = %settings.username,
            timeout_secs = ?settings.timeout_secs,
            "Initialized SMTP mailer"
        );
        Ok(SmtpMailer {
            transport: builder.build(),
            host: settings.host.clone(),
            port: settings.port,
        })
    }
}

/// Converts the core message into a MIME `multipart/mixed` e-mail: the plain
/// text body first, then one part per bundle.
pub fn build_email(message: &OutgoingMessage) -> Result<Message, TransportError> {
    let from: Mailbox = message.from.parse()?;
    let to: Mailbox = message.to.parse()?;
    let zip_type = ContentType::parse(BundleAttachment::CONTENT_TYPE)
        .map_err(|e| format!("invalid attachment content type: {e:?}"))?;

    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(message.body.clone()));
    for attachment in &message.attachments {
        parts = parts.singlepart(
            Attachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), zip_type.clone()),
        );
    }

    let email = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .multipart(parts)?;
    Ok(email)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        let email = build_email(&message)?;
        tracing::info!(
            host = %self.host,
            port = self.port,
            to = %message.to,
            attachments = message.attachments.len(),
            "Opening SMTP session"
        );
        match self.transport.send(email).await {
            Ok(response) => {
                tracing::info!(code = %response.code(), "SMTP server accepted message");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = ?e, host = %self.host, port = self.port, "SMTP send failed");
                Err(Box::new(e))
            }
        }
    }
}
