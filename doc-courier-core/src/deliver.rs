//! Delivery agent: turns bundle files into one message, hands it to a
//! [`Mailer`], and removes the bundles once the message is accepted.
//!
//! Bundle content is read fully into memory per attachment. Monthly document
//! sets fit comfortably; very large bundles would not.

use crate::config::{MessageTemplate, SmtpSettings};
use crate::contract::{BundleAttachment, Mailer, OutgoingMessage};
use crate::error::DispatchError;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Builds the message for `bundles`. The sender is the SMTP username.
pub fn compose_message(
    smtp: &SmtpSettings,
    recipient: &str,
    template: &MessageTemplate,
    bundles: &[PathBuf],
) -> Result<OutgoingMessage, DispatchError> {
    let mut attachments = Vec::with_capacity(bundles.len());
    for path in bundles {
        let content = fs::read(path).map_err(|source| {
            error!(error = ?source, bundle = %path.display(), "Failed to read bundle for attachment");
            DispatchError::Bundle {
                path: path.clone(),
                source,
            }
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(filename = %filename, size = content.len(), "Attached bundle");
        attachments.push(BundleAttachment { filename, content });
    }

    Ok(OutgoingMessage {
        from: smtp.username.clone(),
        to: recipient.to_string(),
        subject: template.subject.clone(),
        body: template.body.clone(),
        attachments,
    })
}

/// Sends one message carrying every bundle in `bundles`.
///
/// Bundle files are deleted only after the mailer reports success. On a
/// transport failure they stay where they are so the run can be inspected or
/// repeated by hand.
pub async fn deliver<M>(
    mailer: &M,
    smtp: &SmtpSettings,
    recipient: &str,
    template: &MessageTemplate,
    bundles: &[PathBuf],
) -> Result<(), DispatchError>
where
    M: Mailer + ?Sized,
{
    let message = compose_message(smtp, recipient, template, bundles)?;
    info!(
        to = %message.to,
        attachments = message.attachments.len(),
        host = %smtp.host,
        port = smtp.port,
        "[DELIVER] Sending message"
    );

    if let Err(e) = mailer.send(message).await {
        error!(
            error = %e,
            kept = ?bundles,
            "[DELIVER][ERROR] Transport failed; bundles left on disk"
        );
        return Err(DispatchError::Transport(e));
    }
    info!(to = %recipient, "[DELIVER] Message sent");

    remove_bundles(bundles);
    Ok(())
}

fn remove_bundles(bundles: &[PathBuf]) {
    for path in bundles {
        match fs::remove_file(path) {
            Ok(()) => debug!(bundle = %path.display(), "Removed delivered bundle"),
            // The message is already out; a stale bundle is only clutter.
            Err(e) => warn!(error = ?e, bundle = %path.display(), "Failed to remove delivered bundle"),
        }
    }
}
