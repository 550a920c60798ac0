//! # contract: the seam between the pipeline and the mail transport
//!
//! The orchestrator composes one [`OutgoingMessage`] per run and hands it to a
//! [`Mailer`]. The production implementation (SMTP with STARTTLS and
//! credentials) lives in the CLI crate; tests use the generated `MockMailer`.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`. The mock is exported when the
//!   `test-export-mocks` feature is on (default), so integration tests in
//!   dependent crates can use it too.

use async_trait::async_trait;

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

/// Transport failures are opaque to the pipeline: connect, TLS, auth and
/// protocol errors all end the run the same way.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// One bundle as it travels in the message: the archive's file name and its
/// entire content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl BundleAttachment {
    /// Media type the attachment is tagged with.
    pub const CONTENT_TYPE: &'static str = "application/zip";
}

/// A composed message: one sender, one recipient, plain-text body and
/// zero or more bundle attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<BundleAttachment>,
}

/// Sends a composed message to its single recipient.
///
/// Implementations open one authenticated, encrypted session per call and
/// never retry; any failure is returned to the caller as-is.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<(), TransportError>;
}
