use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Everything one run needs. Passed explicitly into the orchestrator and the
/// delivery agent; nothing here is global.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    pub smtp: SmtpSettings,
    pub recipient: String,
    pub message: MessageTemplate,
    #[serde(default)]
    pub tenants: Vec<TenantEntry>,
    /// Where bundles are written while a run is in flight.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub policy: DispatchPolicy,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Transport endpoint and the sender's credentials.
#[derive(Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Also used as the sender address.
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

// Keeps the password out of debug logs.
impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

/// One business unit's two source locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEntry {
    pub xml_dir: PathBuf,
    pub pdf_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPolicy {
    #[serde(default)]
    pub on_directory_error: DirectoryErrorPolicy,
    /// Send a body-only message when no tenant produced a bundle.
    #[serde(default = "default_send_when_empty")]
    pub send_when_empty: bool,
}

fn default_send_when_empty() -> bool {
    true
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            on_directory_error: DirectoryErrorPolicy::default(),
            send_when_empty: default_send_when_empty(),
        }
    }
}

/// What a missing or unreadable tenant directory does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryErrorPolicy {
    /// Abort the whole run; nothing is sent.
    #[default]
    Abort,
    /// Record the tenant as failed and continue with the next one.
    Skip,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl DispatchConfig {
    /// Checks that need no I/O, including the syntax of both addresses. A run
    /// must not touch the filesystem with a config that fails here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp.host.trim().is_empty() {
            return Err(ConfigError::invalid("smtp.host", "must not be empty"));
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::invalid("smtp.port", "must be between 1 and 65535"));
        }
        if self.smtp.username.trim().is_empty() {
            return Err(ConfigError::invalid("smtp.username", "must not be empty"));
        }
        if self.smtp.password.is_empty() {
            return Err(ConfigError::invalid("smtp.password", "must not be empty"));
        }
        if self.smtp.timeout_secs == Some(0) {
            return Err(ConfigError::invalid("smtp.timeout_secs", "must be positive"));
        }
        if self.recipient.trim().is_empty() {
            return Err(ConfigError::invalid("recipient", "must not be empty"));
        }
        if self.message.subject.trim().is_empty() {
            return Err(ConfigError::invalid("message.subject", "must not be empty"));
        }
        check_mailbox("smtp.username", &self.smtp.username)?;
        check_mailbox("recipient", &self.recipient)?;
        for (position, tenant) in self.tenants.iter().enumerate() {
            if tenant.xml_dir.as_os_str().is_empty() || tenant.pdf_dir.as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    "tenants",
                    format!("tenant {} has an empty directory path", position + 1),
                ));
            }
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            smtp_host = %self.smtp.host,
            smtp_port = self.smtp.port,
            recipient = %self.recipient,
            tenants = self.tenants.len(),
            output_dir = %self.output_dir.display(),
            "Loaded dispatch config"
        );
        debug!(?self, "Dispatch config loaded (full debug)");
    }
}

fn check_mailbox(field: &'static str, value: &str) -> Result<(), ConfigError> {
    value.parse::<Mailbox>().map(|_| ()).map_err(|e| {
        error!(field, value, error = %e, "Config address is not a valid mailbox");
        ConfigError::invalid(field, format!("'{value}' is not a valid e-mail address: {e}"))
    })
}
