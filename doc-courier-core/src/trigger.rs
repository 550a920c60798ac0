//! Entry point for front-ends: one call with the raw month text, one outcome
//! back that can be shown to a person as-is.

use crate::config::DispatchConfig;
use crate::contract::Mailer;
use crate::dispatch::{dispatch, DispatchReport};
use crate::error::DispatchError;
use crate::month::TargetMonth;
use tracing::{error, info};

#[derive(Debug)]
pub enum Outcome {
    Delivered { report: DispatchReport },
    Failed { kind: FailureKind, reason: String },
}

/// Coarse failure category, one per error family a front-end may want to
/// present differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InputValidation,
    Configuration,
    DirectoryAccess,
    Archive,
    Transport,
}

impl From<&DispatchError> for FailureKind {
    fn from(err: &DispatchError) -> Self {
        match err {
            DispatchError::InputValidation(_) => FailureKind::InputValidation,
            DispatchError::Configuration(_) => FailureKind::Configuration,
            DispatchError::DirectoryAccess { .. } => FailureKind::DirectoryAccess,
            DispatchError::Archive { .. } | DispatchError::Bundle { .. } => FailureKind::Archive,
            DispatchError::Transport(_) => FailureKind::Transport,
        }
    }
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }

    /// Text for the person who pressed the button.
    pub fn message(&self) -> String {
        match self {
            Outcome::Delivered { report } if report.sent => {
                let mut text = format!(
                    "E-mail sent successfully with {} bundle(s) for {}.",
                    report.bundles_sent(),
                    report.target
                );
                if !report.failed_tenants.is_empty() {
                    let skipped: Vec<String> = report
                        .failed_tenants
                        .iter()
                        .map(|f| f.tenant_index.to_string())
                        .collect();
                    text.push_str(&format!(" Skipped unreadable tenant(s): {}.", skipped.join(", ")));
                }
                text
            }
            Outcome::Delivered { report } => {
                format!("No documents found for {}; nothing was sent.", report.target)
            }
            Outcome::Failed { reason, .. } => reason.clone(),
        }
    }
}

impl From<Result<DispatchReport, DispatchError>> for Outcome {
    fn from(result: Result<DispatchReport, DispatchError>) -> Self {
        match result {
            Ok(report) => Outcome::Delivered { report },
            Err(err) => Outcome::Failed {
                kind: FailureKind::from(&err),
                reason: err.to_string(),
            },
        }
    }
}

/// Validates `month_input` (`MM/YYYY`) and the config, then runs the pipeline.
/// Nothing touches the filesystem or network unless both are valid.
pub async fn trigger<M>(config: &DispatchConfig, month_input: &str, mailer: &M) -> Outcome
where
    M: Mailer + ?Sized,
{
    let result = run_checked(config, month_input, mailer).await;
    match &result {
        Ok(report) => info!(sent = report.sent, bundles = report.bundles_sent(), "Run finished"),
        Err(e) => error!(error = %e, "Run failed"),
    }
    Outcome::from(result)
}

async fn run_checked<M>(
    config: &DispatchConfig,
    month_input: &str,
    mailer: &M,
) -> Result<DispatchReport, DispatchError>
where
    M: Mailer + ?Sized,
{
    let target: TargetMonth = month_input.parse()?;
    config.validate()?;
    dispatch(config, target, mailer).await
}
