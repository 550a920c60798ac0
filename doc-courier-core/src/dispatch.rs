//! High-level pipeline: archive every tenant for the target month, then
//! deliver the bundles in a single message.
//!
//! # Responsibilities
//! - Visit tenants strictly in configured order; the 1-based position is the
//!   tenant index used in bundle names.
//! - Distinguish "no files for this tenant" (skip, keep going) from
//!   "directory unreadable" (abort by default, or skip per policy).
//! - Hand the accumulated bundles to [`deliver`] exactly once, and report what
//!   was sent.
//!
//! # Error Handling
//! Every error ends the run; nothing is retried. Bundles built before an abort
//! stay on disk and their paths are logged.

use crate::archive::{self, Bundle};
use crate::config::{DirectoryErrorPolicy, DispatchConfig};
use crate::contract::Mailer;
use crate::deliver::deliver;
use crate::error::DispatchError;
use crate::month::TargetMonth;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Result of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub target: TargetMonth,
    /// Bundles attached to the message, in tenant order. Their files are gone
    /// once `sent` is true.
    pub bundles: Vec<Bundle>,
    /// Tenants with no matching file in either directory.
    pub empty_tenants: Vec<usize>,
    /// Tenants skipped because a directory could not be read.
    pub failed_tenants: Vec<TenantFailure>,
    pub sent: bool,
}

impl DispatchReport {
    pub fn bundles_sent(&self) -> usize {
        if self.sent {
            self.bundles.len()
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantFailure {
    pub tenant_index: usize,
    pub reason: String,
}

pub async fn dispatch<M>(
    config: &DispatchConfig,
    target: TargetMonth,
    mailer: &M,
) -> Result<DispatchReport, DispatchError>
where
    M: Mailer + ?Sized,
{
    info!(%target, tenants = config.tenants.len(), "[DISPATCH] Starting run");

    let mut bundles: Vec<Bundle> = Vec::new();
    let mut empty_tenants = Vec::new();
    let mut failed_tenants = Vec::new();

    for (position, tenant) in config.tenants.iter().enumerate() {
        let tenant_index = position + 1;
        debug!(tenant_index, xml_dir = %tenant.xml_dir.display(), pdf_dir = %tenant.pdf_dir.display(), "[DISPATCH] Archiving tenant");

        match archive::archive_tenant(tenant_index, tenant, target, &config.output_dir) {
            Ok(Some(bundle)) => {
                info!(tenant_index, files = bundle.file_count(), "[DISPATCH] Tenant bundled");
                bundles.push(bundle);
            }
            Ok(None) => {
                info!(tenant_index, %target, "[DISPATCH] No files for this tenant/month, skipping");
                empty_tenants.push(tenant_index);
            }
            Err(e) => {
                let err = DispatchError::from_archive(tenant_index, e);
                let skippable = matches!(err, DispatchError::DirectoryAccess { .. })
                    && config.policy.on_directory_error == DirectoryErrorPolicy::Skip;
                if skippable {
                    warn!(tenant_index, error = %err, "[DISPATCH] Skipping unreadable tenant");
                    failed_tenants.push(TenantFailure {
                        tenant_index,
                        reason: err.to_string(),
                    });
                    continue;
                }

                error!(tenant_index, error = %err, "[DISPATCH][ERROR] Aborting run");
                if !bundles.is_empty() {
                    let left: Vec<&PathBuf> = bundles.iter().map(|b| &b.path).collect();
                    warn!(bundles = ?left, "[DISPATCH] Bundles built before the abort remain on disk");
                }
                return Err(err);
            }
        }
    }

    if bundles.is_empty() && !config.policy.send_when_empty {
        info!(%target, "[DISPATCH] No bundles and send_when_empty is off; nothing sent");
        return Ok(DispatchReport {
            target,
            bundles,
            empty_tenants,
            failed_tenants,
            sent: false,
        });
    }

    let paths: Vec<PathBuf> = bundles.iter().map(|b| b.path.clone()).collect();
    deliver(
        mailer,
        &config.smtp,
        &config.recipient,
        &config.message,
        &paths,
    )
    .await?;

    let report = DispatchReport {
        target,
        bundles,
        empty_tenants,
        failed_tenants,
        sent: true,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "[DISPATCH][DEBUG] Run report"),
        Err(e) => error!(error = ?e, "[DISPATCH][DEBUG] Failed to serialize run report"),
    }
    info!(%target, bundles_sent = report.bundles_sent(), "[DISPATCH] Run complete");
    Ok(report)
}
