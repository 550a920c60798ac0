//! This module implements the CLI interface for doc-courier: command parsing,
//! the async entrypoint, and user-visible output.
//!
//! All pipeline logic (selection, bundling, delivery, cleanup) lives in the
//! [`doc-courier-core`] crate. This module only loads the config, wires the
//! SMTP mailer, and prints the outcome.
//!
//! ## Commands
//! - `send --config <file> --month MM/YYYY`: bundle every tenant's documents
//!   for the month and e-mail them.
//! - `scan --config <file> --month MM/YYYY`: list what `send` would bundle,
//!   without writing or sending anything.
//!
//! [`doc-courier-core`]: ../../doc-courier-core/
use crate::load_config::load_config;
use crate::smtp::SmtpMailer;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use doc_courier_core::archive::scan_tenant;
use doc_courier_core::config::DispatchConfig;
use doc_courier_core::month::TargetMonth;
use doc_courier_core::trigger::{trigger, Outcome};
use std::path::PathBuf;

/// CLI for doc-courier: send each tenant's monthly documents by e-mail.
#[derive(Parser)]
#[clap(
    name = "doc-courier",
    version,
    about = "Bundle each tenant's XML/PDF documents for a month and e-mail them as zip attachments"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bundle and send the documents of the given month
    Send {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Target month as MM/YYYY
        #[clap(long)]
        month: String,
    },
    /// Show which files each tenant would contribute for the given month
    Scan {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Target month as MM/YYYY
        #[clap(long)]
        month: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Send { config, month } => {
            // Reject a bad month before the config file is even opened.
            month.parse::<TargetMonth>()?;
            let config = load_config(&config)?;
            let mailer = SmtpMailer::new(&config.smtp)
                .map_err(|e| anyhow!("failed to set up SMTP transport: {e}"))?;

            tracing::info!(command = "send", month = %month, "Starting dispatch");
            let outcome = trigger(&config, &month, &mailer).await;
            match &outcome {
                Outcome::Delivered { report } => {
                    tracing::info!(command = "send", ?report, "Dispatch complete");
                    println!("{}", outcome.message());
                    Ok(())
                }
                Outcome::Failed { kind, reason } => {
                    tracing::error!(command = "send", ?kind, error = %reason, "Dispatch failed");
                    Err(anyhow::Error::msg(reason.clone()))
                }
            }
        }
        Commands::Scan { config, month } => {
            let target = month.parse::<TargetMonth>()?;
            let config = load_config(&config)?;
            scan(&config, target)
        }
    }
}

fn scan(config: &DispatchConfig, target: TargetMonth) -> Result<()> {
    println!("Documents for {target}:");
    for (position, tenant) in config.tenants.iter().enumerate() {
        let tenant_index = position + 1;
        let selection =
            scan_tenant(tenant, target).with_context(|| format!("tenant {tenant_index}"))?;
        if selection.is_empty() {
            println!("  tenant {tenant_index}: no files");
            continue;
        }
        println!(
            "  tenant {tenant_index}: {} xml, {} pdf",
            selection.xml.len(),
            selection.pdf.len()
        );
        for file in selection.files() {
            println!(
                "    {}/{}",
                file.kind.segment(tenant_index),
                file.file_name
            );
        }
    }
    Ok(())
}
