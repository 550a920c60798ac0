#![doc = "doc-courier-core: core pipeline library for doc-courier."]

//! This crate holds the selection, archival and delivery pipeline. The SMTP
//! transport, configuration file parsing and the command line live in the
//! `doc-courier` crate.
//!
//! # Usage
//! Build a [`config::DispatchConfig`], pick a [`contract::Mailer`], then call
//! [`trigger::trigger`] with the month text or [`dispatch::dispatch`] with a
//! parsed [`month::TargetMonth`].

pub mod archive;
pub mod config;
pub mod contract;
pub mod deliver;
pub mod dispatch;
pub mod error;
pub mod month;
pub mod trigger;

pub use error::DispatchError;
