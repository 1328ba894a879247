//! # amwatch-client
//!
//! Alertmanager v2 API client for amwatch.
//!
//! This crate provides:
//! - [`AlertmanagerClient`] - [`amwatch_core::MonitoringApi`] over HTTP
//! - [`ClientConfig`] - Timeouts and user agent
//! - [`api_types`] - Wire types and query encoding

pub mod api_types;
pub mod client;
pub mod config;

pub use client::{AlertmanagerClient, ConnectionCheck};
pub use config::ClientConfig;
