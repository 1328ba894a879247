//! # amwatch-config
//!
//! Settings/instance store for amwatch.
//!
//! This crate provides:
//! - [`AppConfig`] - The parsed `~/.amwatch/config.yaml`
//! - [`FileSettingsProvider`] - [`amwatch_core::SettingsProvider`] over the file
//! - [`ConfigWatcher`] - Debounced hot-reload events

pub mod file;
pub mod provider;
pub mod watcher;

pub use file::{AppConfig, CONFIG_FILE_NAME, expand_home};
pub use provider::FileSettingsProvider;
pub use watcher::{ConfigEvent, ConfigWatcher};
