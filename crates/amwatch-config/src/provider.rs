//! [`SettingsProvider`] backed by the YAML config file.
//!
//! The file is re-read on every call so edits made while amwatch is running
//! apply from the next poll cycle without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::ports::SettingsProvider;
use amwatch_core::types::{MonitoringInstance, Settings};

use crate::file::AppConfig;

/// Settings store reading `config.yaml` on demand.
#[derive(Debug, Clone)]
pub struct FileSettingsProvider {
    path: PathBuf,
}

impl FileSettingsProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the whole file.
    pub async fn load(&self) -> Result<AppConfig> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AmwatchError::settings_unavailable(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))
        })?;

        AppConfig::parse(&content, &self.path)
            .map_err(|e| AmwatchError::settings_unavailable(e.to_string()))
    }
}

#[async_trait]
impl SettingsProvider for FileSettingsProvider {
    async fn active_instance(&self) -> Result<Option<MonitoringInstance>> {
        Ok(self.load().await?.active().cloned())
    }

    async fn settings(&self) -> Result<Settings> {
        Ok(self.load().await?.settings)
    }
}
