//! The `config.yaml` file: instances, the active selection and settings.
//!
//! ```yaml
//! active_instance: prod
//! instances:
//!   - id: prod
//!     url: https://alertmanager.example.com
//!     auth: { type: bearer, token: "..." }
//! settings:
//!   refresh_interval_secs: 60
//!   request_timeout_secs: 10
//!   notifications_enabled: true
//! cache_path: ~/.amwatch/cache.db
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::logging::amwatch_home;
use amwatch_core::types::{MonitoringInstance, Settings};

/// Name of the config file inside `~/.amwatch/`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Id of the instance to poll; `None` means idle
    #[serde(default)]
    pub active_instance: Option<String>,

    /// Configured monitoring backends
    #[serde(default)]
    pub instances: Vec<MonitoringInstance>,

    /// User preferences
    #[serde(default)]
    pub settings: Settings,

    /// SQLite cache location; absent means an in-memory cache
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    /// File the badge state is mirrored to
    #[serde(default)]
    pub badge_file: Option<PathBuf>,

    /// Desktop notification command (e.g. `notify-send`)
    #[serde(default)]
    pub notify_command: Option<String>,
}

impl AppConfig {
    /// Default config location: `~/.amwatch/config.yaml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(amwatch_home()?.join(CONFIG_FILE_NAME))
    }

    /// Load and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AmwatchError::config_not_found_with_source(path, e)
            } else {
                AmwatchError::io("reading config", path, e)
            }
        })?;
        Self::parse(&content, path)
    }

    /// Parse and validate YAML content. `path` is used for error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| AmwatchError::ConfigInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        debug!(
            path = %path.display(),
            instances = config.instances.len(),
            active = ?config.active_instance,
            "Parsed amwatch config"
        );
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for instance in &self.instances {
            if instance.id.trim().is_empty() {
                return Err(AmwatchError::config_validation("instance id must not be empty"));
            }
            if !seen.insert(instance.id.as_str()) {
                return Err(AmwatchError::config_validation(format!(
                    "duplicate instance id '{}'",
                    instance.id
                )));
            }
            let url = instance.url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AmwatchError::config_validation(format!(
                    "instance '{}' url must start with http:// or https://, got '{}'",
                    instance.id, instance.url
                )));
            }
        }

        if let Some(active) = &self.active_instance {
            if self.instance(active).is_none() {
                return Err(AmwatchError::config_validation(format!(
                    "active_instance '{active}' does not name a configured instance"
                )));
            }
        }

        if self.settings.request_timeout_secs == 0 {
            return Err(AmwatchError::config_validation(
                "request_timeout_secs must be greater than 0",
            ));
        }

        if self.settings.refresh_interval_secs == 0 {
            return Err(AmwatchError::config_validation(
                "refresh_interval_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Look up an instance by id.
    pub fn instance(&self, id: &str) -> Option<&MonitoringInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// The active instance, if one is selected.
    pub fn active(&self) -> Option<&MonitoringInstance> {
        self.active_instance
            .as_deref()
            .and_then(|id| self.instance(id))
    }

    /// Cache path with `~` expanded.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache_path.as_deref().map(expand_home)
    }

    /// Badge file path with `~` expanded.
    pub fn badge_file(&self) -> Option<PathBuf> {
        self.badge_file.as_deref().map(expand_home)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        Ok(home) => PathBuf::from(home).join(rest),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amwatch_core::types::AuthConfig;

    const SAMPLE: &str = r#"
active_instance: prod
instances:
  - id: prod
    url: https://am.example.com/
    auth:
      type: basic
      username: ops
      password: pw
  - id: staging
    url: http://am-staging:9093
settings:
  refresh_interval_secs: 15
  notifications_enabled: false
  default_filter:
    silenced: true
    label_matchers:
      - severity="critical"
cache_path: ~/.amwatch/cache.db
"#;

    fn path() -> PathBuf {
        PathBuf::from("/tmp/config.yaml")
    }

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::parse(SAMPLE, &path()).unwrap();
        assert_eq!(config.instances.len(), 2);
        let active = config.active().unwrap();
        assert_eq!(active.id, "prod");
        assert_eq!(active.auth.auth_type(), "basic");
        assert!(matches!(active.auth, AuthConfig::Basic { .. }));
        assert_eq!(config.instance("staging").unwrap().auth, AuthConfig::None);

        assert_eq!(config.settings.refresh_interval_secs, 15);
        assert_eq!(config.settings.request_timeout_secs, 10);
        assert!(!config.settings.notifications_enabled);
        assert!(config.settings.badge_enabled);
        assert!(config.settings.default_filter.silenced);
        assert!(config.settings.default_filter.active);
        assert_eq!(config.settings.default_filter.label_matchers.len(), 1);
    }

    #[test]
    fn test_empty_file_is_idle_config() {
        let config = AppConfig::parse("{}", &path()).unwrap();
        assert!(config.active().is_none());
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn test_unknown_active_instance_rejected() {
        let yaml = "active_instance: nope\ninstances: []\n";
        let err = AppConfig::parse(yaml, &path()).unwrap_err();
        assert!(matches!(err, AmwatchError::ConfigValidation { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
instances:
  - { id: a, url: "http://one" }
  - { id: a, url: "http://two" }
"#;
        let err = AppConfig::parse(yaml, &path()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_bad_url_rejected() {
        let yaml = "instances:\n  - { id: a, url: \"am:9093\" }\n";
        assert!(AppConfig::parse(yaml, &path()).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = "settings:\n  request_timeout_secs: 0\n";
        assert!(AppConfig::parse(yaml, &path()).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_config_invalid() {
        let err = AppConfig::parse("instances: [", &path()).unwrap_err();
        assert!(matches!(err, AmwatchError::ConfigInvalid { .. }));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, AmwatchError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&file, SAMPLE).unwrap();
        let config = AppConfig::load(&file).unwrap();
        assert_eq!(config.active().unwrap().base_url(), "https://am.example.com");
    }

    #[test]
    fn test_expand_home() {
        let absolute = PathBuf::from("/var/lib/amwatch/cache.db");
        assert_eq!(expand_home(&absolute), absolute);

        let expanded = expand_home(Path::new("~/.amwatch/cache.db"));
        assert!(expanded.ends_with(".amwatch/cache.db"));
        assert!(!expanded.starts_with("~"));
    }
}
