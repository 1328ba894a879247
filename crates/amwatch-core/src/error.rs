//! Error types for amwatch operations.
//!
//! This module defines [`AmwatchError`], the error enum shared by every crate
//! in the workspace. Poll-cycle stages catch these locally and decide whether
//! the cycle continues; nothing here is ever surfaced to the operator except
//! through the badge's degraded indicator and the log.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`AmwatchError`].
pub type Result<T> = std::result::Result<T, AmwatchError>;

/// Error type for all amwatch operations.
#[derive(Debug, Error)]
pub enum AmwatchError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file not found
    #[error("Configuration not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Settings or the active instance could not be read
    #[error("Settings unavailable: {message}")]
    SettingsUnavailable { message: String },

    // =========================================================================
    // Monitoring API Errors
    // =========================================================================
    /// Request exceeded the configured timeout
    #[error("Request to {url} timed out after {timeout_secs}s")]
    FetchTimeout { url: String, timeout_secs: u64 },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}: {message}")]
    FetchHttp {
        url: String,
        status: u16,
        message: String,
    },

    /// Connection, DNS or TLS failure before a response arrived
    #[error("Request to {url} failed: {message}")]
    FetchTransport { url: String, message: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response from {url}: {message}")]
    ResponseDecode { url: String, message: String },

    /// Instance URL could not be used to build a request
    #[error("Invalid instance URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    // =========================================================================
    // Sink Errors
    // =========================================================================
    /// A notification could not be delivered
    #[error("Failed to dispatch notification {id}: {message}")]
    NotificationDispatch { id: String, message: String },

    /// The badge could not be updated
    #[error("Failed to update badge: {message}")]
    BadgeUpdate { message: String },

    // =========================================================================
    // Cache Errors
    // =========================================================================
    /// Cache read or write failed
    #[error("Cache {operation} failed: {message}")]
    Cache { operation: String, message: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error in {context}: {message}")]
    Json {
        context: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // =========================================================================
    // File Watching Errors
    // =========================================================================
    /// File watcher initialization failed
    #[error("Failed to initialize file watcher: {message}")]
    WatcherInit { message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in amwatch)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AmwatchError {
    // =========================================================================
    // Constructor helpers for common error patterns
    // =========================================================================

    /// Create a ConfigNotFound error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a ConfigNotFound error with source
    pub fn config_not_found_with_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: Some(source),
        }
    }

    /// Create a ConfigValidation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a SettingsUnavailable error
    pub fn settings_unavailable(message: impl Into<String>) -> Self {
        Self::SettingsUnavailable {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a JSON error
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a cache error
    pub fn cache(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Cache {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a badge update error
    pub fn badge(message: impl Into<String>) -> Self {
        Self::BadgeUpdate {
            message: message.into(),
        }
    }

    /// Create a notification dispatch error
    pub fn notification(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotificationDispatch {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an error from a non-success HTTP status.
    ///
    /// The body is truncated so a misbehaving proxy cannot flood the log.
    pub fn from_http_status(url: impl Into<String>, status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 200;
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            http_reason(status).to_string()
        } else if trimmed.chars().count() > MAX_BODY {
            let cut: String = trimmed.chars().take(MAX_BODY).collect();
            format!("{cut}...")
        } else {
            trimmed.to_string()
        };

        Self::FetchHttp {
            url: url.into(),
            status,
            message,
        }
    }

    // =========================================================================
    // Error classification helpers
    // =========================================================================

    /// Returns true if this error came from talking to the monitoring API
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout { .. }
                | Self::FetchHttp { .. }
                | Self::FetchTransport { .. }
                | Self::ResponseDecode { .. }
                | Self::InvalidUrl { .. }
        )
    }

    /// Returns true if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::FetchTimeout { .. })
    }

    /// Returns true if the next scheduled tick may succeed without user action
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::FetchTimeout { .. } | Self::FetchTransport { .. } => true,
            Self::FetchHttp { status, .. } => *status == 429 || *status >= 500,
            Self::SettingsUnavailable { .. } | Self::Cache { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigInvalid { .. }
                | Self::ConfigValidation { .. }
                | Self::SettingsUnavailable { .. }
        )
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Create ~/.amwatch/config.yaml or pass --config <path>")
            }
            Self::ConfigInvalid { .. } => Some("Check the YAML syntax of the configuration file"),
            Self::FetchTimeout { .. } => {
                Some("Check that the Alertmanager URL is reachable or raise request_timeout_secs")
            }
            Self::FetchHttp { status: 401, .. } | Self::FetchHttp { status: 403, .. } => {
                Some("Check the credentials configured for this instance")
            }
            Self::FetchHttp { status: 404, .. } => {
                Some("Check that the instance URL points at an Alertmanager with the v2 API")
            }
            Self::InvalidUrl { .. } => Some("Instance URLs must start with http:// or https://"),
            _ => None,
        }
    }
}

fn http_reason(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not found",
        408 => "request timeout",
        429 => "too many requests",
        500 => "internal server error",
        502 => "bad gateway",
        503 => "service unavailable",
        504 => "gateway timeout",
        _ => "unexpected status",
    }
}
