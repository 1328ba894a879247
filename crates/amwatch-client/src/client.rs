//! Alertmanager client using direct HTTP requests.
//!
//! [`AlertmanagerClient`] implements [`MonitoringApi`] against the
//! Alertmanager v2 REST API with the reqwest HTTP client.
//!
//! ## Example
//!
//! ```no_run
//! use amwatch_client::{AlertmanagerClient, ClientConfig};
//! use amwatch_core::{AlertFilter, MonitoringApi, MonitoringInstance};
//!
//! # async fn example() -> amwatch_core::Result<()> {
//! let client = AlertmanagerClient::new(ClientConfig::default())?;
//! let instance = MonitoringInstance::new("prod", "http://alertmanager:9093");
//! let alerts = client.fetch_alerts(&instance, &AlertFilter::default()).await?;
//! println!("{} alerts", alerts.len());
//! # Ok(())
//! # }
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use amwatch_core::error::{AmwatchError, Result};
use amwatch_core::ports::MonitoringApi;
use amwatch_core::types::{
    Alert, AlertFilter, AuthConfig, MonitorStatus, MonitoringInstance, Silence, SilenceFilter,
};

use crate::api_types::{
    ALERTS_PATH, SILENCES_PATH, STATUS_PATH, StatusResponse, alert_query, silence_query,
};
use crate::config::ClientConfig;

/// Alertmanager v2 API client.
pub struct AlertmanagerClient {
    config: ClientConfig,
    client: reqwest::Client,
}

/// Result of [`AlertmanagerClient::check_connection`].
#[derive(Debug, Clone)]
pub struct ConnectionCheck {
    pub reachable: bool,
    pub status: Option<MonitorStatus>,
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl AlertmanagerClient {
    /// Create a client from config.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AmwatchError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Fetch the status endpoint and report whether the instance answered.
    pub async fn check_connection(&self, instance: &MonitoringInstance) -> ConnectionCheck {
        let start = Instant::now();
        let result = self.fetch_status(instance).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(status) => ConnectionCheck {
                reachable: true,
                status: Some(status),
                error: None,
                latency_ms,
            },
            Err(e) => ConnectionCheck {
                reachable: false,
                status: None,
                error: Some(e.to_string()),
                latency_ms,
            },
        }
    }

    fn endpoint(instance: &MonitoringInstance, path: &str) -> Result<reqwest::Url> {
        let raw = format!("{}{}", instance.base_url(), path);
        let url = reqwest::Url::parse(&raw).map_err(|e| AmwatchError::InvalidUrl {
            url: instance.url.clone(),
            message: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AmwatchError::InvalidUrl {
                url: instance.url.clone(),
                message: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        instance: &MonitoringInstance,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let url = Self::endpoint(instance, path)?;
        let url_str = url.to_string();

        debug!(
            instance = %instance.id,
            url = %url_str,
            auth = instance.auth.auth_type(),
            "Sending Alertmanager request"
        );

        let mut request = self.client.get(url).query(query);
        request = match &instance.auth {
            AuthConfig::None => request,
            AuthConfig::Basic { username, password } => request.basic_auth(username, Some(password)),
            AuthConfig::Bearer { token } => request.bearer_auth(token),
        };

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(&url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AmwatchError::from_http_status(url_str, status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(&url_str, e))?;

        serde_json::from_str(&body).map_err(|e| AmwatchError::ResponseDecode {
            url: url_str,
            message: e.to_string(),
        })
    }

    fn map_transport_error(&self, url: &str, e: reqwest::Error) -> AmwatchError {
        if e.is_timeout() {
            AmwatchError::FetchTimeout {
                url: url.to_string(),
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            AmwatchError::FetchTransport {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl MonitoringApi for AlertmanagerClient {
    async fn fetch_alerts(
        &self,
        instance: &MonitoringInstance,
        filter: &AlertFilter,
    ) -> Result<Vec<Alert>> {
        self.get_json(instance, ALERTS_PATH, &alert_query(filter))
            .await
    }

    async fn fetch_silences(
        &self,
        instance: &MonitoringInstance,
        filter: &SilenceFilter,
    ) -> Result<Vec<Silence>> {
        self.get_json(instance, SILENCES_PATH, &silence_query(filter))
            .await
    }

    async fn fetch_status(&self, instance: &MonitoringInstance) -> Result<MonitorStatus> {
        let response: StatusResponse = self.get_json(instance, STATUS_PATH, &[]).await?;
        Ok(response.into())
    }
}
