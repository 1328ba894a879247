//! Alertmanager v2 wire types and query encoding.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use amwatch_core::types::{AlertFilter, MonitorStatus, SilenceFilter};

/// Path of the alerts endpoint.
pub const ALERTS_PATH: &str = "/api/v2/alerts";

/// Path of the silences endpoint.
pub const SILENCES_PATH: &str = "/api/v2/silences";

/// Path of the status endpoint.
pub const STATUS_PATH: &str = "/api/v2/status";

/// Body of `GET /api/v2/status` (only the fields amwatch reads).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub cluster: ClusterStatus,
    pub uptime: DateTime<Utc>,
    pub version_info: VersionInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterStatus {
    pub status: String,
    #[serde(default)]
    pub peers: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}

impl From<StatusResponse> for MonitorStatus {
    fn from(response: StatusResponse) -> Self {
        Self {
            version: response.version_info.version,
            uptime: response.uptime,
            cluster_status: response.cluster.status,
            cluster_peers: response.cluster.peers.len(),
        }
    }
}

/// Query pairs for an alert fetch.
///
/// `filter` repeats once per label matcher, as Alertmanager expects.
pub fn alert_query(filter: &AlertFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("active", filter.active.to_string()),
        ("silenced", filter.silenced.to_string()),
        ("inhibited", filter.inhibited.to_string()),
        ("unprocessed", filter.unprocessed.to_string()),
    ];

    for matcher in filter.label_matchers.iter().filter(|m| !m.trim().is_empty()) {
        query.push(("filter", matcher.trim().to_string()));
    }

    if let Some(receiver) = filter.receiver.as_deref().filter(|r| !r.trim().is_empty()) {
        query.push(("receiver", receiver.to_string()));
    }

    query
}

/// Query pairs for a silence fetch.
pub fn silence_query(filter: &SilenceFilter) -> Vec<(&'static str, String)> {
    filter
        .label_matchers
        .iter()
        .filter(|m| !m.trim().is_empty())
        .map(|m| ("filter", m.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_query_default_filter() {
        let query = alert_query(&AlertFilter::default());
        assert_eq!(
            query,
            vec![
                ("active", "true".to_string()),
                ("silenced", "false".to_string()),
                ("inhibited", "false".to_string()),
                ("unprocessed", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_alert_query_with_matchers_and_receiver() {
        let filter = AlertFilter {
            label_matchers: vec![
                "severity=~\"critical|warning\"".to_string(),
                "  ".to_string(),
                "team=\"infra\"".to_string(),
            ],
            receiver: Some("pager.*".to_string()),
            ..Default::default()
        };
        let query = alert_query(&filter);
        let filters: Vec<&str> = query
            .iter()
            .filter(|(k, _)| *k == "filter")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(filters, vec!["severity=~\"critical|warning\"", "team=\"infra\""]);
        assert!(query.contains(&("receiver", "pager.*".to_string())));
    }

    #[test]
    fn test_status_response_conversion() {
        let response: StatusResponse = serde_json::from_value(serde_json::json!({
            "cluster": {"name": "01H", "status": "ready", "peers": [{"name": "a"}, {"name": "b"}]},
            "config": {"original": "route: {}"},
            "uptime": "2024-05-01T08:00:00.000Z",
            "versionInfo": {"version": "0.27.0", "branch": "HEAD", "revision": "abc"}
        }))
        .unwrap();
        let status = MonitorStatus::from(response);
        assert_eq!(status.version, "0.27.0");
        assert_eq!(status.cluster_status, "ready");
        assert_eq!(status.cluster_peers, 2);
    }
}
