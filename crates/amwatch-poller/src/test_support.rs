//! Builders shared by unit tests.

use std::collections::HashMap;

use chrono::Utc;

use amwatch_core::types::{Alert, AlertState, AlertStatus};

pub(crate) fn alert(fp: &str, severity: &str, state: AlertState) -> Alert {
    let mut labels = HashMap::new();
    labels.insert("alertname".to_string(), format!("Alert-{fp}"));
    labels.insert("severity".to_string(), severity.to_string());
    let mut annotations = HashMap::new();
    annotations.insert("summary".to_string(), format!("summary of {fp}"));
    Alert {
        fingerprint: fp.to_string(),
        labels,
        annotations,
        status: AlertStatus {
            state,
            silenced_by: vec![],
            inhibited_by: vec![],
        },
        starts_at: Utc::now(),
        ends_at: None,
        updated_at: None,
        generator_url: None,
    }
}

pub(crate) fn active(fp: &str, severity: &str) -> Alert {
    alert(fp, severity, AlertState::Active)
}
