//! Per-instance record of the alert fingerprints seen by the last cycle.
//!
//! The stored set is replaced wholesale, never merged: after a cycle it holds
//! exactly the fingerprints that cycle fetched. Cold start is tracked with an
//! explicit counter so an instance whose last poll returned zero alerts is not
//! mistaken for one that was never polled.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::debug;

use amwatch_core::types::Alert;

/// Fingerprints recorded for one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedFingerprints {
    fingerprints: Vec<String>,
    completed_cycles: u64,
}

impl TrackedFingerprints {
    /// Fingerprints in the order the last fetch returned them.
    pub fn fingerprints(&self) -> &[String] {
        &self.fingerprints
    }

    /// True until a cycle has completed for the instance.
    pub fn is_cold(&self) -> bool {
        self.completed_cycles == 0
    }

    /// Number of cycles that have replaced the set.
    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    /// Set view for membership checks.
    pub fn as_set(&self) -> HashSet<&str> {
        self.fingerprints.iter().map(String::as_str).collect()
    }
}

/// Fingerprint state for every instance.
#[derive(Debug, Default)]
pub struct FingerprintTracker {
    state: Mutex<HashMap<String, TrackedFingerprints>>,
}

impl FingerprintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored state; cold if the instance was never tracked.
    pub fn snapshot(&self, instance_id: &str) -> TrackedFingerprints {
        self.lock().get(instance_id).cloned().unwrap_or_default()
    }

    /// Replace the stored set with `fingerprints` and mark a completed cycle.
    pub fn replace(&self, instance_id: &str, fingerprints: Vec<String>) {
        let mut state = self.lock();
        let entry = state.entry(instance_id.to_string()).or_default();
        entry.fingerprints = fingerprints;
        entry.completed_cycles += 1;
        debug!(
            instance = instance_id,
            count = entry.fingerprints.len(),
            cycles = entry.completed_cycles,
            "Fingerprint set replaced"
        );
    }

    /// Return an instance to cold start.
    pub fn reset(&self, instance_id: &str) {
        if self.lock().remove(instance_id).is_some() {
            debug!(instance = instance_id, "Fingerprint state reset");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TrackedFingerprints>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fingerprints of every alert in the fetch, any state, first occurrence kept.
pub fn current_fingerprints(alerts: &[Alert]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(alerts.len());
    alerts
        .iter()
        .filter(|a| seen.insert(a.fingerprint.as_str()))
        .map(|a| a.fingerprint.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{active, alert};
    use amwatch_core::types::AlertState;

    #[test]
    fn test_untracked_instance_is_cold() {
        let tracker = FingerprintTracker::new();
        let snapshot = tracker.snapshot("prod");
        assert!(snapshot.is_cold());
        assert!(snapshot.fingerprints().is_empty());
    }

    #[test]
    fn test_replace_is_not_a_union() {
        let tracker = FingerprintTracker::new();
        tracker.replace("prod", vec!["a".into(), "b".into()]);
        tracker.replace("prod", vec!["c".into()]);

        let snapshot = tracker.snapshot("prod");
        assert_eq!(snapshot.fingerprints(), &["c".to_string()]);
        assert_eq!(snapshot.completed_cycles(), 2);
        assert!(!snapshot.is_cold());
    }

    #[test]
    fn test_empty_set_after_a_cycle_is_not_cold() {
        let tracker = FingerprintTracker::new();
        tracker.replace("prod", vec![]);
        let snapshot = tracker.snapshot("prod");
        assert!(snapshot.fingerprints().is_empty());
        assert!(!snapshot.is_cold());
    }

    #[test]
    fn test_instances_are_independent_and_reset() {
        let tracker = FingerprintTracker::new();
        tracker.replace("prod", vec!["a".into()]);
        tracker.replace("staging", vec!["b".into()]);

        tracker.reset("prod");
        assert!(tracker.snapshot("prod").is_cold());
        assert_eq!(tracker.snapshot("staging").fingerprints(), &["b".to_string()]);
    }

    #[test]
    fn test_current_fingerprints_keeps_order_and_all_states() {
        let alerts = vec![
            active("fp2", "warning"),
            alert("fp1", "critical", AlertState::Suppressed),
            active("fp2", "warning"),
            alert("fp3", "info", AlertState::Unprocessed),
        ];
        assert_eq!(
            current_fingerprints(&alerts),
            vec!["fp2".to_string(), "fp1".to_string(), "fp3".to_string()]
        );
    }
}
