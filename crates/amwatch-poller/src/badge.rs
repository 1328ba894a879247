//! Badge state derived from the current alert list.
//!
//! [`compute_badge`] is pure. The degraded indicator is never produced here:
//! only the poll cycle's fetch-failure branch sets it.

use amwatch_core::types::{Alert, BadgeColor, BadgeState, Severity};

/// Map an alert list and the enablement flag to a badge.
///
/// - disabled: empty text, colour unset
/// - text: number of `active` alerts, empty when zero
/// - colour: first match wins among active alerts: critical, warning, then
///   informational; [`BadgeColor::Ok`] when nothing is active
pub fn compute_badge(alerts: &[Alert], enabled: bool) -> BadgeState {
    if !enabled {
        return BadgeState::hidden();
    }

    let active: Vec<&Alert> = alerts.iter().filter(|a| a.is_active()).collect();

    let text = if active.is_empty() {
        String::new()
    } else {
        active.len().to_string()
    };

    let color = match active.iter().map(|a| a.severity()).max() {
        None => BadgeColor::Ok,
        Some(Severity::Critical) => BadgeColor::Critical,
        Some(Severity::Warning) => BadgeColor::Warning,
        Some(Severity::Info | Severity::Other) => BadgeColor::Info,
    };

    BadgeState {
        text,
        color: Some(color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::alert;
    use amwatch_core::types::AlertState;

    #[test]
    fn test_critical_wins_over_warning() {
        let alerts = vec![
            alert("1", "warning", AlertState::Active),
            alert("2", "critical", AlertState::Active),
            alert("3", "info", AlertState::Active),
        ];
        let badge = compute_badge(&alerts, true);
        assert_eq!(badge.text, "3");
        assert_eq!(badge.color, Some(BadgeColor::Critical));
    }

    #[test]
    fn test_warning_only() {
        let alerts = vec![
            alert("1", "warning", AlertState::Active),
            alert("2", "info", AlertState::Active),
        ];
        assert_eq!(
            compute_badge(&alerts, true).color,
            Some(BadgeColor::Warning)
        );
    }

    #[test]
    fn test_lower_severity_is_info() {
        let alerts = vec![alert("1", "page", AlertState::Active)];
        let badge = compute_badge(&alerts, true);
        assert_eq!(badge.text, "1");
        assert_eq!(badge.color, Some(BadgeColor::Info));
    }

    #[test]
    fn test_zero_alerts_is_ok_with_empty_text() {
        let badge = compute_badge(&[], true);
        assert_eq!(badge.text, "");
        assert_eq!(badge.color, Some(BadgeColor::Ok));
        assert!(!badge.is_degraded());
    }

    #[test]
    fn test_suppressed_alerts_do_not_count() {
        let alerts = vec![
            alert("1", "critical", AlertState::Suppressed),
            alert("2", "warning", AlertState::Unprocessed),
        ];
        let badge = compute_badge(&alerts, true);
        assert_eq!(badge.text, "");
        assert_eq!(badge.color, Some(BadgeColor::Ok));
    }

    #[test]
    fn test_disabled_hides_badge_regardless_of_alerts() {
        let alerts = vec![alert("1", "critical", AlertState::Active)];
        let badge = compute_badge(&alerts, false);
        assert_eq!(badge, BadgeState::hidden());
        assert_eq!(badge.text, "");
        assert_eq!(badge.color, None);
    }
}
