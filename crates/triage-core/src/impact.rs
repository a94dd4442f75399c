//! Counterfactual safety-score impact of removing one violation
//!
//! Category score is the sum of severity x time weight over the carrier's
//! violations in that category. Percentile is an estimate from a fixed
//! per-category multiplier, not a peer-group ranking.

use crate::checks::time_decay::age_in_months;
use crate::model::{SafetyCategory, Violation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extra severity weight carried by out-of-service violations
pub const OUT_OF_SERVICE_BONUS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryThresholds {
    pub alert: u8,
    pub critical: u8,
    pub multiplier: f64,
}

pub fn thresholds(category: SafetyCategory) -> CategoryThresholds {
    let (alert, critical, multiplier) = match category {
        SafetyCategory::UnsafeDriving => (65, 80, 2.5),
        SafetyCategory::HoursOfService => (65, 80, 2.0),
        SafetyCategory::VehicleMaintenance => (80, 90, 1.5),
        SafetyCategory::ControlledSubstances => (80, 90, 3.0),
        SafetyCategory::DriverFitness => (80, 90, 2.0),
        SafetyCategory::CrashIndicator => (65, 80, 4.0),
    };
    CategoryThresholds {
        alert,
        critical,
        multiplier,
    }
}

/// Measurement-period weight: 3 within a year, 2 within two, 1 within three
pub fn measurement_weight(age_in_months: i64) -> u32 {
    match age_in_months {
        m if m < 12 => 3,
        m if m < 24 => 2,
        m if m < 36 => 1,
        _ => 0,
    }
}

/// Weighted points a violation contributes to its category score
pub fn violation_points(violation: &Violation, as_of: DateTime<Utc>) -> u32 {
    let Some(date) = violation.violation_date else {
        return 0;
    };
    let severity = u32::from(violation.severity_weight)
        + if violation.out_of_service {
            OUT_OF_SERVICE_BONUS
        } else {
            0
        };
    severity * measurement_weight(age_in_months(date, as_of))
}

pub fn estimate_percentile(category: SafetyCategory, points: u32) -> u8 {
    let estimate = (f64::from(points) * thresholds(category).multiplier).round();
    estimate.min(100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    Alert,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdCrossing {
    pub kind: ThresholdKind,
    pub percentile: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalImpact {
    pub category: SafetyCategory,
    pub points_removed: u32,
    pub current_points: u32,
    pub projected_points: u32,
    pub current_percentile: u8,
    pub projected_percentile: u8,
    pub percentile_change: u8,
    pub crosses_threshold: bool,
    pub threshold_crossed: Option<ThresholdCrossing>,
    pub alert_threshold: u8,
    pub critical_threshold: u8,
}

/// Effect of excluding `violation` from the carrier's violation set.
///
/// The violation counts toward the current score even when it is missing
/// from `violations`.
pub fn estimate_removal(
    violation: &Violation,
    violations: &[Violation],
    as_of: DateTime<Utc>,
) -> RemovalImpact {
    let category = violation.category;
    let limits = thresholds(category);

    let others: u32 = violations
        .iter()
        .filter(|v| v.category == category && v.id != violation.id)
        .map(|v| violation_points(v, as_of))
        .sum();
    let points_removed = violation_points(violation, as_of);
    let current_points = others + points_removed;

    let current_percentile = estimate_percentile(category, current_points);
    let projected_percentile = estimate_percentile(category, others);

    let threshold_crossed = if current_percentile >= limits.alert && projected_percentile < limits.alert {
        Some(ThresholdCrossing {
            kind: ThresholdKind::Alert,
            percentile: limits.alert,
        })
    } else if current_percentile >= limits.critical && projected_percentile < limits.critical {
        Some(ThresholdCrossing {
            kind: ThresholdKind::Critical,
            percentile: limits.critical,
        })
    } else {
        None
    };

    RemovalImpact {
        category,
        points_removed,
        current_points,
        projected_points: others,
        current_percentile,
        projected_percentile,
        percentile_change: current_percentile - projected_percentile,
        crosses_threshold: threshold_crossed.is_some(),
        threshold_crossed,
        alert_threshold: limits.alert,
        critical_threshold: limits.critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ts, ViolationBuilder};
    use chrono::Duration;

    fn hos(as_of: DateTime<Utc>, days_old: i64, severity: u8) -> Violation {
        ViolationBuilder::new()
            .category(SafetyCategory::HoursOfService)
            .date(as_of - Duration::days(days_old))
            .severity(severity)
            .build()
    }

    #[test]
    fn test_points_follow_measurement_weight() {
        let now = ts("2026-06-01T00:00:00Z");
        assert_eq!(violation_points(&hos(now, 30, 5), now), 15);
        assert_eq!(violation_points(&hos(now, 400, 5), now), 10);
        assert_eq!(violation_points(&hos(now, 800, 5), now), 5);
        assert_eq!(violation_points(&hos(now, 1200, 5), now), 0);

        let oos = ViolationBuilder::new()
            .date(now - Duration::days(30))
            .severity(5)
            .out_of_service()
            .build();
        assert_eq!(violation_points(&oos, now), 21);
    }

    #[test]
    fn test_removal_only_counts_same_category() {
        let now = ts("2026-06-01T00:00:00Z");
        let target = hos(now, 30, 4);
        let other = ViolationBuilder::new()
            .category(SafetyCategory::VehicleMaintenance)
            .date(now - Duration::days(30))
            .severity(7)
            .build();

        let impact = estimate_removal(&target, &[target.clone(), other], now);
        assert_eq!(impact.points_removed, 12);
        assert_eq!(impact.current_points, 12);
        assert_eq!(impact.projected_points, 0);
        assert_eq!(impact.current_percentile, 24);
        assert_eq!(impact.percentile_change, 24);
        assert!(!impact.crosses_threshold);
    }

    #[test]
    fn test_target_absent_from_set_still_counts() {
        let now = ts("2026-06-01T00:00:00Z");
        let target = hos(now, 30, 4);
        let impact = estimate_removal(&target, &[], now);
        assert_eq!(impact.current_points, 12);
    }

    #[test]
    fn test_alert_threshold_crossing() {
        let now = ts("2026-06-01T00:00:00Z");
        // 9 points each at a 2.0 multiplier: 4 records => 72, 3 records => 54
        let set: Vec<Violation> = (0..4).map(|_| hos(now, 30, 3)).collect();
        let impact = estimate_removal(&set[0], &set, now);

        assert_eq!(impact.current_percentile, 72);
        assert_eq!(impact.projected_percentile, 54);
        assert!(impact.crosses_threshold);
        assert_eq!(
            impact.threshold_crossed,
            Some(ThresholdCrossing {
                kind: ThresholdKind::Alert,
                percentile: 65
            })
        );
    }

    #[test]
    fn test_percentile_is_capped() {
        assert_eq!(estimate_percentile(SafetyCategory::CrashIndicator, 500), 100);
    }
}
