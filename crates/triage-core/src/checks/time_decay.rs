//! Time decay against the fixed aging schedule

use super::{ChallengeCheck, CheckDetails, CheckKind, CheckOutcome};
use crate::context::ScanContext;
use crate::model::Violation;
use crate::Confidence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_MONTH: f64 = 30.44 * 24.0 * 60.0 * 60.0 * 1000.0;

/// Whole months elapsed between `date` and `as_of`; future dates count as zero
pub fn age_in_months(date: DateTime<Utc>, as_of: DateTime<Utc>) -> i64 {
    let ms = (as_of - date).num_milliseconds().max(0) as f64;
    (ms / MS_PER_MONTH).floor() as i64
}

/// Weight multiplier the aging schedule assigns to a violation of this age
pub fn time_weight(age_in_months: i64) -> u32 {
    if age_in_months < 12 {
        3
    } else if age_in_months < 24 {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Still at peak weight
    Urgent,
    Standard,
    /// Window closing
    ExpiringSoon,
    LowPriority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDecayDetails {
    pub age_in_months: i64,
    pub current_time_weight: u32,
    pub months_until_weight_drop: i64,
    pub months_until_expiry: i64,
    pub urgency: Urgency,
}

impl TimeDecayDetails {
    pub fn for_age(age: i64) -> Self {
        let (months_until_weight_drop, months_until_expiry, urgency) = if age < 12 {
            (12 - age, 24 - age, Urgency::Urgent)
        } else if age < 18 {
            (24 - age, 24 - age, Urgency::Standard)
        } else if age < 24 {
            (24 - age, 24 - age, Urgency::ExpiringSoon)
        } else {
            (0, 0, Urgency::LowPriority)
        };

        Self {
            age_in_months: age,
            current_time_weight: time_weight(age),
            months_until_weight_drop,
            months_until_expiry,
            urgency,
        }
    }
}

pub struct TimeDecayCheck;

impl TimeDecayCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeDecayCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeCheck for TimeDecayCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::TimeDecay
    }

    fn evaluate(&self, violation: &Violation, ctx: &ScanContext) -> CheckOutcome {
        let Some(date) = violation.violation_date else {
            return CheckOutcome::clear(CheckKind::TimeDecay);
        };

        let details = TimeDecayDetails::for_age(age_in_months(date, ctx.as_of));
        let reason = format!(
            "Violation is {} months old ({}x weight)",
            details.age_in_months, details.current_time_weight
        );

        match details.urgency {
            Urgency::Urgent | Urgency::ExpiringSoon => CheckOutcome::flag(
                CheckKind::TimeDecay,
                Confidence::Low,
                reason,
                CheckDetails::TimeDecay(details),
            ),
            Urgency::Standard | Urgency::LowPriority => CheckOutcome {
                reason,
                details: CheckDetails::TimeDecay(details),
                ..CheckOutcome::clear(CheckKind::TimeDecay)
            },
        }
    }

    fn name(&self) -> &'static str {
        "Time Decay Check"
    }

    fn description(&self) -> &'static str {
        "Places the violation on the aging schedule and flags urgent or expiring records"
    }
}
