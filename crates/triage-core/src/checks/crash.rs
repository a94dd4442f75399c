//! Crash-related checks: non-reportable crashes and not-at-fault eligibility
//!
//! Both only apply to crash-related violations with a linked driver, and
//! both look for an accident by the same driver within the match window.

use super::{ChallengeCheck, CheckDetails, CheckKind, CheckOutcome};
use crate::context::ScanContext;
use crate::model::{Accident, Violation};
use crate::Confidence;
use chrono::Duration;

/// Accident record matching a crash-related violation, if any
pub fn matching_accident<'a>(
    violation: &Violation,
    ctx: &'a ScanContext,
    window: Duration,
) -> Option<&'a Accident> {
    if !violation.is_crash_related() {
        return None;
    }
    let driver_id = violation.driver_id?;
    let date = violation.violation_date?;

    ctx.accidents().iter().find(|a| {
        a.driver_id == Some(driver_id) && (a.accident_date - date).abs() <= window
    })
}

pub struct NonReportableCrashCheck {
    window: Duration,
}

impl NonReportableCrashCheck {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl ChallengeCheck for NonReportableCrashCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::NonReportableCrash
    }

    fn evaluate(&self, violation: &Violation, ctx: &ScanContext) -> CheckOutcome {
        let Some(accident) = matching_accident(violation, ctx, self.window) else {
            return CheckOutcome::clear(CheckKind::NonReportableCrash);
        };
        let Some(criteria) = accident.recordable_criteria else {
            return CheckOutcome::clear(CheckKind::NonReportableCrash);
        };
        if criteria.is_recordable() {
            return CheckOutcome::clear(CheckKind::NonReportableCrash);
        }

        CheckOutcome::flag(
            CheckKind::NonReportableCrash,
            Confidence::Medium,
            "Associated crash does not meet recordable criteria (no fatality, no injury, no tow-away)"
                .to_string(),
            CheckDetails::NonReportableCrash {
                accident_id: accident.id,
                accident_date: accident.accident_date,
                criteria,
            },
        )
    }

    fn name(&self) -> &'static str {
        "Non-Reportable Crash Check"
    }

    fn description(&self) -> &'static str {
        "Flags crash violations whose accident meets none of the recordable criteria"
    }
}

pub struct NotAtFaultCheck {
    window: Duration,
}

impl NotAtFaultCheck {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl ChallengeCheck for NotAtFaultCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::NotAtFaultEligible
    }

    fn evaluate(&self, violation: &Violation, ctx: &ScanContext) -> CheckOutcome {
        let Some(accident) = matching_accident(violation, ctx, self.window) else {
            return CheckOutcome::clear(CheckKind::NotAtFaultEligible);
        };
        let Some(accident_type) = accident.accident_type else {
            return CheckOutcome::clear(CheckKind::NotAtFaultEligible);
        };
        if !accident_type.is_not_at_fault_eligible() {
            return CheckOutcome::clear(CheckKind::NotAtFaultEligible);
        }

        CheckOutcome::flag(
            CheckKind::NotAtFaultEligible,
            Confidence::Low,
            format!(
                "Crash type \"{}\" may be eligible for preventability review if the driver was not at fault",
                accident_type
            ),
            CheckDetails::NotAtFault {
                accident_id: accident.id,
                accident_type,
                accident_date: accident.accident_date,
                preventable: accident.preventable,
            },
        )
    }

    fn name(&self) -> &'static str {
        "Not-At-Fault Eligibility Check"
    }

    fn description(&self) -> &'static str {
        "Flags crash violations whose accident type is conventionally not the commercial vehicle's fault"
    }
}
