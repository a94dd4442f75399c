//! Duplicate citation detection
//!
//! Needs the full violation set of the window, which is why the context
//! must be complete before any record is evaluated.

use super::{ChallengeCheck, CheckDetails, CheckKind, CheckOutcome, DuplicateMatch};
use crate::context::ScanContext;
use crate::model::Violation;
use crate::Confidence;
use chrono::Duration;

pub struct DuplicateCheck {
    window: Duration,
}

impl DuplicateCheck {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Symmetric duplicate relation: same code, dates within the window,
    /// different origin reference.
    pub fn is_duplicate_pair(&self, a: &Violation, b: &Violation) -> bool {
        if a.id == b.id {
            return false;
        }
        let (Some(code_a), Some(code_b)) = (normalized_code(a), normalized_code(b)) else {
            return false;
        };
        if code_a != code_b {
            return false;
        }
        if a.inspection_number.trim() == b.inspection_number.trim() {
            return false;
        }
        match (a.violation_date, b.violation_date) {
            (Some(da), Some(db)) => (da - db).abs() <= self.window,
            _ => false,
        }
    }
}

impl Default for DuplicateCheck {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

fn normalized_code(v: &Violation) -> Option<String> {
    v.code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
}

fn same_place(a: &Violation, b: &Violation) -> bool {
    let eq = |x: Option<&str>, y: Option<&str>| match (x, y) {
        (Some(x), Some(y)) => !x.trim().is_empty() && x.trim().eq_ignore_ascii_case(y.trim()),
        _ => false,
    };
    eq(a.location.city.as_deref(), b.location.city.as_deref())
        && eq(a.jurisdiction(), b.jurisdiction())
}

impl ChallengeCheck for DuplicateCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::Duplicate
    }

    fn evaluate(&self, violation: &Violation, ctx: &ScanContext) -> CheckOutcome {
        let candidates: Vec<&Violation> = ctx
            .violations()
            .iter()
            .filter(|other| self.is_duplicate_pair(violation, other))
            .collect();

        if candidates.is_empty() {
            return CheckOutcome::clear(CheckKind::Duplicate);
        }

        let exact: Vec<&Violation> = candidates
            .iter()
            .copied()
            .filter(|other| same_place(violation, other))
            .collect();

        let code = normalized_code(violation).unwrap_or_default();
        let (confidence, match_type, matches, reason) = if exact.is_empty() {
            (
                Confidence::Medium,
                DuplicateMatch::Probable,
                candidates,
                format!(
                    "Probable duplicate: same code ({}) and date on a different inspection",
                    code
                ),
            )
        } else {
            (
                Confidence::High,
                DuplicateMatch::Exact,
                exact,
                format!(
                    "Exact duplicate: same code ({}), date and location on a different inspection",
                    code
                ),
            )
        };

        CheckOutcome::flag(
            CheckKind::Duplicate,
            confidence,
            reason,
            CheckDetails::Duplicate {
                match_type,
                duplicate_violations: matches.iter().map(|v| v.id).collect(),
                duplicate_inspections: matches.iter().map(|v| v.inspection_number.clone()).collect(),
            },
        )
    }

    fn name(&self) -> &'static str {
        "Duplicate Check"
    }

    fn description(&self) -> &'static str {
        "Finds the same code cited on another inspection within the duplicate window"
    }
}
