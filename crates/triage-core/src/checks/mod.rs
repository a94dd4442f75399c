//! Challenge check evaluators
//!
//! Contains 6 independent checks:
//! - Carrier mismatch
//! - Duplicate citation
//! - Favorable court outcome
//! - Non-reportable crash
//! - Not-at-fault crash eligibility
//! - Time decay

pub mod carrier;
pub mod crash;
pub mod duplicate;
pub mod favorable;
pub mod time_decay;

use crate::context::ScanContext;
use crate::model::{
    AccidentId, AccidentType, CourtOutcome, EmploymentType, RecordableCriteria, Violation,
    ViolationId,
};
use crate::policy::TriagePolicy;
use crate::Confidence;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use carrier::CarrierMismatchCheck;
pub use crash::{NonReportableCrashCheck, NotAtFaultCheck};
pub use duplicate::DuplicateCheck;
pub use favorable::FavorableOutcomeCheck;
pub use time_decay::{TimeDecayCheck, TimeDecayDetails, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    CarrierMismatch,
    Duplicate,
    FavorableOutcome,
    NonReportableCrash,
    NotAtFaultEligible,
    TimeDecay,
}

impl CheckKind {
    pub const ALL: [CheckKind; 6] = [
        CheckKind::CarrierMismatch,
        CheckKind::Duplicate,
        CheckKind::FavorableOutcome,
        CheckKind::NonReportableCrash,
        CheckKind::NotAtFaultEligible,
        CheckKind::TimeDecay,
    ];
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckKind::CarrierMismatch => write!(f, "Carrier Mismatch"),
            CheckKind::Duplicate => write!(f, "Duplicate"),
            CheckKind::FavorableOutcome => write!(f, "Favorable Outcome"),
            CheckKind::NonReportableCrash => write!(f, "Non-Reportable Crash"),
            CheckKind::NotAtFaultEligible => write!(f, "Not-At-Fault Eligible"),
            CheckKind::TimeDecay => write!(f, "Time Decay"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMatch {
    /// Same code, date, city and jurisdiction
    Exact,
    /// Same code and date only
    Probable,
}

/// Per-check payload explaining why a check flagged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckDetails {
    None,
    CarrierMismatch {
        inspection_carrier_id: String,
        carrier_registration_id: String,
    },
    SeparateAuthorityDriver {
        employment_type: EmploymentType,
        driver_name: String,
    },
    Duplicate {
        match_type: DuplicateMatch,
        duplicate_violations: Vec<ViolationId>,
        duplicate_inspections: Vec<String>,
    },
    FavorableOutcome {
        outcome: CourtOutcome,
        decided_on: Option<NaiveDate>,
        notes: Option<String>,
    },
    NonReportableCrash {
        accident_id: AccidentId,
        accident_date: DateTime<Utc>,
        criteria: RecordableCriteria,
    },
    NotAtFault {
        accident_id: AccidentId,
        accident_type: AccidentType,
        accident_date: DateTime<Utc>,
        preventable: Option<bool>,
    },
    TimeDecay(TimeDecayDetails),
}

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    pub flagged: bool,
    pub confidence: Option<Confidence>,
    pub reason: String,
    pub details: CheckDetails,
}

impl CheckOutcome {
    /// Unflagged outcome with no reason
    pub fn clear(kind: CheckKind) -> Self {
        Self {
            kind,
            flagged: false,
            confidence: None,
            reason: String::new(),
            details: CheckDetails::None,
        }
    }

    pub fn flag(kind: CheckKind, confidence: Confidence, reason: String, details: CheckDetails) -> Self {
        Self {
            kind,
            flagged: true,
            confidence: Some(confidence),
            reason,
            details,
        }
    }

    pub fn flagged_with(&self, confidence: Confidence) -> bool {
        self.flagged && self.confidence == Some(confidence)
    }
}

/// Outcomes of all checks for one violation, keyed by check kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckResults {
    outcomes: BTreeMap<CheckKind, CheckOutcome>,
}

impl CheckResults {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = CheckOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().map(|o| (o.kind, o)).collect(),
        }
    }

    pub fn get(&self, kind: CheckKind) -> Option<&CheckOutcome> {
        self.outcomes.get(&kind)
    }

    pub fn is_flagged(&self, kind: CheckKind) -> bool {
        self.get(kind).map(|o| o.flagged).unwrap_or(false)
    }

    pub fn flagged_with(&self, kind: CheckKind, confidence: Confidence) -> bool {
        self.get(kind)
            .map(|o| o.flagged_with(confidence))
            .unwrap_or(false)
    }

    pub fn flagged(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.values().filter(|o| o.flagged)
    }

    pub fn flag_count(&self) -> usize {
        self.flagged().count()
    }

    pub fn high_confidence_count(&self) -> usize {
        self.flagged()
            .filter(|o| o.confidence == Some(Confidence::High))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.values()
    }

    pub fn time_decay(&self) -> Option<&TimeDecayDetails> {
        match &self.get(CheckKind::TimeDecay)?.details {
            CheckDetails::TimeDecay(details) => Some(details),
            _ => None,
        }
    }
}

/// Trait for challenge checks.
///
/// Checks never fail: missing context yields an unflagged outcome.
pub trait ChallengeCheck: Send + Sync {
    fn kind(&self) -> CheckKind;

    fn evaluate(&self, violation: &Violation, ctx: &ScanContext) -> CheckOutcome;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;
}

/// Get all default checks
pub fn default_checks(policy: &TriagePolicy) -> Vec<Box<dyn ChallengeCheck>> {
    vec![
        Box::new(CarrierMismatchCheck::new()),
        Box::new(DuplicateCheck::new(policy.duplicate_window())),
        Box::new(FavorableOutcomeCheck::new()),
        Box::new(NonReportableCrashCheck::new(policy.accident_window())),
        Box::new(NotAtFaultCheck::new(policy.accident_window())),
        Box::new(TimeDecayCheck::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_checks_cover_every_kind() {
        let checks = default_checks(&TriagePolicy::default());
        let kinds: Vec<CheckKind> = checks.iter().map(|c| c.kind()).collect();
        for kind in CheckKind::ALL {
            assert!(kinds.contains(&kind), "missing {}", kind);
        }
    }

    #[test]
    fn test_results_counts() {
        let results = CheckResults::from_outcomes(vec![
            CheckOutcome::flag(
                CheckKind::Duplicate,
                Confidence::High,
                "dup".into(),
                CheckDetails::None,
            ),
            CheckOutcome::flag(
                CheckKind::NotAtFaultEligible,
                Confidence::Low,
                "cpdp".into(),
                CheckDetails::None,
            ),
            CheckOutcome::clear(CheckKind::CarrierMismatch),
        ]);

        assert_eq!(results.flag_count(), 2);
        assert_eq!(results.high_confidence_count(), 1);
        assert!(results.flagged_with(CheckKind::Duplicate, Confidence::High));
        assert!(!results.is_flagged(CheckKind::CarrierMismatch));
        assert!(!results.is_flagged(CheckKind::FavorableOutcome));
    }

    #[test]
    fn test_results_serialize_keyed_by_kind() {
        let results = CheckResults::from_outcomes(vec![CheckOutcome::clear(CheckKind::TimeDecay)]);
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["time_decay"]["flagged"], false);
        assert_eq!(json["time_decay"]["details"]["type"], "none");
    }
}
