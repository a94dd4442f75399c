//! Triage scorer
//!
//! Eight components are summed into a raw score, clamped, then adjusted by
//! override floors and finally by the forced-zero statuses.

use crate::checks::{CheckKind, CheckResults};
use crate::codes;
use crate::impact::RemovalImpact;
use crate::model::{ChallengeStatus, Violation};
use crate::Confidence;
use serde::{Deserialize, Serialize};

/// Per-component contributions, kept for auditability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageBreakdown {
    pub violation_type: i32,
    pub evidence: i32,
    pub time: i32,
    pub jurisdiction: i32,
    pub impact: i32,
    pub error_prone_code: i32,
    pub flag_density: i32,
    pub penalty: i32,
}

impl TriageBreakdown {
    pub fn raw_total(&self) -> i32 {
        self.violation_type
            + self.evidence
            + self.time
            + self.jurisdiction
            + self.impact
            + self.error_prone_code
            + self.flag_density
            + self.penalty
    }
}

pub struct ScoreInput<'a> {
    pub violation: &'a Violation,
    pub checks: &'a CheckResults,
    pub impact: Option<&'a RemovalImpact>,
    pub jurisdiction_modifier: i32,
    pub age_in_months: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageScore {
    pub score: u8,
    pub breakdown: TriageBreakdown,
}

/// Signal weight of the strongest flagged violation-type check
pub fn violation_type_score(checks: &CheckResults) -> i32 {
    [
        (CheckKind::FavorableOutcome, 30),
        (CheckKind::CarrierMismatch, 28),
        (CheckKind::Duplicate, 28),
        (CheckKind::NonReportableCrash, 20),
        (CheckKind::NotAtFaultEligible, 12),
    ]
    .into_iter()
    .filter(|(kind, _)| checks.is_flagged(*kind))
    .map(|(_, points)| points)
    .max()
    .unwrap_or(0)
}

pub fn evidence_score(violation: &Violation) -> i32 {
    let checklist = &violation.challenge.evidence_checklist;
    if checklist.is_empty() {
        return 0;
    }
    let obtained = checklist.iter().filter(|e| e.obtained).count();
    (obtained as f64 / checklist.len() as f64 * 15.0).round() as i32
}

/// Stepped by age bucket; an undated violation earns nothing
pub fn time_score(age_in_months: Option<i64>) -> i32 {
    match age_in_months {
        Some(m) if m < 6 => 15,
        Some(m) if m < 12 => 12,
        Some(m) if m < 18 => 8,
        Some(m) if m < 21 => 4,
        Some(m) if m < 24 => 1,
        _ => 0,
    }
}

pub fn impact_score(impact: Option<&RemovalImpact>) -> i32 {
    let Some(impact) = impact else {
        return 0;
    };
    let points = impact.points_removed as i32 * 2;
    let shift = i32::from(impact.percentile_change) * 3;
    let crossing = if impact.crosses_threshold { 10 } else { 0 };
    (points + shift + crossing).min(25)
}

pub fn flag_density_score(checks: &CheckResults) -> i32 {
    let flagged = checks.flag_count() as i32;
    let high = checks.high_confidence_count() as i32;
    (flagged * 3 + high * 2).min(10)
}

pub fn penalty(status: Option<ChallengeStatus>, age_in_months: Option<i64>) -> i32 {
    let mut penalty = match status {
        Some(s) if s.is_in_flight() => -40,
        Some(ChallengeStatus::Denied) => -25,
        _ => 0,
    };
    if age_in_months.is_some_and(|m| m > 21) {
        penalty = (penalty - 5).max(-40);
    }
    penalty
}

fn floor_for(checks: &CheckResults) -> u8 {
    if checks.flagged_with(CheckKind::FavorableOutcome, Confidence::High) {
        90
    } else if checks.flagged_with(CheckKind::CarrierMismatch, Confidence::High)
        || checks.flagged_with(CheckKind::Duplicate, Confidence::High)
    {
        85
    } else {
        1
    }
}

pub fn score(input: &ScoreInput<'_>) -> TriageScore {
    let status = input.violation.challenge_status();

    let breakdown = TriageBreakdown {
        violation_type: violation_type_score(input.checks),
        evidence: evidence_score(input.violation),
        time: time_score(input.age_in_months),
        jurisdiction: input.jurisdiction_modifier.clamp(-15, 15),
        impact: impact_score(input.impact),
        error_prone_code: codes::error_prone_bonus(input.violation.code.as_deref()),
        flag_density: flag_density_score(input.checks),
        penalty: penalty(status, input.age_in_months),
    };

    // Non-forced scores never reach zero, so zero always means "do not file"
    let clamped = breakdown.raw_total().clamp(1, 100) as u8;
    let score = if status.is_some_and(|s| s.forces_zero()) {
        0
    } else {
        clamped.max(floor_for(input.checks))
    };

    TriageScore { score, breakdown }
}
