//! Violation Challenge Triage Engine
//!
//! This crate scores regulatory violations for dispute-worthiness. Each
//! violation runs through six independent checks, a counterfactual impact
//! estimate and a jurisdiction prior, and ends up with a bounded priority
//! score, a category and a recommendation.

pub mod categorize;
pub mod checks;
pub mod codes;
pub mod context;
pub mod dashboard;
pub mod impact;
pub mod jurisdiction;
pub mod listing;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod report;
pub mod scoring;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use categorize::{Category, Recommendation, RecommendedAction};
pub use checks::{ChallengeCheck, CheckDetails, CheckKind, CheckOutcome, CheckResults};
pub use context::ScanContext;
pub use impact::RemovalImpact;
pub use jurisdiction::{JurisdictionProfile, JurisdictionProfiles, OutcomeLearner, OutcomeReporter};
pub use model::{Violation, ViolationId};
pub use orchestrator::{ScanOptions, ScanOrchestrator, ScanSummary};
pub use policy::TriagePolicy;
pub use scoring::TriageBreakdown;
pub use store::{ProfileStore, TriageStore};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task error: {0}")]
    Task(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Confidence attached to a flagged check.
///
/// Ordered so that `High > Medium > Low`, which the override floors and
/// flag-density bonus rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// ROI estimate derived from the removal impact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiEstimate {
    pub points_removed: u32,
    pub percentile_change: u8,
    pub estimated_annual_savings: u64,
    pub crosses_threshold: bool,
    pub threshold_crossed: Option<u8>,
}

impl RoiEstimate {
    pub fn from_impact(impact: Option<&RemovalImpact>, policy: &TriagePolicy) -> Self {
        match impact {
            Some(impact) => Self {
                points_removed: impact.points_removed,
                percentile_change: impact.percentile_change,
                estimated_annual_savings: (f64::from(impact.percentile_change)
                    * policy.savings_per_percentile_point)
                    .round() as u64,
                crosses_threshold: impact.crosses_threshold,
                threshold_crossed: impact.threshold_crossed.as_ref().map(|t| t.percentile),
            },
            None => Self::default(),
        }
    }
}

/// Result of one triage pass over a violation.
///
/// Written wholesale by the orchestrator; a newer scan replaces it entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub last_scanned_at: DateTime<Utc>,
    pub scan_version: u32,
    pub category: Category,
    pub priority_score: u8,
    pub flag_count: usize,
    pub checks: CheckResults,
    pub removal_impact: Option<RemovalImpact>,
    pub breakdown: TriageBreakdown,
    pub roi: RoiEstimate,
    pub recommendation: Recommendation,
}

impl ScanResult {
    /// A result is stale when its logic version is behind or the cooldown elapsed.
    pub fn is_stale(&self, policy: &TriagePolicy, as_of: DateTime<Utc>) -> bool {
        self.scan_version < policy.scan_version
            || self.last_scanned_at < as_of - policy.cooldown()
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self.category, Category::EasyWin | Category::WorthChallenging)
    }
}

/// Runs the per-record pipeline: checks, impact, scoring, categorization.
pub struct TriageEngine {
    policy: TriagePolicy,
    checks: Vec<Box<dyn ChallengeCheck>>,
}

impl TriageEngine {
    /// Create an engine with the default check suite
    pub fn new(policy: TriagePolicy) -> Self {
        let checks = checks::default_checks(&policy);
        Self { policy, checks }
    }

    pub fn policy(&self) -> &TriagePolicy {
        &self.policy
    }

    /// Evaluate one violation against a prepared context
    pub fn evaluate(&self, violation: &Violation, ctx: &ScanContext) -> CoreResult<ScanResult> {
        violation.validate()?;

        let checks = CheckResults::from_outcomes(
            self.checks.iter().map(|check| check.evaluate(violation, ctx)),
        );

        let removal_impact = violation
            .violation_date
            .map(|_| impact::estimate_removal(violation, ctx.violations(), ctx.as_of));

        let jurisdiction_modifier = violation
            .jurisdiction()
            .map(|code| ctx.jurisdiction_modifier(code))
            .unwrap_or(0);

        let age_in_months = checks.time_decay().map(|d| d.age_in_months);

        let triage = scoring::score(&scoring::ScoreInput {
            violation,
            checks: &checks,
            impact: removal_impact.as_ref(),
            jurisdiction_modifier,
            age_in_months,
        });

        let (category, recommendation) =
            categorize::categorize(triage.score, age_in_months, &checks);

        let roi = RoiEstimate::from_impact(removal_impact.as_ref(), &self.policy);

        Ok(ScanResult {
            last_scanned_at: ctx.as_of,
            scan_version: self.policy.scan_version,
            category,
            priority_score: triage.score,
            flag_count: checks.flag_count(),
            checks,
            removal_impact,
            breakdown: triage.breakdown,
            roi,
            recommendation,
        })
    }
}

impl Default for TriageEngine {
    fn default() -> Self {
        Self::new(TriagePolicy::default())
    }
}
