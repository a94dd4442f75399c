//! Batch scan orchestrator
//!
//! Builds one read-only context per run, selects stale records, evaluates
//! them chunk by chunk on the rayon pool and writes each chunk in a single
//! bulk update.

use crate::context::{distinct_jurisdictions, ScanContext};
use crate::dashboard::{self, DashboardStats};
use crate::jurisdiction::JurisdictionProfiles;
use crate::listing::{self, FlaggedQuery, Page};
use crate::model::{Carrier, CarrierId, Violation, ViolationId};
use crate::policy::TriagePolicy;
use crate::store::{ProfileStore, TriageStore};
use crate::{Category, CoreError, CoreResult, ScanResult, TriageEngine};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Source of the reference time for a run
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Rescan records that are still fresh
    pub force: bool,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub easy_win: usize,
    pub worth_challenging: usize,
    pub expiring_soon: usize,
    pub unlikely: usize,
}

impl CategoryCounts {
    pub fn add(&mut self, category: Category) {
        match category {
            Category::EasyWin => self.easy_win += 1,
            Category::WorthChallenging => self.worth_challenging += 1,
            Category::ExpiringSoon => self.expiring_soon += 1,
            Category::Unlikely => self.unlikely += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub carrier_id: CarrierId,
    pub scanned: usize,
    /// Scanned records with at least one flagged check
    pub flagged: usize,
    /// Records whose evaluation failed; they stay stale for the next run
    pub failed: usize,
    pub skipped_fresh: usize,
    pub category_counts: CategoryCounts,
    pub as_of: DateTime<Utc>,
}

impl ScanSummary {
    fn empty(carrier_id: CarrierId, as_of: DateTime<Utc>) -> Self {
        Self {
            carrier_id,
            scanned: 0,
            flagged: 0,
            failed: 0,
            skipped_fresh: 0,
            category_counts: CategoryCounts::default(),
            as_of,
        }
    }
}

pub struct ScanOrchestrator<S: TriageStore, P: ProfileStore> {
    store: Arc<S>,
    profiles: JurisdictionProfiles<P>,
    engine: Arc<TriageEngine>,
    clock: Clock,
}

impl<S: TriageStore, P: ProfileStore> ScanOrchestrator<S, P> {
    pub fn new(store: Arc<S>, profile_store: Arc<P>, policy: TriagePolicy) -> Self {
        let profiles = JurisdictionProfiles::new(profile_store, &policy);
        Self {
            store,
            profiles,
            engine: Arc::new(TriageEngine::new(policy)),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &TriagePolicy {
        self.engine.policy()
    }

    pub fn profiles(&self) -> &JurisdictionProfiles<P> {
        &self.profiles
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Assemble the run context. Every fetch finishes before any record is
    /// evaluated; an unreadable jurisdiction profile degrades to neutral.
    async fn build_context(
        &self,
        carrier: Carrier,
        as_of: DateTime<Utc>,
        violations: Vec<Violation>,
        jurisdictions: BTreeSet<String>,
    ) -> CoreResult<ScanContext> {
        let since = self.policy().window_start(as_of);
        let drivers = self.store.drivers(carrier.id).await?;
        let inspections = self.store.inspections_since(carrier.id, since).await?;
        let accidents = self.store.accidents_since(carrier.id, since).await?;

        let mut builder = ScanContext::builder(carrier, as_of)
            .drivers(drivers)
            .inspections(inspections)
            .accidents(accidents)
            .violations(violations);

        for code in jurisdictions {
            let modifier = match self.profiles.score_modifier(&code, None).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(jurisdiction = %code, error = %e, "Jurisdiction profile unavailable, using neutral modifier");
                    0
                }
            };
            builder = builder.jurisdiction_modifier(&code, modifier);
        }

        Ok(builder.build())
    }

    /// Scan every stale (or, with `force`, every) violation in the window
    pub async fn scan_carrier(&self, carrier_id: CarrierId, options: ScanOptions) -> CoreResult<ScanSummary> {
        let as_of = self.now();
        let policy = self.policy();
        let carrier = self.store.carrier(carrier_id).await?;
        let since = policy.window_start(as_of);

        let violations = self.store.violations_since(carrier_id, since).await?;
        let candidates: Vec<usize> = violations
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                options.force
                    || v.scan
                        .as_ref()
                        .map_or(true, |s| s.is_stale(policy, as_of))
            })
            .map(|(i, _)| i)
            .collect();

        let mut summary = ScanSummary::empty(carrier_id, as_of);
        summary.skipped_fresh = violations.len() - candidates.len();

        if candidates.is_empty() {
            info!(carrier_id = %carrier_id, fresh = summary.skipped_fresh, "Nothing to scan");
            return Ok(summary);
        }

        info!(
            carrier_id = %carrier_id,
            candidates = candidates.len(),
            window = violations.len(),
            force = options.force,
            "Starting triage scan"
        );

        let jurisdictions = distinct_jurisdictions(&violations);
        let ctx = Arc::new(self.build_context(carrier, as_of, violations, jurisdictions).await?);
        let batch_size = options.batch_size.unwrap_or(policy.batch_size).max(1);

        for (chunk_no, chunk) in candidates.chunks(batch_size).enumerate() {
            let engine = self.engine.clone();
            let chunk_ctx = ctx.clone();
            let indices = chunk.to_vec();

            let outcomes: Vec<(ViolationId, CoreResult<ScanResult>)> = tokio::task::spawn_blocking(move || {
                indices
                    .par_iter()
                    .map(|&i| {
                        let violation = &chunk_ctx.violations()[i];
                        (violation.id, engine.evaluate(violation, &chunk_ctx))
                    })
                    .collect()
            })
            .await
            .map_err(|e| CoreError::Task(e.to_string()))?;

            let mut writes = Vec::with_capacity(outcomes.len());
            for (id, outcome) in outcomes {
                match outcome {
                    Ok(result) => {
                        summary.scanned += 1;
                        if result.flag_count > 0 {
                            summary.flagged += 1;
                        }
                        summary.category_counts.add(result.category);
                        writes.push((id, result));
                    }
                    Err(e) => {
                        summary.failed += 1;
                        warn!(violation_id = %id, error = %e, "Violation evaluation failed, leaving it stale");
                    }
                }
            }

            if !writes.is_empty() {
                self.store.write_scan_results(&writes).await?;
            }
            debug!(chunk = chunk_no, written = writes.len(), "Chunk written");
        }

        info!(
            carrier_id = %carrier_id,
            scanned = summary.scanned,
            flagged = summary.flagged,
            failed = summary.failed,
            "Triage scan complete"
        );

        Ok(summary)
    }

    /// Re-run the pipeline for one violation regardless of staleness
    pub async fn rescan_violation(&self, violation_id: ViolationId) -> CoreResult<ScanResult> {
        let as_of = self.now();
        let violation = self.store.violation(violation_id).await?;
        let carrier = self.store.carrier(violation.carrier_id).await?;
        let since = self.policy().window_start(as_of);
        let window = self.store.violations_since(carrier.id, since).await?;

        let jurisdictions = distinct_jurisdictions(std::iter::once(&violation));
        let ctx = self.build_context(carrier, as_of, window, jurisdictions).await?;

        let result = self.engine.evaluate(&violation, &ctx)?;
        self.store
            .write_scan_results(&[(violation_id, result.clone())])
            .await?;

        info!(
            violation_id = %violation_id,
            score = result.priority_score,
            category = %result.category,
            "Violation rescanned"
        );
        Ok(result)
    }

    pub async fn dashboard(&self, carrier_id: CarrierId) -> CoreResult<DashboardStats> {
        self.store.carrier(carrier_id).await?;
        let since = self.policy().window_start(self.now());
        let violations = self.store.violations_since(carrier_id, since).await?;
        Ok(dashboard::summarize(carrier_id, &violations))
    }

    pub async fn list_flagged(&self, carrier_id: CarrierId, query: &FlaggedQuery) -> CoreResult<Page<Violation>> {
        self.store.carrier(carrier_id).await?;
        let since = self.policy().window_start(self.now());
        let violations = self.store.violations_since(carrier_id, since).await?;
        Ok(listing::list_flagged(violations, query, self.policy().max_page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckKind;
    use crate::memory::InMemoryStore;
    use crate::model::{Accident, AccidentType, ChallengeStatus, RecordableCriteria, SafetyCategory};
    use crate::testing::{carrier, ts, ViolationBuilder};
    use crate::Confidence;
    use chrono::Duration;
    use uuid::Uuid;

    const NOW: &str = "2026-06-01T12:00:00Z";

    fn fixed(at: DateTime<Utc>) -> Clock {
        Arc::new(move || at)
    }

    async fn seeded_store(violations: Vec<Violation>, accidents: Vec<Accident>) -> (Arc<InMemoryStore>, CarrierId) {
        let c = carrier();
        let id = c.id;
        let store = Arc::new(InMemoryStore::new());
        store.insert_carrier(c, vec![], vec![], accidents).await;
        store
            .insert_violations(violations.into_iter().map(|mut v| {
                v.carrier_id = id;
                v
            }))
            .await;
        (store, id)
    }

    fn orchestrator(store: &Arc<InMemoryStore>, at: DateTime<Utc>) -> ScanOrchestrator<InMemoryStore, InMemoryStore> {
        ScanOrchestrator::new(store.clone(), store.clone(), TriagePolicy::default()).with_clock(fixed(at))
    }

    fn sample(now: DateTime<Utc>, n: i64) -> Vec<Violation> {
        (0..n)
            .map(|i| {
                ViolationBuilder::new()
                    .date(now - Duration::days(10 + i * 40))
                    .code("393.9")
                    .jurisdiction(if i % 2 == 0 { "TX" } else { "OK" })
                    .build()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_rescan_before_cooldown_is_noop() {
        let now = ts(NOW);
        let (store, carrier_id) = seeded_store(sample(now, 7), vec![]).await;
        let orch = orchestrator(&store, now);

        let first = orch
            .scan_carrier(carrier_id, ScanOptions { force: false, batch_size: Some(3) })
            .await
            .unwrap();
        assert_eq!(first.scanned, 7);
        assert_eq!(first.failed, 0);

        let before = store.violations_since(carrier_id, now - Duration::days(800)).await.unwrap();

        let later = orchestrator(&store, now + Duration::hours(2));
        let second = later.scan_carrier(carrier_id, ScanOptions::default()).await.unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.skipped_fresh, 7);

        let after = store.violations_since(carrier_id, now - Duration::days(800)).await.unwrap();
        for (b, a) in before.iter().zip(after.iter()) {
            let (sb, sa) = (b.scan.as_ref().unwrap(), a.scan.as_ref().unwrap());
            assert_eq!(sb.last_scanned_at, sa.last_scanned_at);
            assert_eq!(sb.priority_score, sa.priority_score);
        }
    }

    #[tokio::test]
    async fn test_force_and_cooldown_and_version_trigger_rescan() {
        let now = ts(NOW);
        let (store, carrier_id) = seeded_store(sample(now, 4), vec![]).await;
        orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();

        let forced = orchestrator(&store, now + Duration::hours(1))
            .scan_carrier(carrier_id, ScanOptions { force: true, batch_size: None })
            .await
            .unwrap();
        assert_eq!(forced.scanned, 4);

        let after_cooldown = orchestrator(&store, now + Duration::hours(30))
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();
        assert_eq!(after_cooldown.scanned, 4);

        let bumped = TriagePolicy {
            scan_version: TriagePolicy::default().scan_version + 1,
            ..Default::default()
        };
        let summary = ScanOrchestrator::new(store.clone(), store.clone(), bumped)
            .with_clock(fixed(now + Duration::hours(31)))
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.scanned, 4);
    }

    #[tokio::test]
    async fn test_failed_record_stays_stale_and_batch_continues() {
        let now = ts(NOW);
        let mut violations = sample(now, 3);
        violations[1].severity_weight = 0;
        let bad_id = violations[1].id;
        let (store, carrier_id) = seeded_store(violations, vec![]).await;

        let summary = orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.failed, 1);
        assert!(store.violation(bad_id).await.unwrap().scan.is_none());

        let again = orchestrator(&store, now + Duration::hours(1))
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();
        assert_eq!(again.failed, 1);
        assert_eq!(again.skipped_fresh, 2);
    }

    #[tokio::test]
    async fn test_zero_score_exactly_for_forced_statuses() {
        let now = ts(NOW);
        let statuses = [
            None,
            Some(ChallengeStatus::Pending),
            Some(ChallengeStatus::UnderReview),
            Some(ChallengeStatus::Accepted),
            Some(ChallengeStatus::Denied),
            Some(ChallengeStatus::Withdrawn),
        ];
        let mut violations = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            for age_days in [15, 200, 500, 700] {
                let mut b = ViolationBuilder::new()
                    .date(now - Duration::days(age_days + i as i64))
                    .severity(1 + (age_days % 10) as u8);
                if let Some(s) = status {
                    b = b.challenge_status(*s);
                }
                if age_days == 200 {
                    b = b.court_dismissed();
                }
                violations.push(b.build());
            }
        }
        let (store, carrier_id) = seeded_store(violations, vec![]).await;
        orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();

        for v in store.violations_since(carrier_id, now - Duration::days(800)).await.unwrap() {
            let scan = v.scan.as_ref().unwrap();
            let forced = v.challenge_status().is_some_and(|s| s.forces_zero());
            assert!(scan.priority_score <= 100);
            assert_eq!(scan.priority_score == 0, forced, "status {:?}", v.challenge_status());
            if forced {
                assert_eq!(scan.category, Category::Unlikely);
            } else if v.favorable_outcome.is_some() {
                assert!(scan.priority_score >= 90);
            }
        }
    }

    #[tokio::test]
    async fn test_recent_non_reportable_crash_with_error_prone_code() {
        let now = ts(NOW);
        let driver = Uuid::new_v4();
        let date = now - Duration::days(91);
        let violation = ViolationBuilder::new()
            .category(SafetyCategory::CrashIndicator)
            .code("395.8")
            .driver(driver)
            .date(date)
            .build();
        let accident = Accident {
            id: Uuid::new_v4(),
            driver_id: Some(driver),
            accident_date: date + Duration::days(1),
            accident_type: Some(AccidentType::HeadOn),
            recordable_criteria: Some(RecordableCriteria::default()),
            preventable: None,
        };
        let id = violation.id;
        let (store, carrier_id) = seeded_store(vec![violation], vec![accident]).await;

        orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();

        let scan = store.violation(id).await.unwrap().scan.unwrap();
        assert!(scan.checks.flagged_with(CheckKind::NonReportableCrash, Confidence::Medium));
        assert_eq!(
            scan.checks.time_decay().map(|d| d.urgency),
            Some(crate::checks::Urgency::Urgent)
        );
        assert!(scan.priority_score >= 50);
        assert!(matches!(scan.category, Category::EasyWin | Category::WorthChallenging));
    }

    #[tokio::test]
    async fn test_jurisdiction_modifiers_are_resolved_and_seeded() {
        let now = ts(NOW);
        let (store, carrier_id) = seeded_store(sample(now, 2), vec![]).await;
        orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();

        let codes: Vec<String> = store
            .list_profiles()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(codes, vec!["OK".to_string(), "TX".to_string()]);
    }

    #[tokio::test]
    async fn test_profile_store_failure_degrades_to_neutral() {
        let now = ts(NOW);
        let (store, carrier_id) = seeded_store(sample(now, 2), vec![]).await;
        store.fail_profile_writes(true);

        let summary = orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.scanned, 2);
        for v in store.violations_since(carrier_id, now - Duration::days(800)).await.unwrap() {
            assert_eq!(v.scan.unwrap().breakdown.jurisdiction, 0);
        }
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_as_run_error() {
        let now = ts(NOW);
        let (store, carrier_id) = seeded_store(sample(now, 2), vec![]).await;
        store.fail_scan_writes(true);

        let err = orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[tokio::test]
    async fn test_unknown_carrier_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let err = orchestrator(&store, ts(NOW))
            .scan_carrier(Uuid::new_v4(), ScanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rescan_violation_ignores_freshness() {
        let now = ts(NOW);
        let violations = sample(now, 3);
        let target = violations[0].id;
        let (store, carrier_id) = seeded_store(violations, vec![]).await;
        orchestrator(&store, now)
            .scan_carrier(carrier_id, ScanOptions::default())
            .await
            .unwrap();

        let later = now + Duration::minutes(5);
        let result = orchestrator(&store, later).rescan_violation(target).await.unwrap();
        assert_eq!(result.last_scanned_at, later);
        assert_eq!(
            store.violation(target).await.unwrap().scan.unwrap().last_scanned_at,
            later
        );
    }

    #[tokio::test]
    async fn test_dashboard_and_listing_after_scan() {
        let now = ts(NOW);
        let (store, carrier_id) = seeded_store(sample(now, 6), vec![]).await;
        let orch = orchestrator(&store, now);
        orch.scan_carrier(carrier_id, ScanOptions::default()).await.unwrap();

        let stats = orch.dashboard(carrier_id).await.unwrap();
        assert_eq!(stats.total_violations, 6);
        assert_eq!(stats.scanned_count, 6);

        let page = orch
            .list_flagged(carrier_id, &FlaggedQuery { limit: 4, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.total, 6);
        assert_eq!(page.pages, 2);
    }
}
