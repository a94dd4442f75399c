//! Jurisdiction profiles: historical dispute approval rates per region
//!
//! Profiles are seeded lazily from a static table and evolve only through
//! outcome feedback, which arrives on the learner task, never the scan path.

pub mod learner;
pub mod seeds;

pub use learner::{OutcomeEvent, OutcomeLearner, OutcomeReporter};

use crate::context::normalize_jurisdiction;
use crate::model::ChallengeType;
use crate::policy::TriagePolicy;
use crate::store::{InsertOutcome, ProfileStore};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bound on the scoring modifier in either direction
pub const MAX_MODIFIER: i32 = 15;

/// Read-modify-write attempts before an outcome is given up on
const MAX_SAVE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

/// Running approval statistics for one challenge type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub approval_rate: f64,
    pub accepted: u32,
    pub denied: u32,
}

impl TypeStats {
    fn completed(&self) -> u32 {
        self.accepted + self.denied
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionProfile {
    pub code: String,
    pub name: String,
    /// Overall historical approval rate in [0, 1]
    pub approval_rate: f64,
    #[serde(default)]
    pub by_type: BTreeMap<ChallengeType, TypeStats>,
    pub average_processing_days: u32,
    pub difficulty: Difficulty,
    pub challenge_count: u32,
    pub accepted_count: u32,
    pub denied_count: u32,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Incremental running average: `(old * n + x) / (n + 1)`
fn running_average(old: f64, n: u32, accepted: bool) -> f64 {
    let x = if accepted { 1.0 } else { 0.0 };
    let n = f64::from(n);
    ((old * n + x) / (n + 1.0)).clamp(0.0, 1.0)
}

impl JurisdictionProfile {
    /// Profile built from the static seed table, if the code is known
    pub fn seeded(code: &str) -> Option<Self> {
        let code = normalize_jurisdiction(code);
        let seed = seeds::find(&code)?;
        Some(Self {
            code,
            name: seed.name.to_string(),
            approval_rate: seed.approval_rate,
            by_type: BTreeMap::new(),
            average_processing_days: seed.average_processing_days,
            difficulty: seed.difficulty,
            challenge_count: 0,
            accepted_count: 0,
            denied_count: 0,
            last_updated: None,
        })
    }

    pub fn completed_count(&self) -> u32 {
        self.accepted_count + self.denied_count
    }

    /// Rate used for scoring: the type-specific rate when one has been learned
    pub fn rate_for(&self, challenge_type: Option<ChallengeType>) -> f64 {
        challenge_type
            .and_then(|t| self.by_type.get(&t))
            .map(|s| s.approval_rate)
            .unwrap_or(self.approval_rate)
    }

    /// Fold one completed challenge into the running rates
    pub fn apply_outcome(
        &mut self,
        challenge_type: Option<ChallengeType>,
        accepted: bool,
        national_average: f64,
        now: DateTime<Utc>,
    ) {
        let prior = self.completed_count();
        self.approval_rate = running_average(self.approval_rate, prior, accepted);

        self.challenge_count += 1;
        if accepted {
            self.accepted_count += 1;
        } else {
            self.denied_count += 1;
        }

        if let Some(challenge_type) = challenge_type {
            let stats = self.by_type.entry(challenge_type).or_insert(TypeStats {
                approval_rate: national_average,
                accepted: 0,
                denied: 0,
            });
            stats.approval_rate = running_average(stats.approval_rate, stats.completed(), accepted);
            if accepted {
                stats.accepted += 1;
            } else {
                stats.denied += 1;
            }
        }

        self.last_updated = Some(now);
    }
}

/// Scoring modifier for an approval rate, bounded to +/-15.
///
/// Non-decreasing in `rate` for any non-negative scale.
pub fn modifier_for_rate(rate: f64, national_average: f64, scale: f64) -> i32 {
    let raw = ((rate - national_average) * scale).round();
    (raw.clamp(-(MAX_MODIFIER as f64), MAX_MODIFIER as f64)) as i32
}

/// Service over a [`ProfileStore`]: lazy seeding, modifiers and learning
pub struct JurisdictionProfiles<P: ProfileStore> {
    store: Arc<P>,
    national_average: f64,
    scale: f64,
}

impl<P: ProfileStore> Clone for JurisdictionProfiles<P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            national_average: self.national_average,
            scale: self.scale,
        }
    }
}

impl<P: ProfileStore> JurisdictionProfiles<P> {
    pub fn new(store: Arc<P>, policy: &TriagePolicy) -> Self {
        Self {
            store,
            national_average: policy.national_average_rate,
            scale: policy.jurisdiction_scale,
        }
    }

    /// Stored profile, seeding it on first access.
    ///
    /// Unknown jurisdictions have no seed and yield `None`. When two callers
    /// race to seed, the loser re-reads the winner's record.
    pub async fn get_or_seed(&self, code: &str) -> CoreResult<Option<JurisdictionProfile>> {
        let code = normalize_jurisdiction(code);
        if code.is_empty() {
            return Ok(None);
        }

        if let Some(profile) = self.store.get_profile(&code).await? {
            return Ok(Some(profile));
        }

        let Some(seed) = JurisdictionProfile::seeded(&code) else {
            debug!(jurisdiction = %code, "No seed for jurisdiction");
            return Ok(None);
        };

        match self.store.insert_profile_if_absent(&seed).await? {
            InsertOutcome::Inserted => {
                debug!(jurisdiction = %code, "Seeded jurisdiction profile");
                Ok(Some(seed))
            }
            InsertOutcome::AlreadyExists => self.store.get_profile(&code).await,
        }
    }

    /// Modifier in [-15, 15]; neutral for unknown jurisdictions
    pub async fn score_modifier(
        &self,
        code: &str,
        challenge_type: Option<ChallengeType>,
    ) -> CoreResult<i32> {
        Ok(self
            .get_or_seed(code)
            .await?
            .map(|p| modifier_for_rate(p.rate_for(challenge_type), self.national_average, self.scale))
            .unwrap_or(0))
    }

    /// Apply one outcome. Failures are logged and dropped.
    pub async fn learn(
        &self,
        code: &str,
        challenge_type: Option<ChallengeType>,
        accepted: bool,
        now: DateTime<Utc>,
    ) {
        if let Err(e) = self.try_learn(code, challenge_type, accepted, now).await {
            warn!(jurisdiction = %code, error = %e, "Failed to learn from challenge outcome");
        }
    }

    async fn try_learn(
        &self,
        code: &str,
        challenge_type: Option<ChallengeType>,
        accepted: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let Some(mut profile) = self.get_or_seed(code).await? else {
                warn!(jurisdiction = %code, "Outcome for unknown jurisdiction dropped");
                return Ok(());
            };

            let expected = profile.challenge_count;
            profile.apply_outcome(challenge_type, accepted, self.national_average, now);
            if self.store.save_profile(&profile, expected).await? {
                debug!(
                    jurisdiction = %profile.code,
                    approval_rate = profile.approval_rate,
                    completed = profile.completed_count(),
                    "Updated jurisdiction profile"
                );
                return Ok(());
            }

            debug!(jurisdiction = %profile.code, attempt, "Profile changed underneath, retrying");
        }

        Err(CoreError::Storage(format!(
            "jurisdiction {}: gave up after {} conflicting writes",
            code, MAX_SAVE_ATTEMPTS
        )))
    }

    pub async fn list_profiles(&self) -> CoreResult<Vec<JurisdictionProfile>> {
        self.store.list_profiles().await
    }
}
