//! Background outcome learner
//!
//! Outcome reports are queued on an mpsc channel and applied by a single
//! consumer task, so profile updates are serialized and callers never wait
//! on (or see failures from) the profile store.

use super::JurisdictionProfiles;
use crate::model::ChallengeType;
use crate::store::ProfileStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One completed challenge, as reported by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub jurisdiction: String,
    pub challenge_type: Option<ChallengeType>,
    pub accepted: bool,
    pub reported_at: DateTime<Utc>,
}

/// Cheap, cloneable handle for reporting outcomes
#[derive(Debug, Clone)]
pub struct OutcomeReporter {
    tx: mpsc::Sender<OutcomeEvent>,
}

impl OutcomeReporter {
    /// Queue an outcome. Never fails: a full or closed queue is logged and
    /// the event dropped.
    pub fn record(&self, jurisdiction: &str, challenge_type: Option<ChallengeType>, accepted: bool) {
        self.record_event(OutcomeEvent {
            jurisdiction: jurisdiction.to_string(),
            challenge_type,
            accepted,
            reported_at: Utc::now(),
        });
    }

    pub fn record_event(&self, event: OutcomeEvent) {
        if let Err(e) = self.tx.try_send(event) {
            let event = match &e {
                mpsc::error::TrySendError::Full(ev) | mpsc::error::TrySendError::Closed(ev) => ev,
            };
            warn!(
                jurisdiction = %event.jurisdiction,
                error = %e,
                "Dropped challenge outcome"
            );
        }
    }
}

pub struct OutcomeLearner;

impl OutcomeLearner {
    /// Start the consumer task.
    ///
    /// The task runs until every reporter clone is dropped and resolves to
    /// the number of events it processed.
    pub fn spawn<P>(profiles: JurisdictionProfiles<P>, queue_size: usize) -> (OutcomeReporter, JoinHandle<u64>)
    where
        P: ProfileStore + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<OutcomeEvent>(queue_size.max(1));

        let handle = tokio::spawn(async move {
            info!("Outcome learner started");
            let mut processed = 0u64;

            while let Some(event) = rx.recv().await {
                debug!(
                    jurisdiction = %event.jurisdiction,
                    accepted = event.accepted,
                    "Applying challenge outcome"
                );
                profiles
                    .learn(
                        &event.jurisdiction,
                        event.challenge_type,
                        event.accepted,
                        event.reported_at,
                    )
                    .await;
                processed += 1;
            }

            info!(processed, "Outcome learner stopped");
            processed
        });

        (OutcomeReporter { tx }, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::policy::TriagePolicy;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_learner_applies_events_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let profiles = JurisdictionProfiles::new(store.clone(), &TriagePolicy::default());
        let (reporter, handle) = OutcomeLearner::spawn(profiles.clone(), 16);

        reporter.record("tx", Some(ChallengeType::DataError), true);
        reporter.record("TX", Some(ChallengeType::DataError), false);
        drop(reporter);

        assert_eq!(handle.await.unwrap(), 2);

        let profile = profiles.get_or_seed("TX").await.unwrap().unwrap();
        assert!((profile.approval_rate - 0.5).abs() < 1e-9);
        assert_eq!(profile.accepted_count, 1);
        assert_eq!(profile.denied_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_jurisdiction_does_not_stop_learner() {
        let store = Arc::new(InMemoryStore::new());
        let profiles = JurisdictionProfiles::new(store, &TriagePolicy::default());
        let (reporter, handle) = OutcomeLearner::spawn(profiles.clone(), 4);

        reporter.record("ZZ", None, true);
        reporter.record("ND", None, true);
        drop(reporter);

        assert_eq!(handle.await.unwrap(), 2);
        let profile = profiles.get_or_seed("ND").await.unwrap().unwrap();
        assert_eq!(profile.accepted_count, 1);
    }

    #[tokio::test]
    async fn test_failing_store_is_swallowed() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_profile_writes(true);
        let profiles = JurisdictionProfiles::new(store, &TriagePolicy::default());
        let (reporter, handle) = OutcomeLearner::spawn(profiles, 4);

        reporter.record("OH", None, false);
        drop(reporter);

        assert_eq!(handle.await.unwrap(), 1);
    }
}
