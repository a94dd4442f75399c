//! Storage seams
//!
//! The engine never owns persistence. The API backs these traits with
//! Postgres; the CLI and tests use [`crate::memory::InMemoryStore`].

use crate::jurisdiction::JurisdictionProfile;
use crate::model::{Accident, Carrier, CarrierId, Driver, Inspection, Violation, ViolationId};
use crate::{CoreResult, ScanResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read access to carrier facts plus the single write the engine performs
#[async_trait]
pub trait TriageStore: Send + Sync {
    /// Fails with `NotFound` for an unknown carrier
    async fn carrier(&self, id: CarrierId) -> CoreResult<Carrier>;

    async fn drivers(&self, carrier_id: CarrierId) -> CoreResult<Vec<Driver>>;

    async fn inspections_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Inspection>>;

    async fn accidents_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Accident>>;

    /// Violations dated on or after `since`
    async fn violations_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Violation>>;

    /// Fails with `NotFound` for an unknown violation
    async fn violation(&self, id: ViolationId) -> CoreResult<Violation>;

    /// Replace the scan result of every listed violation in one operation
    async fn write_scan_results(&self, results: &[(ViolationId, ScanResult)]) -> CoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, code: &str) -> CoreResult<Option<JurisdictionProfile>>;

    /// Atomic create-if-absent keyed by jurisdiction code
    async fn insert_profile_if_absent(&self, profile: &JurisdictionProfile) -> CoreResult<InsertOutcome>;

    /// Replace the stored profile only while its `challenge_count` still
    /// equals `expected_count`. Returns `false` when another writer got there first.
    async fn save_profile(&self, profile: &JurisdictionProfile, expected_count: u32) -> CoreResult<bool>;

    /// All stored profiles ordered by code
    async fn list_profiles(&self) -> CoreResult<Vec<JurisdictionProfile>>;
}
