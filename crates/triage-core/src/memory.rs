//! In-memory store backing the CLI and tests

use crate::jurisdiction::JurisdictionProfile;
use crate::model::{Accident, Carrier, CarrierId, Driver, Inspection, Violation, ViolationId};
use crate::store::{InsertOutcome, ProfileStore, TriageStore};
use crate::{CoreError, CoreResult, ScanResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Everything known about one carrier, as laid out in a fixture file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierData {
    pub carrier: Carrier,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub inspections: Vec<Inspection>,
    #[serde(default)]
    pub accidents: Vec<Accident>,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub carriers: Vec<CarrierData>,
    #[serde(default)]
    pub profiles: Vec<JurisdictionProfile>,
}

impl Fixture {
    pub async fn load(path: &Path) -> CoreResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::Storage(format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save(&self, path: &Path) -> CoreResult<()> {
        let raw = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| CoreError::Storage(format!("{}: {}", path.display(), e)))
    }
}

#[derive(Debug, Clone)]
struct CarrierRecord {
    carrier: Carrier,
    drivers: Vec<Driver>,
    inspections: Vec<Inspection>,
    accidents: Vec<Accident>,
}

#[derive(Default)]
pub struct InMemoryStore {
    carriers: RwLock<HashMap<CarrierId, CarrierRecord>>,
    violations: RwLock<HashMap<ViolationId, Violation>>,
    profiles: RwLock<BTreeMap<String, JurisdictionProfile>>,
    fail_profile_writes: AtomicBool,
    fail_scan_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();
        for data in fixture.carriers {
            store
                .insert_carrier(data.carrier, data.drivers, data.inspections, data.accidents)
                .await;
            store.insert_violations(data.violations).await;
        }
        {
            let mut profiles = store.profiles.write().await;
            for profile in fixture.profiles {
                profiles.insert(profile.code.clone(), profile);
            }
        }
        store
    }

    /// Snapshot of the current contents, scan results and learned profiles included
    pub async fn to_fixture(&self) -> Fixture {
        let carriers = self.carriers.read().await;
        let violations = self.violations.read().await;

        let mut out: Vec<CarrierData> = carriers
            .values()
            .map(|record| {
                let mut owned: Vec<Violation> = violations
                    .values()
                    .filter(|v| v.carrier_id == record.carrier.id)
                    .cloned()
                    .collect();
                owned.sort_by(|a, b| (a.violation_date, a.id).cmp(&(b.violation_date, b.id)));
                CarrierData {
                    carrier: record.carrier.clone(),
                    drivers: record.drivers.clone(),
                    inspections: record.inspections.clone(),
                    accidents: record.accidents.clone(),
                    violations: owned,
                }
            })
            .collect();
        out.sort_by(|a, b| a.carrier.name.cmp(&b.carrier.name));

        Fixture {
            carriers: out,
            profiles: self.profiles.read().await.values().cloned().collect(),
        }
    }

    pub async fn insert_carrier(
        &self,
        carrier: Carrier,
        drivers: Vec<Driver>,
        inspections: Vec<Inspection>,
        accidents: Vec<Accident>,
    ) {
        self.carriers.write().await.insert(
            carrier.id,
            CarrierRecord {
                carrier,
                drivers,
                inspections,
                accidents,
            },
        );
    }

    pub async fn insert_violations(&self, violations: impl IntoIterator<Item = Violation>) {
        let mut map = self.violations.write().await;
        for v in violations {
            map.insert(v.id, v);
        }
    }

    /// Make every profile write fail, for exercising degraded paths
    pub fn fail_profile_writes(&self, fail: bool) {
        self.fail_profile_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_scan_writes(&self, fail: bool) {
        self.fail_scan_writes.store(fail, Ordering::SeqCst);
    }

    async fn record(&self, id: CarrierId) -> CoreResult<CarrierRecord> {
        self.carriers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("carrier {}", id)))
    }

    fn check_profile_writes(&self) -> CoreResult<()> {
        if self.fail_profile_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("profile writes disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TriageStore for InMemoryStore {
    async fn carrier(&self, id: CarrierId) -> CoreResult<Carrier> {
        Ok(self.record(id).await?.carrier)
    }

    async fn drivers(&self, carrier_id: CarrierId) -> CoreResult<Vec<Driver>> {
        Ok(self.record(carrier_id).await?.drivers)
    }

    async fn inspections_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Inspection>> {
        Ok(self
            .record(carrier_id)
            .await?
            .inspections
            .into_iter()
            .filter(|i| i.inspection_date.map_or(true, |d| d >= since))
            .collect())
    }

    async fn accidents_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Accident>> {
        Ok(self
            .record(carrier_id)
            .await?
            .accidents
            .into_iter()
            .filter(|a| a.accident_date >= since)
            .collect())
    }

    async fn violations_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Violation>> {
        let mut out: Vec<Violation> = self
            .violations
            .read()
            .await
            .values()
            .filter(|v| v.carrier_id == carrier_id)
            .filter(|v| v.violation_date.is_some_and(|d| d >= since))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.violation_date, a.id).cmp(&(b.violation_date, b.id)));
        Ok(out)
    }

    async fn violation(&self, id: ViolationId) -> CoreResult<Violation> {
        self.violations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("violation {}", id)))
    }

    async fn write_scan_results(&self, results: &[(ViolationId, ScanResult)]) -> CoreResult<()> {
        if self.fail_scan_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("scan writes disabled".into()));
        }
        let mut map = self.violations.write().await;
        for (id, result) in results {
            if let Some(v) = map.get_mut(id) {
                v.scan = Some(result.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, code: &str) -> CoreResult<Option<JurisdictionProfile>> {
        Ok(self.profiles.read().await.get(code).cloned())
    }

    async fn insert_profile_if_absent(&self, profile: &JurisdictionProfile) -> CoreResult<InsertOutcome> {
        self.check_profile_writes()?;
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.code) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        profiles.insert(profile.code.clone(), profile.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn save_profile(&self, profile: &JurisdictionProfile, expected_count: u32) -> CoreResult<bool> {
        self.check_profile_writes()?;
        let mut profiles = self.profiles.write().await;
        let current = profiles.get(&profile.code).map(|p| p.challenge_count).unwrap_or(0);
        if current != expected_count {
            return Ok(false);
        }
        profiles.insert(profile.code.clone(), profile.clone());
        Ok(true)
    }

    async fn list_profiles(&self) -> CoreResult<Vec<JurisdictionProfile>> {
        Ok(self.profiles.read().await.values().cloned().collect())
    }
}
