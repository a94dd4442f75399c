//! Postgres-backed storage for the triage engine

use super::schema::{
    count_to_db, decode_rows, to_text, AccidentRow, CarrierRow, DriverRow, InspectionRow, ProfileRow,
    ViolationRow, VIOLATION_COLUMNS,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use triage_core::jurisdiction::JurisdictionProfile;
use triage_core::model::{Accident, Carrier, CarrierId, Driver, Inspection, Violation, ViolationId};
use triage_core::store::{InsertOutcome, ProfileStore, TriageStore};
use triage_core::{CoreError, CoreResult, ScanResult};
use tracing::debug;

fn storage(e: sqlx::Error) -> CoreError {
    CoreError::Storage(e.to_string())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TriageStore for PgStore {
    async fn carrier(&self, id: CarrierId) -> CoreResult<Carrier> {
        let row = sqlx::query_as::<_, CarrierRow>(
            "SELECT id, name, registration_id FROM carriers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| CoreError::NotFound(format!("carrier {}", id)))?;

        Ok(row.into())
    }

    async fn drivers(&self, carrier_id: CarrierId) -> CoreResult<Vec<Driver>> {
        let rows = sqlx::query_as::<_, DriverRow>(
            "SELECT id, first_name, last_name, license_number, employment_type \
             FROM drivers WHERE carrier_id = $1",
        )
        .bind(carrier_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(decode_rows(rows, "drivers"))
    }

    async fn inspections_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Inspection>> {
        let rows = sqlx::query_as::<_, InspectionRow>(
            "SELECT report_number, inspection_date, raw FROM inspections \
             WHERE carrier_id = $1 AND (inspection_date IS NULL OR inspection_date >= $2)",
        )
        .bind(carrier_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.into_iter().map(Inspection::from).collect())
    }

    async fn accidents_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Accident>> {
        let rows = sqlx::query_as::<_, AccidentRow>(
            "SELECT id, driver_id, accident_date, accident_type, recordable_criteria, preventable \
             FROM accidents WHERE carrier_id = $1 AND accident_date >= $2",
        )
        .bind(carrier_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(decode_rows(rows, "accidents"))
    }

    async fn violations_since(
        &self,
        carrier_id: CarrierId,
        since: DateTime<Utc>,
    ) -> CoreResult<Vec<Violation>> {
        let sql = format!(
            "SELECT {} FROM violations WHERE carrier_id = $1 AND violation_date >= $2 \
             ORDER BY violation_date, id",
            VIOLATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, ViolationRow>(&sql)
            .bind(carrier_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        Ok(decode_rows(rows, "violations"))
    }

    async fn violation(&self, id: ViolationId) -> CoreResult<Violation> {
        let sql = format!("SELECT {} FROM violations WHERE id = $1", VIOLATION_COLUMNS);
        let row = sqlx::query_as::<_, ViolationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| CoreError::NotFound(format!("violation {}", id)))?;

        Violation::try_from(row)
    }

    async fn write_scan_results(&self, results: &[(ViolationId, ScanResult)]) -> CoreResult<()> {
        if results.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(results.len());
        let mut scans = Vec::with_capacity(results.len());
        for (id, result) in results {
            ids.push(*id);
            scans.push(serde_json::to_value(result)?);
        }

        let updated = sqlx::query(
            "UPDATE violations AS v SET scan = u.scan \
             FROM UNNEST($1::uuid[], $2::jsonb[]) AS u(id, scan) \
             WHERE v.id = u.id",
        )
        .bind(&ids)
        .bind(&scans)
        .execute(&self.pool)
        .await
        .map_err(storage)?
        .rows_affected();

        debug!(requested = results.len(), updated, "Wrote scan results");
        Ok(())
    }
}

const PROFILE_COLUMNS: &str = "code, name, approval_rate, by_type, average_processing_days, \
    difficulty, challenge_count, accepted_count, denied_count, last_updated";

/// Compare-and-swap keyed on the challenge count the writer read
const SAVE_PROFILE_SQL: &str = "UPDATE jurisdiction_profiles SET \
    name = $2, \
    approval_rate = $3, \
    by_type = $4, \
    average_processing_days = $5, \
    difficulty = $6, \
    challenge_count = $7, \
    accepted_count = $8, \
    denied_count = $9, \
    last_updated = $10 \
    WHERE code = $1 AND challenge_count = $11";

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, code: &str) -> CoreResult<Option<JurisdictionProfile>> {
        let sql = format!("SELECT {} FROM jurisdiction_profiles WHERE code = $1", PROFILE_COLUMNS);
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .map(JurisdictionProfile::try_from)
            .transpose()
    }

    async fn insert_profile_if_absent(&self, profile: &JurisdictionProfile) -> CoreResult<InsertOutcome> {
        let sql = format!(
            "INSERT INTO jurisdiction_profiles ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (code) DO NOTHING",
            PROFILE_COLUMNS
        );
        let inserted = bind_profile(sqlx::query(&sql), profile)?
            .execute(&self.pool)
            .await
            .map_err(storage)?
            .rows_affected();

        Ok(if inserted == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        })
    }

    async fn save_profile(&self, profile: &JurisdictionProfile, expected_count: u32) -> CoreResult<bool> {
        // $1 is the key; the rest follow PROFILE_COLUMNS order
        let updated = bind_profile(sqlx::query(SAVE_PROFILE_SQL), profile)?
            .bind(count_to_db(expected_count))
            .execute(&self.pool)
            .await
            .map_err(storage)?
            .rows_affected();

        if updated == 0 {
            debug!(jurisdiction = %profile.code, expected_count, "Profile write lost a race");
        }
        Ok(updated == 1)
    }

    async fn list_profiles(&self) -> CoreResult<Vec<JurisdictionProfile>> {
        let sql = format!("SELECT {} FROM jurisdiction_profiles ORDER BY code", PROFILE_COLUMNS);
        sqlx::query_as::<_, ProfileRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?
            .into_iter()
            .map(JurisdictionProfile::try_from)
            .collect()
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

fn bind_profile<'q>(query: PgQuery<'q>, profile: &'q JurisdictionProfile) -> CoreResult<PgQuery<'q>> {
    Ok(query
        .bind(&profile.code)
        .bind(&profile.name)
        .bind(profile.approval_rate)
        .bind(Json(&profile.by_type))
        .bind(count_to_db(profile.average_processing_days))
        .bind(to_text(&profile.difficulty)?)
        .bind(count_to_db(profile.challenge_count))
        .bind(count_to_db(profile.accepted_count))
        .bind(count_to_db(profile.denied_count))
        .bind(profile.last_updated))
}
