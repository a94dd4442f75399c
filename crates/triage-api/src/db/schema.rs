//! Database row types and their conversion into engine records

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::warn;
use triage_core::jurisdiction::{JurisdictionProfile, TypeStats};
use triage_core::model::{
    Accident, Carrier, Challenge, ChallengeType, Driver, FavorableOutcome, Inspection, Location,
    RecordableCriteria, Violation,
};
use triage_core::{CoreError, CoreResult, ScanResult};
use uuid::Uuid;

/// Decode a snake_case enum tag stored as TEXT
pub fn from_text<T: DeserializeOwned>(column: &str, value: &str) -> CoreResult<T> {
    serde_json::from_value(Value::String(value.to_string()))
        .map_err(|e| CoreError::InvalidRecord(format!("{} = {:?}: {}", column, value, e)))
}

/// Encode an enum as its snake_case tag
pub fn to_text<T: Serialize>(value: &T) -> CoreResult<String> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        other => Err(CoreError::InvalidRecord(format!("expected a string tag, got {}", other))),
    }
}

/// Convert rows one at a time, logging and skipping the ones that fail
pub fn decode_rows<R, T>(rows: Vec<R>, table: &str) -> Vec<T>
where
    T: TryFrom<R>,
    T::Error: Display,
{
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(table, error = %e, "Skipping undecodable row");
                None
            }
        })
        .collect();
    if decoded.len() < total {
        warn!(table, skipped = total - decoded.len(), total, "Rows skipped while loading");
    }
    decoded
}

fn from_json<T: DeserializeOwned>(column: &str, id: Uuid, value: Value) -> CoreResult<T> {
    serde_json::from_value(value)
        .map_err(|e| CoreError::InvalidRecord(format!("violation {}: {}: {}", id, column, e)))
}

/// A stored scan that no longer matches [`ScanResult`] reads as unscanned,
/// which makes the record stale
fn decode_scan(id: Uuid, scan: Option<Json<Value>>) -> Option<ScanResult> {
    let Json(value) = scan?;
    match serde_json::from_value(value) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(violation = %id, error = %e, "Discarding unreadable scan result");
            None
        }
    }
}

fn count_from_db(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

pub fn count_to_db(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[derive(Debug, FromRow)]
pub struct CarrierRow {
    pub id: Uuid,
    pub name: String,
    pub registration_id: String,
}

impl From<CarrierRow> for Carrier {
    fn from(row: CarrierRow) -> Self {
        Carrier {
            id: row.id,
            name: row.name,
            registration_id: row.registration_id,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct DriverRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub license_number: Option<String>,
    pub employment_type: String,
}

impl TryFrom<DriverRow> for Driver {
    type Error = CoreError;

    fn try_from(row: DriverRow) -> CoreResult<Self> {
        Ok(Driver {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            license_number: row.license_number,
            employment_type: from_text("employment_type", &row.employment_type)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct InspectionRow {
    pub report_number: String,
    pub inspection_date: Option<DateTime<Utc>>,
    pub raw: Json<Map<String, Value>>,
}

impl From<InspectionRow> for Inspection {
    fn from(row: InspectionRow) -> Self {
        Inspection {
            report_number: row.report_number,
            inspection_date: row.inspection_date,
            raw: row.raw.0,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct AccidentRow {
    pub id: Uuid,
    pub driver_id: Option<Uuid>,
    pub accident_date: DateTime<Utc>,
    pub accident_type: Option<String>,
    pub recordable_criteria: Option<Json<RecordableCriteria>>,
    pub preventable: Option<bool>,
}

impl TryFrom<AccidentRow> for Accident {
    type Error = CoreError;

    fn try_from(row: AccidentRow) -> CoreResult<Self> {
        let accident_type = row
            .accident_type
            .as_deref()
            .map(|t| from_text("accident_type", t))
            .transpose()?;
        Ok(Accident {
            id: row.id,
            driver_id: row.driver_id,
            accident_date: row.accident_date,
            accident_type,
            recordable_criteria: row.recordable_criteria.map(|c| c.0),
            preventable: row.preventable,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ViolationRow {
    pub id: Uuid,
    pub carrier_id: Uuid,
    pub inspection_number: String,
    pub violation_date: Option<DateTime<Utc>>,
    pub code: Option<String>,
    pub description: String,
    pub category: String,
    pub severity_weight: i16,
    pub out_of_service: bool,
    pub crash_related: bool,
    pub city: Option<String>,
    pub jurisdiction: Option<String>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub challenge: Json<Value>,
    pub favorable_outcome: Option<Json<Value>>,
    /// Kept loose so results written by older logic still load
    pub scan: Option<Json<Value>>,
}

pub const VIOLATION_COLUMNS: &str = "id, carrier_id, inspection_number, violation_date, code, \
    description, category, severity_weight, out_of_service, crash_related, city, jurisdiction, \
    driver_id, vehicle_id, challenge, favorable_outcome, scan";

impl TryFrom<ViolationRow> for Violation {
    type Error = CoreError;

    fn try_from(row: ViolationRow) -> CoreResult<Self> {
        let severity_weight = u8::try_from(row.severity_weight).map_err(|_| {
            CoreError::InvalidRecord(format!(
                "violation {}: severity weight {} out of range",
                row.id, row.severity_weight
            ))
        })?;
        let category = from_text("category", &row.category)?;
        let challenge: Challenge = from_json("challenge", row.id, row.challenge.0)?;
        let favorable_outcome: Option<FavorableOutcome> = row
            .favorable_outcome
            .map(|f| from_json("favorable_outcome", row.id, f.0))
            .transpose()?;
        let scan = decode_scan(row.id, row.scan);
        Ok(Violation {
            id: row.id,
            carrier_id: row.carrier_id,
            inspection_number: row.inspection_number,
            violation_date: row.violation_date,
            code: row.code,
            description: row.description,
            category,
            severity_weight,
            out_of_service: row.out_of_service,
            crash_related: row.crash_related,
            location: Location {
                city: row.city,
                jurisdiction: row.jurisdiction,
            },
            driver_id: row.driver_id,
            vehicle_id: row.vehicle_id,
            challenge,
            favorable_outcome,
            scan,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub code: String,
    pub name: String,
    pub approval_rate: f64,
    pub by_type: Json<BTreeMap<ChallengeType, TypeStats>>,
    pub average_processing_days: i32,
    pub difficulty: String,
    pub challenge_count: i32,
    pub accepted_count: i32,
    pub denied_count: i32,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRow> for JurisdictionProfile {
    type Error = CoreError;

    fn try_from(row: ProfileRow) -> CoreResult<Self> {
        Ok(JurisdictionProfile {
            difficulty: from_text("difficulty", &row.difficulty)?,
            code: row.code,
            name: row.name,
            approval_rate: row.approval_rate,
            by_type: row.by_type.0,
            average_processing_days: count_from_db(row.average_processing_days),
            challenge_count: count_from_db(row.challenge_count),
            accepted_count: count_from_db(row.accepted_count),
            denied_count: count_from_db(row.denied_count),
            last_updated: row.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::jurisdiction::Difficulty;
    use triage_core::model::{AccidentType, EmploymentType, SafetyCategory};
    use triage_core::{ScanContext, TriageEngine};

    #[test]
    fn test_enum_tags_round_trip_through_text() {
        assert_eq!(to_text(&SafetyCategory::HoursOfService).unwrap(), "hours_of_service");
        let parsed: AccidentType = from_text("accident_type", "weather_related").unwrap();
        assert_eq!(parsed, AccidentType::WeatherRelated);
        let unknown: EmploymentType = from_text("employment_type", "seasonal").unwrap();
        assert_eq!(unknown, EmploymentType::Other);
    }

    #[test]
    fn test_bad_category_is_invalid_record() {
        let err = from_text::<SafetyCategory>("category", "parking").unwrap_err();
        assert!(matches!(err, CoreError::InvalidRecord(_)));
    }

    fn violation_row(category: &str, severity_weight: i16) -> ViolationRow {
        ViolationRow {
            id: Uuid::new_v4(),
            carrier_id: Uuid::new_v4(),
            inspection_number: "TX-1".to_string(),
            violation_date: None,
            code: Some("395.8".to_string()),
            description: "Log violation".to_string(),
            category: category.to_string(),
            severity_weight,
            out_of_service: false,
            crash_related: false,
            city: Some("Austin".to_string()),
            jurisdiction: Some("TX".to_string()),
            driver_id: None,
            vehicle_id: None,
            challenge: Json(serde_json::to_value(Challenge::default()).unwrap()),
            favorable_outcome: None,
            scan: None,
        }
    }

    #[test]
    fn test_violation_row_conversion() {
        let v = Violation::try_from(violation_row("hours_of_service", 7)).unwrap();
        assert_eq!(v.category, SafetyCategory::HoursOfService);
        assert_eq!(v.severity_weight, 7);
        assert_eq!(v.jurisdiction(), Some("TX"));

        assert!(Violation::try_from(violation_row("hours_of_service", 300)).is_err());
        assert!(Violation::try_from(violation_row("parking", 3)).is_err());
    }

    #[test]
    fn test_outdated_scan_reads_as_unscanned() {
        let now = DateTime::parse_from_rfc3339("2026-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut row = violation_row("hours_of_service", 5);
        row.violation_date = Some(now - chrono::Duration::days(60));
        let v = Violation::try_from(row).unwrap();
        let carrier = Carrier {
            id: v.carrier_id,
            name: "Lone Star Freight".to_string(),
            registration_id: "1234567".to_string(),
        };
        let ctx = ScanContext::builder(carrier, now).violations(vec![v.clone()]).build();
        let result = TriageEngine::default().evaluate(&v, &ctx).unwrap();

        let mut current = violation_row("hours_of_service", 5);
        current.scan = Some(Json(serde_json::to_value(&result).unwrap()));
        let loaded = Violation::try_from(current).unwrap();
        assert_eq!(loaded.scan.map(|s| s.priority_score), Some(result.priority_score));

        let mut old = serde_json::to_value(&result).unwrap();
        old["scan_version"] = Value::from(1);
        old.as_object_mut().unwrap().remove("roi");
        let mut outdated = violation_row("hours_of_service", 5);
        outdated.scan = Some(Json(old));
        let loaded = Violation::try_from(outdated).unwrap();
        assert!(loaded.scan.is_none());
    }

    #[test]
    fn test_bad_rows_are_skipped_not_fatal() {
        let mut bad_challenge = violation_row("hours_of_service", 5);
        bad_challenge.challenge = Json(Value::from("pending"));
        let rows = vec![
            violation_row("hours_of_service", 5),
            violation_row("parking", 5),
            violation_row("unsafe_driving", 400),
            bad_challenge,
            violation_row("unsafe_driving", 9),
        ];

        let violations: Vec<Violation> = decode_rows(rows, "violations");
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].category, SafetyCategory::HoursOfService);
        assert_eq!(violations[1].severity_weight, 9);
    }

    #[test]
    fn test_profile_row_conversion() {
        let row = ProfileRow {
            code: "TX".to_string(),
            name: "Texas".to_string(),
            approval_rate: 0.38,
            by_type: Json(BTreeMap::new()),
            average_processing_days: 50,
            difficulty: "moderate".to_string(),
            challenge_count: 2,
            accepted_count: 1,
            denied_count: -1,
            last_updated: None,
        };
        let p = JurisdictionProfile::try_from(row).unwrap();
        assert_eq!(p.difficulty, Difficulty::Moderate);
        assert_eq!(p.accepted_count, 1);
        assert_eq!(p.denied_count, 0);
    }
}
