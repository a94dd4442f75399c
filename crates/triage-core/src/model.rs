//! Violation, carrier, driver, inspection and accident records
//!
//! These are owned by upstream ingestion. The triage engine reads the facts
//! and only ever writes the `scan` sub-structure of a [`Violation`].

use crate::checks::time_decay::age_in_months;
use crate::{CoreError, CoreResult, ScanResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type ViolationId = Uuid;
pub type CarrierId = Uuid;
pub type DriverId = Uuid;
pub type VehicleId = Uuid;
pub type AccidentId = Uuid;

/// Safety-performance category (BASIC) a violation is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCategory {
    UnsafeDriving,
    HoursOfService,
    VehicleMaintenance,
    ControlledSubstances,
    DriverFitness,
    CrashIndicator,
}

impl SafetyCategory {
    pub const ALL: [SafetyCategory; 6] = [
        SafetyCategory::UnsafeDriving,
        SafetyCategory::HoursOfService,
        SafetyCategory::VehicleMaintenance,
        SafetyCategory::ControlledSubstances,
        SafetyCategory::DriverFitness,
        SafetyCategory::CrashIndicator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SafetyCategory::UnsafeDriving => "Unsafe Driving",
            SafetyCategory::HoursOfService => "Hours of Service",
            SafetyCategory::VehicleMaintenance => "Vehicle Maintenance",
            SafetyCategory::ControlledSubstances => "Controlled Substances/Alcohol",
            SafetyCategory::DriverFitness => "Driver Fitness",
            SafetyCategory::CrashIndicator => "Crash Indicator",
        }
    }
}

impl std::fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    /// State or region code, e.g. "TX"
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    UnderReview,
    Accepted,
    Denied,
    Withdrawn,
}

impl ChallengeStatus {
    /// Statuses that pin the triage score to zero
    pub fn forces_zero(&self) -> bool {
        matches!(
            self,
            ChallengeStatus::Pending | ChallengeStatus::UnderReview | ChallengeStatus::Accepted
        )
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, ChallengeStatus::Pending | ChallengeStatus::UnderReview)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    DataError,
    PolicyViolation,
    ProceduralError,
    NotResponsible,
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeType::DataError => write!(f, "data_error"),
            ChallengeType::PolicyViolation => write!(f, "policy_violation"),
            ChallengeType::ProceduralError => write!(f, "procedural_error"),
            ChallengeType::NotResponsible => write!(f, "not_responsible"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub item: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub obtained: bool,
}

/// Review state of a formal dispute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Challenge {
    pub status: Option<ChallengeStatus>,
    pub challenge_type: Option<ChallengeType>,
    pub evidence_checklist: Vec<EvidenceItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtOutcome {
    Dismissed,
    Reduced,
    Upheld,
}

/// User-reported court outcome for the citation behind a violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavorableOutcome {
    pub outcome: CourtOutcome,
    pub decided_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub id: ViolationId,
    pub carrier_id: CarrierId,
    /// Origin reference: the inspection report this violation was cited on
    pub inspection_number: String,
    pub violation_date: Option<DateTime<Utc>>,
    pub code: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: SafetyCategory,
    pub severity_weight: u8,
    #[serde(default)]
    pub out_of_service: bool,
    #[serde(default)]
    pub crash_related: bool,
    #[serde(default)]
    pub location: Location,
    pub driver_id: Option<DriverId>,
    pub vehicle_id: Option<VehicleId>,
    #[serde(default)]
    pub challenge: Challenge,
    pub favorable_outcome: Option<FavorableOutcome>,
    pub scan: Option<ScanResult>,
}

impl Violation {
    pub fn jurisdiction(&self) -> Option<&str> {
        self.location
            .jurisdiction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_crash_related(&self) -> bool {
        self.category == SafetyCategory::CrashIndicator || self.crash_related
    }

    pub fn challenge_status(&self) -> Option<ChallengeStatus> {
        self.challenge.status
    }

    pub fn age_in_months(&self, as_of: DateTime<Utc>) -> Option<i64> {
        self.violation_date.map(|d| age_in_months(d, as_of))
    }

    /// Reject records the scorer cannot interpret at all.
    ///
    /// A missing date or code is not an error; the checks that need them
    /// degrade on their own.
    pub fn validate(&self) -> CoreResult<()> {
        if self.id.is_nil() {
            return Err(CoreError::InvalidRecord("violation id is nil".to_string()));
        }
        if !(1..=10).contains(&self.severity_weight) {
            return Err(CoreError::InvalidRecord(format!(
                "violation {} has severity weight {} outside 1..=10",
                self.id, self.severity_weight
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub name: String,
    /// Operating-authority registration number (e.g. a DOT number)
    pub registration_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    CompanyDriver,
    Leased,
    OwnerOperator,
    #[serde(other)]
    Other,
}

impl EmploymentType {
    /// Drivers who may be operating under their own authority
    pub fn has_separate_authority(&self) -> bool {
        matches!(self, EmploymentType::Leased | EmploymentType::OwnerOperator)
    }
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmploymentType::CompanyDriver => write!(f, "company driver"),
            EmploymentType::Leased => write!(f, "leased"),
            EmploymentType::OwnerOperator => write!(f, "owner-operator"),
            EmploymentType::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub first_name: String,
    pub last_name: String,
    pub license_number: Option<String>,
    pub employment_type: EmploymentType,
}

impl Driver {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Keys under which inspection feeds record the inspected carrier's id
const CARRIER_ID_KEYS: [&str; 3] = ["carrier_id_number", "carrierId", "dot_number"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub report_number: String,
    pub inspection_date: Option<DateTime<Utc>>,
    /// Raw unit-level fields as delivered by the source feed
    #[serde(default)]
    pub raw: Map<String, Value>,
}

impl Inspection {
    /// Carrier id recorded on the inspection, whichever key the feed used
    pub fn recorded_carrier_id(&self) -> Option<String> {
        CARRIER_ID_KEYS.iter().find_map(|key| match self.raw.get(*key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordableCriteria {
    #[serde(default)]
    pub fatality: bool,
    #[serde(default)]
    pub injury: bool,
    #[serde(default)]
    pub tow_away: bool,
}

impl RecordableCriteria {
    pub fn is_recordable(&self) -> bool {
        self.fatality || self.injury || self.tow_away
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccidentType {
    /// Commercial vehicle struck from behind
    RearEnd,
    Animal,
    Pedestrian,
    Cyclist,
    WeatherRelated,
    HeadOn,
    Sideswipe,
    Rollover,
    #[serde(other)]
    Other,
}

impl AccidentType {
    /// Crash types where the commercial vehicle is conventionally not at fault
    pub fn is_not_at_fault_eligible(&self) -> bool {
        matches!(
            self,
            AccidentType::RearEnd
                | AccidentType::Animal
                | AccidentType::Pedestrian
                | AccidentType::Cyclist
                | AccidentType::WeatherRelated
        )
    }
}

impl std::fmt::Display for AccidentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccidentType::RearEnd => "rear_end",
            AccidentType::Animal => "animal",
            AccidentType::Pedestrian => "pedestrian",
            AccidentType::Cyclist => "cyclist",
            AccidentType::WeatherRelated => "weather_related",
            AccidentType::HeadOn => "head_on",
            AccidentType::Sideswipe => "sideswipe",
            AccidentType::Rollover => "rollover",
            AccidentType::Other => "other",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accident {
    pub id: AccidentId,
    pub driver_id: Option<DriverId>,
    pub accident_date: DateTime<Utc>,
    pub accident_type: Option<AccidentType>,
    pub recordable_criteria: Option<RecordableCriteria>,
    pub preventable: Option<bool>,
}
