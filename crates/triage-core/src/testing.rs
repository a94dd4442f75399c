//! Fixture builders shared by unit tests

use crate::context::ScanContext;
use crate::model::{
    Carrier, CarrierId, Challenge, ChallengeStatus, CourtOutcome, DriverId, EvidenceItem,
    FavorableOutcome, Location, SafetyCategory, Violation,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn carrier() -> Carrier {
    Carrier {
        id: Uuid::new_v4(),
        name: "Lone Star Freight".to_string(),
        registration_id: "1234567".to_string(),
    }
}

/// Context holding `violations` for a fresh carrier, with no roster or modifiers
pub fn context_for(as_of: DateTime<Utc>, violations: Vec<Violation>) -> ScanContext {
    ScanContext::builder(carrier(), as_of)
        .violations(violations)
        .build()
}

pub struct ViolationBuilder {
    violation: Violation,
}

impl ViolationBuilder {
    pub fn new() -> Self {
        Self {
            violation: Violation {
                id: Uuid::new_v4(),
                carrier_id: Uuid::new_v4(),
                inspection_number: format!("INS-{}", &Uuid::new_v4().simple().to_string()[..8]),
                violation_date: Some(ts("2026-01-15T10:00:00Z")),
                code: None,
                description: "Test violation".to_string(),
                category: SafetyCategory::VehicleMaintenance,
                severity_weight: 5,
                out_of_service: false,
                crash_related: false,
                location: Location::default(),
                driver_id: None,
                vehicle_id: None,
                challenge: Challenge::default(),
                favorable_outcome: None,
                scan: None,
            },
        }
    }

    pub fn carrier(mut self, id: CarrierId) -> Self {
        self.violation.carrier_id = id;
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.violation.violation_date = Some(date);
        self
    }

    pub fn category(mut self, category: SafetyCategory) -> Self {
        self.violation.category = category;
        self
    }

    pub fn code(mut self, code: &str) -> Self {
        self.violation.code = Some(code.to_string());
        self
    }

    pub fn severity(mut self, weight: u8) -> Self {
        self.violation.severity_weight = weight;
        self
    }

    pub fn challenge_status(mut self, status: ChallengeStatus) -> Self {
        self.violation.challenge.status = Some(status);
        self
    }

    pub fn evidence(mut self, items: Vec<EvidenceItem>) -> Self {
        self.violation.challenge.evidence_checklist = items;
        self
    }

    pub fn court_dismissed(mut self) -> Self {
        self.violation.favorable_outcome = Some(FavorableOutcome {
            outcome: CourtOutcome::Dismissed,
            decided_on: None,
            notes: None,
        });
        self
    }

    pub fn jurisdiction(mut self, code: &str) -> Self {
        self.violation.location.jurisdiction = Some(code.to_string());
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.violation.location.city = Some(city.to_string());
        self
    }

    pub fn inspection(mut self, report_number: &str) -> Self {
        self.violation.inspection_number = report_number.to_string();
        self
    }

    pub fn driver(mut self, id: DriverId) -> Self {
        self.violation.driver_id = Some(id);
        self
    }

    pub fn crash_related(mut self) -> Self {
        self.violation.crash_related = true;
        self
    }

    pub fn out_of_service(mut self) -> Self {
        self.violation.out_of_service = true;
        self
    }

    pub fn build(self) -> Violation {
        self.violation
    }
}
