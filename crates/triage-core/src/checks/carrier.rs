//! Carrier mismatch detection

use super::{ChallengeCheck, CheckDetails, CheckKind, CheckOutcome};
use crate::context::ScanContext;
use crate::model::Violation;
use crate::Confidence;

/// Flags violations recorded against another operating authority
pub struct CarrierMismatchCheck;

impl CarrierMismatchCheck {
    pub fn new() -> Self {
        Self
    }

    fn inspection_mismatch(&self, violation: &Violation, ctx: &ScanContext) -> Option<CheckOutcome> {
        let registration = ctx.carrier.registration_id.trim();
        if registration.is_empty() {
            return None;
        }

        let recorded = ctx
            .inspection(&violation.inspection_number)?
            .recorded_carrier_id()?;

        if recorded == registration {
            return None;
        }

        Some(CheckOutcome::flag(
            CheckKind::CarrierMismatch,
            Confidence::High,
            format!(
                "Inspection carrier id ({}) does not match carrier registration ({})",
                recorded, registration
            ),
            CheckDetails::CarrierMismatch {
                inspection_carrier_id: recorded,
                carrier_registration_id: registration.to_string(),
            },
        ))
    }

    fn separate_authority_driver(&self, violation: &Violation, ctx: &ScanContext) -> Option<CheckOutcome> {
        let driver = ctx.driver(violation.driver_id?)?;
        if !driver.employment_type.has_separate_authority() {
            return None;
        }

        Some(CheckOutcome::flag(
            CheckKind::CarrierMismatch,
            Confidence::Medium,
            format!(
                "Driver is {} - violation may belong to their own operating authority",
                driver.employment_type
            ),
            CheckDetails::SeparateAuthorityDriver {
                employment_type: driver.employment_type,
                driver_name: driver.full_name(),
            },
        ))
    }
}

impl Default for CarrierMismatchCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeCheck for CarrierMismatchCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::CarrierMismatch
    }

    fn evaluate(&self, violation: &Violation, ctx: &ScanContext) -> CheckOutcome {
        self.inspection_mismatch(violation, ctx)
            .or_else(|| self.separate_authority_driver(violation, ctx))
            .unwrap_or_else(|| CheckOutcome::clear(CheckKind::CarrierMismatch))
    }

    fn name(&self) -> &'static str {
        "Carrier Mismatch Check"
    }

    fn description(&self) -> &'static str {
        "Compares the inspection's recorded carrier id with the carrier and flags leased or owner-operator drivers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Driver, EmploymentType, Inspection};
    use crate::testing::{carrier, ts, ViolationBuilder};
    use serde_json::json;
    use uuid::Uuid;

    fn inspection(report: &str, carrier_id: &str) -> Inspection {
        Inspection {
            report_number: report.to_string(),
            inspection_date: None,
            raw: json!({ "carrier_id_number": carrier_id })
                .as_object()
                .cloned()
                .unwrap(),
        }
    }

    fn driver(employment_type: EmploymentType) -> Driver {
        Driver {
            id: Uuid::new_v4(),
            first_name: "Dana".into(),
            last_name: "Reyes".into(),
            license_number: Some("D1234".into()),
            employment_type,
        }
    }

    #[test]
    fn test_mismatched_inspection_is_high_confidence() {
        let v = ViolationBuilder::new().inspection("INS-1").build();
        let ctx = ScanContext::builder(carrier(), ts("2026-01-01T00:00:00Z"))
            .inspections(vec![inspection("INS-1", "999999")])
            .build();

        let outcome = CarrierMismatchCheck::new().evaluate(&v, &ctx);
        assert!(outcome.flagged_with(Confidence::High));
        assert!(matches!(outcome.details, CheckDetails::CarrierMismatch { .. }));
    }

    #[test]
    fn test_matching_inspection_is_clear() {
        let c = carrier();
        let v = ViolationBuilder::new().inspection("INS-1").build();
        let ctx = ScanContext::builder(c.clone(), ts("2026-01-01T00:00:00Z"))
            .inspections(vec![inspection("INS-1", &c.registration_id)])
            .build();

        assert!(!CarrierMismatchCheck::new().evaluate(&v, &ctx).flagged);
    }

    #[test]
    fn test_owner_operator_driver_is_medium_confidence() {
        let d = driver(EmploymentType::OwnerOperator);
        let v = ViolationBuilder::new().driver(d.id).build();
        let ctx = ScanContext::builder(carrier(), ts("2026-01-01T00:00:00Z"))
            .drivers(vec![d])
            .build();

        let outcome = CarrierMismatchCheck::new().evaluate(&v, &ctx);
        assert!(outcome.flagged_with(Confidence::Medium));
    }

    #[test]
    fn test_company_driver_without_inspection_is_clear() {
        let d = driver(EmploymentType::CompanyDriver);
        let v = ViolationBuilder::new().driver(d.id).build();
        let ctx = ScanContext::builder(carrier(), ts("2026-01-01T00:00:00Z"))
            .drivers(vec![d])
            .build();

        assert!(!CarrierMismatchCheck::new().evaluate(&v, &ctx).flagged);
    }
}
