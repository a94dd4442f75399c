//! Favorable court outcome (passive, user-reported)

use super::{ChallengeCheck, CheckDetails, CheckKind, CheckOutcome};
use crate::context::ScanContext;
use crate::model::{CourtOutcome, Violation};
use crate::Confidence;

pub struct FavorableOutcomeCheck;

impl FavorableOutcomeCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FavorableOutcomeCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeCheck for FavorableOutcomeCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::FavorableOutcome
    }

    fn evaluate(&self, violation: &Violation, _ctx: &ScanContext) -> CheckOutcome {
        let Some(record) = &violation.favorable_outcome else {
            return CheckOutcome::clear(CheckKind::FavorableOutcome);
        };

        let (confidence, reason) = match record.outcome {
            CourtOutcome::Dismissed => (
                Confidence::High,
                "Court dismissed this citation - strong challenge candidate",
            ),
            CourtOutcome::Reduced => (
                Confidence::Medium,
                "Court reduced this citation - may support a challenge",
            ),
            CourtOutcome::Upheld => return CheckOutcome::clear(CheckKind::FavorableOutcome),
        };

        CheckOutcome::flag(
            CheckKind::FavorableOutcome,
            confidence,
            reason.to_string(),
            CheckDetails::FavorableOutcome {
                outcome: record.outcome,
                decided_on: record.decided_on,
                notes: record.notes.clone(),
            },
        )
    }

    fn name(&self) -> &'static str {
        "Favorable Outcome Check"
    }

    fn description(&self) -> &'static str {
        "Reads the user-reported court outcome for the citation"
    }
}
