//! Priority categories and recommendations

use crate::checks::{CheckKind, CheckResults};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    EasyWin,
    WorthChallenging,
    ExpiringSoon,
    Unlikely,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::EasyWin,
        Category::WorthChallenging,
        Category::ExpiringSoon,
        Category::Unlikely,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::EasyWin => "easy_win",
            Category::WorthChallenging => "worth_challenging",
            Category::ExpiringSoon => "expiring_soon",
            Category::Unlikely => "unlikely",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Strong,
    WorthTrying,
    Weak,
    NotRecommended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendedAction,
    pub label: String,
    pub reason: String,
}

impl Recommendation {
    fn new(action: RecommendedAction, label: &str, reason: impl Into<String>) -> Self {
        Self {
            action,
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

/// Violations older than this are aging out of the scoring window
const EXPIRING_AFTER_MONTHS: i64 = 18;

pub fn categorize(score: u8, age_in_months: Option<i64>, checks: &CheckResults) -> (Category, Recommendation) {
    if score >= 80 {
        let signals: Vec<&str> = [
            (CheckKind::FavorableOutcome, "court dismissal on record"),
            (CheckKind::CarrierMismatch, "carrier mismatch detected"),
            (CheckKind::Duplicate, "duplicate violation found"),
        ]
        .into_iter()
        .filter(|(kind, _)| checks.is_flagged(*kind))
        .map(|(_, text)| text)
        .collect();

        let reason = if signals.is_empty() {
            "Multiple strong indicators support challenging this violation".to_string()
        } else {
            format!("High success probability: {}", signals.join(", "))
        };
        (
            Category::EasyWin,
            Recommendation::new(RecommendedAction::Strong, "Strong Challenge", reason),
        )
    } else if score >= 50 {
        (
            Category::WorthChallenging,
            Recommendation::new(
                RecommendedAction::WorthTrying,
                "Worth Trying",
                "Moderate success indicators; gather supporting evidence before submitting",
            ),
        )
    } else if score >= 20 {
        if age_in_months.is_some_and(|m| m > EXPIRING_AFTER_MONTHS) {
            (
                Category::ExpiringSoon,
                Recommendation::new(
                    RecommendedAction::Weak,
                    "Expiring Soon",
                    "Limited challenge basis and violation is aging out of the scoring window",
                ),
            )
        } else {
            (
                Category::Unlikely,
                Recommendation::new(
                    RecommendedAction::Weak,
                    "Weak",
                    "Low success probability; consider only with strong additional evidence",
                ),
            )
        }
    } else {
        (
            Category::Unlikely,
            Recommendation::new(
                RecommendedAction::NotRecommended,
                "Not Recommended",
                "Very low success probability; challenging is unlikely to produce results",
            ),
        )
    }
}
