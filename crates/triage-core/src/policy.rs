//! Tunable triage policy
//!
//! The windows and scales here are calibration choices rather than
//! correctness requirements, so they live in configuration.

use crate::{CoreError, CoreResult};
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriagePolicy {
    /// Version of the scoring logic stamped on every result
    pub scan_version: u32,
    /// Results younger than this are fresh and skipped unless forced
    pub cooldown_hours: i64,
    /// Violations older than this are outside the scoring window
    pub lookback_months: u32,
    /// Maximum date distance between two duplicate citations
    pub duplicate_window_hours: i64,
    /// Maximum date distance between a crash violation and its accident record
    pub accident_window_days: i64,
    /// National average dispute approval rate used as the jurisdiction baseline
    pub national_average_rate: f64,
    /// Score points per unit of approval-rate difference
    pub jurisdiction_scale: f64,
    /// Estimated annual insurance savings per percentile point
    pub savings_per_percentile_point: f64,
    pub batch_size: usize,
    pub max_page_size: usize,
}

impl Default for TriagePolicy {
    fn default() -> Self {
        Self {
            scan_version: 2,
            cooldown_hours: 24,
            lookback_months: 24,
            duplicate_window_hours: 24,
            accident_window_days: 7,
            national_average_rate: 0.40,
            jurisdiction_scale: 75.0,
            savings_per_percentile_point: 800.0,
            batch_size: 50,
            max_page_size: 100,
        }
    }
}

impl TriagePolicy {
    pub fn cooldown(&self) -> Duration {
        Duration::hours(self.cooldown_hours)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::hours(self.duplicate_window_hours)
    }

    pub fn accident_window(&self) -> Duration {
        Duration::days(self.accident_window_days)
    }

    /// Earliest violation date inside the scoring window
    pub fn window_start(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        as_of
            .checked_sub_months(Months::new(self.lookback_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.scan_version == 0 {
            return Err(CoreError::Config("scan_version must be at least 1".into()));
        }
        if self.cooldown_hours < 0 || self.duplicate_window_hours < 0 || self.accident_window_days < 0 {
            return Err(CoreError::Config("windows must not be negative".into()));
        }
        if self.lookback_months == 0 {
            return Err(CoreError::Config("lookback_months must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.national_average_rate) {
            return Err(CoreError::Config(format!(
                "national_average_rate {} outside [0, 1]",
                self.national_average_rate
            )));
        }
        if self.jurisdiction_scale < 0.0 || self.savings_per_percentile_point < 0.0 {
            return Err(CoreError::Config("scales must not be negative".into()));
        }
        if self.batch_size == 0 || self.max_page_size == 0 {
            return Err(CoreError::Config("batch_size and max_page_size must be positive".into()));
        }
        Ok(())
    }

    /// Overlay `TRIAGE_*` environment variables on the defaults
    pub fn from_env() -> CoreResult<Self> {
        let mut policy = Self::default();

        if let Some(v) = env_parse("TRIAGE_SCAN_VERSION")? {
            policy.scan_version = v;
        }
        if let Some(v) = env_parse("TRIAGE_COOLDOWN_HOURS")? {
            policy.cooldown_hours = v;
        }
        if let Some(v) = env_parse("TRIAGE_LOOKBACK_MONTHS")? {
            policy.lookback_months = v;
        }
        if let Some(v) = env_parse("TRIAGE_DUPLICATE_WINDOW_HOURS")? {
            policy.duplicate_window_hours = v;
        }
        if let Some(v) = env_parse("TRIAGE_ACCIDENT_WINDOW_DAYS")? {
            policy.accident_window_days = v;
        }
        if let Some(v) = env_parse("TRIAGE_NATIONAL_AVERAGE_RATE")? {
            policy.national_average_rate = v;
        }
        if let Some(v) = env_parse("TRIAGE_JURISDICTION_SCALE")? {
            policy.jurisdiction_scale = v;
        }
        if let Some(v) = env_parse("TRIAGE_BATCH_SIZE")? {
            policy.batch_size = v;
        }

        policy.validate()?;
        Ok(policy)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> CoreResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| CoreError::Config(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(TriagePolicy::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        let policy = TriagePolicy {
            national_average_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(policy.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let policy: TriagePolicy = serde_json::from_str(r#"{ "cooldown_hours": 6 }"#).unwrap();
        assert_eq!(policy.cooldown_hours, 6);
        assert_eq!(policy.duplicate_window_hours, 24);
    }

    #[test]
    fn test_window_start_is_lookback_months_back() {
        let as_of = DateTime::parse_from_rfc3339("2026-06-15T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let start = TriagePolicy::default().window_start(as_of);
        assert_eq!(start.to_rfc3339(), "2024-06-15T00:00:00+00:00");
    }
}
