//! Report generation

pub mod json;
pub mod markdown;

use crate::dashboard::DashboardStats;
use crate::jurisdiction::JurisdictionProfile;
use crate::listing::Page;
use crate::model::Violation;
use crate::orchestrator::ScanSummary;
use crate::{CoreError, CoreResult, ScanResult};
use serde::Serialize;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl std::str::FromStr for ReportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(CoreError::Config(format!("unknown report format: {}", other))),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Anything the engine can report on
#[derive(Serialize)]
#[serde(untagged)]
pub enum Report<'a> {
    Scan(&'a ScanSummary),
    Rescan(&'a ScanResult),
    Dashboard(&'a DashboardStats),
    Flagged(&'a Page<Violation>),
    Profiles(&'a [JurisdictionProfile]),
}

/// Generate report in specified format
pub fn generate_report(report: &Report<'_>, format: ReportFormat) -> CoreResult<String> {
    match format {
        ReportFormat::Json => json::generate(report),
        ReportFormat::Markdown => Ok(markdown::generate(report)),
    }
}
