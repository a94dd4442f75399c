//! Read-only snapshot shared by every record in a scan run

use crate::model::{Accident, Carrier, Driver, DriverId, Inspection, Violation};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// Everything the checks and scorer may look at during one run.
///
/// Built once before any record is evaluated and never mutated afterwards,
/// so records in a chunk can be evaluated in parallel against it.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Reference time for all age arithmetic in this run
    pub as_of: DateTime<Utc>,
    pub carrier: Carrier,
    drivers: HashMap<DriverId, Driver>,
    inspections: HashMap<String, Inspection>,
    accidents: Vec<Accident>,
    violations: Vec<Violation>,
    jurisdiction_modifiers: HashMap<String, i32>,
}

impl ScanContext {
    pub fn builder(carrier: Carrier, as_of: DateTime<Utc>) -> ScanContextBuilder {
        ScanContextBuilder {
            ctx: ScanContext {
                as_of,
                carrier,
                drivers: HashMap::new(),
                inspections: HashMap::new(),
                accidents: Vec::new(),
                violations: Vec::new(),
                jurisdiction_modifiers: HashMap::new(),
            },
        }
    }

    pub fn driver(&self, id: DriverId) -> Option<&Driver> {
        self.drivers.get(&id)
    }

    pub fn inspection(&self, report_number: &str) -> Option<&Inspection> {
        self.inspections.get(report_number.trim())
    }

    pub fn accidents(&self) -> &[Accident] {
        &self.accidents
    }

    /// Full violation set for the lookback window
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Pre-resolved modifier for a jurisdiction; neutral when unknown
    pub fn jurisdiction_modifier(&self, code: &str) -> i32 {
        self.jurisdiction_modifiers
            .get(&normalize_jurisdiction(code))
            .copied()
            .unwrap_or(0)
    }
}

pub struct ScanContextBuilder {
    ctx: ScanContext,
}

impl ScanContextBuilder {
    pub fn drivers(mut self, drivers: impl IntoIterator<Item = Driver>) -> Self {
        self.ctx
            .drivers
            .extend(drivers.into_iter().map(|d| (d.id, d)));
        self
    }

    pub fn inspections(mut self, inspections: impl IntoIterator<Item = Inspection>) -> Self {
        self.ctx.inspections.extend(
            inspections
                .into_iter()
                .map(|i| (i.report_number.trim().to_string(), i)),
        );
        self
    }

    pub fn accidents(mut self, accidents: impl IntoIterator<Item = Accident>) -> Self {
        self.ctx.accidents.extend(accidents);
        self
    }

    pub fn violations(mut self, violations: impl IntoIterator<Item = Violation>) -> Self {
        self.ctx.violations.extend(violations);
        self
    }

    pub fn jurisdiction_modifier(mut self, code: &str, modifier: i32) -> Self {
        self.ctx
            .jurisdiction_modifiers
            .insert(normalize_jurisdiction(code), modifier.clamp(-15, 15));
        self
    }

    pub fn build(self) -> ScanContext {
        self.ctx
    }
}

pub fn normalize_jurisdiction(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Distinct normalized jurisdictions referenced by a set of violations
pub fn distinct_jurisdictions<'a>(violations: impl IntoIterator<Item = &'a Violation>) -> BTreeSet<String> {
    violations
        .into_iter()
        .filter_map(|v| v.jurisdiction())
        .map(normalize_jurisdiction)
        .collect()
}
