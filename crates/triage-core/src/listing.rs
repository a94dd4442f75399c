//! Paginated listing of scanned violations

use crate::categorize::Category;
use crate::model::{SafetyCategory, Violation};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    PriorityScore,
    FlagCount,
    ViolationDate,
    Category,
    PercentileChange,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "priority_score" | "priorityScore" => Ok(SortKey::PriorityScore),
            "flag_count" | "flagCount" => Ok(SortKey::FlagCount),
            "violation_date" | "violationDate" => Ok(SortKey::ViolationDate),
            "category" => Ok(SortKey::Category),
            "percentile_change" | "percentileChange" => Ok(SortKey::PercentileChange),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlaggedQuery {
    pub category: Option<Category>,
    pub safety_category: Option<SafetyCategory>,
    pub page: usize,
    pub limit: usize,
    pub sort_by: SortKey,
}

impl Default for FlaggedQuery {
    fn default() -> Self {
        Self {
            category: None,
            safety_category: None,
            page: 1,
            limit: 20,
            sort_by: SortKey::PriorityScore,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

fn compare(a: &Violation, b: &Violation, key: SortKey) -> Ordering {
    let (Some(sa), Some(sb)) = (&a.scan, &b.scan) else {
        return Ordering::Equal;
    };
    let by_priority = sb.priority_score.cmp(&sa.priority_score);
    let primary = match key {
        SortKey::PriorityScore => by_priority,
        SortKey::FlagCount => sb.flag_count.cmp(&sa.flag_count),
        SortKey::ViolationDate => b.violation_date.cmp(&a.violation_date),
        SortKey::Category => sa.category.cmp(&sb.category).then(by_priority),
        SortKey::PercentileChange => sb.roi.percentile_change.cmp(&sa.roi.percentile_change),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Filter, sort and page scanned violations.
///
/// Unscanned violations are never listed. `limit` is clamped to
/// `1..=max_page_size` and `page` is 1-based.
pub fn list_flagged(violations: Vec<Violation>, query: &FlaggedQuery, max_page_size: usize) -> Page<Violation> {
    let limit = query.limit.clamp(1, max_page_size.max(1));
    let page = query.page.max(1);

    let mut matched: Vec<Violation> = violations
        .into_iter()
        .filter(|v| match &v.scan {
            Some(scan) => query.category.map_or(true, |c| scan.category == c),
            None => false,
        })
        .filter(|v| query.safety_category.map_or(true, |c| v.category == c))
        .collect();
    matched.sort_by(|a, b| compare(a, b, query.sort_by));

    let total = matched.len();
    let items = matched
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    Page {
        items,
        page,
        limit,
        total,
        pages: total.div_ceil(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_for, ts, ViolationBuilder};
    use crate::TriageEngine;
    use chrono::Duration;

    fn scanned_set() -> Vec<Violation> {
        let now = ts("2026-06-01T00:00:00Z");
        let mut violations: Vec<Violation> = (0..7)
            .map(|i| {
                ViolationBuilder::new()
                    .date(now - Duration::days(15 + i * 70))
                    .category(if i < 3 {
                        SafetyCategory::HoursOfService
                    } else {
                        SafetyCategory::VehicleMaintenance
                    })
                    .build()
            })
            .collect();
        let ctx = context_for(now, violations.clone());
        let engine = TriageEngine::default();
        for v in violations.iter_mut() {
            v.scan = Some(engine.evaluate(v, &ctx).unwrap());
        }
        violations.push(ViolationBuilder::new().date(now).build());
        violations
    }

    #[test]
    fn test_pagination() {
        let query = FlaggedQuery {
            limit: 3,
            page: 3,
            ..Default::default()
        };
        let page = list_flagged(scanned_set(), &query, 100);
        assert_eq!(page.total, 7);
        assert_eq!(page.pages, 3);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_sorted_by_priority_desc() {
        let page = list_flagged(scanned_set(), &FlaggedQuery::default(), 100);
        let scores: Vec<u8> = page
            .items
            .iter()
            .filter_map(|v| v.scan.as_ref().map(|s| s.priority_score))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_filters_by_safety_category_and_clamps_limit() {
        let query = FlaggedQuery {
            safety_category: Some(SafetyCategory::HoursOfService),
            limit: 500,
            ..Default::default()
        };
        let page = list_flagged(scanned_set(), &query, 50);
        assert_eq!(page.total, 3);
        assert_eq!(page.limit, 50);
    }

    #[test]
    fn test_sort_key_parses_both_spellings() {
        assert_eq!("flagCount".parse::<SortKey>().unwrap(), SortKey::FlagCount);
        assert_eq!("violation_date".parse::<SortKey>().unwrap(), SortKey::ViolationDate);
        assert!("severity".parse::<SortKey>().is_err());
    }
}
