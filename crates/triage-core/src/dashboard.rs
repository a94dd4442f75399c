//! Dashboard aggregation over a carrier's scanned violations

use crate::categorize::Category;
use crate::model::{CarrierId, SafetyCategory, Violation, ViolationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size of the top-flagged list
pub const TOP_FLAGGED: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub count: usize,
    pub average_priority: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedSummary {
    pub violation_id: ViolationId,
    pub code: Option<String>,
    pub description: String,
    pub safety_category: SafetyCategory,
    pub violation_date: Option<DateTime<Utc>>,
    pub category: Category,
    pub priority_score: u8,
    pub flag_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub carrier_id: CarrierId,
    pub total_violations: usize,
    pub scanned_count: usize,
    pub category_counts: BTreeMap<Category, CategoryStat>,
    pub easy_win_count: usize,
    pub worth_challenging_count: usize,
    pub total_actionable: usize,
    pub total_estimated_savings: u64,
    pub total_points_removable: u64,
    pub top_flagged: Vec<FlaggedSummary>,
    pub last_scan_at: Option<DateTime<Utc>>,
}

/// Aggregate the violations of one lookback window
pub fn summarize(carrier_id: CarrierId, violations: &[Violation]) -> DashboardStats {
    let scanned: Vec<(&Violation, &crate::ScanResult)> = violations
        .iter()
        .filter_map(|v| v.scan.as_ref().map(|s| (v, s)))
        .collect();

    let mut sums: BTreeMap<Category, (usize, u64)> = BTreeMap::new();
    for (_, scan) in &scanned {
        let entry = sums.entry(scan.category).or_default();
        entry.0 += 1;
        entry.1 += u64::from(scan.priority_score);
    }
    let category_counts: BTreeMap<Category, CategoryStat> = sums
        .into_iter()
        .map(|(category, (count, total))| {
            let average = (total as f64 / count as f64).round() as u8;
            (
                category,
                CategoryStat {
                    count,
                    average_priority: average,
                },
            )
        })
        .collect();

    let count_of = |c: Category| category_counts.get(&c).map(|s| s.count).unwrap_or(0);
    let easy_win_count = count_of(Category::EasyWin);
    let worth_challenging_count = count_of(Category::WorthChallenging);

    let actionable = scanned.iter().filter(|(_, s)| s.is_actionable());
    let total_estimated_savings: u64 = actionable.clone().map(|(_, s)| s.roi.estimated_annual_savings).sum();
    let total_points_removable: u64 = actionable
        .filter(|(_, s)| s.roi.estimated_annual_savings > 0)
        .map(|(_, s)| u64::from(s.roi.points_removed))
        .sum();

    let mut flagged: Vec<&(&Violation, &crate::ScanResult)> =
        scanned.iter().filter(|(_, s)| s.flag_count >= 1).collect();
    flagged.sort_by(|a, b| {
        b.1.priority_score
            .cmp(&a.1.priority_score)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    let top_flagged = flagged
        .into_iter()
        .take(TOP_FLAGGED)
        .map(|(v, s)| FlaggedSummary {
            violation_id: v.id,
            code: v.code.clone(),
            description: v.description.clone(),
            safety_category: v.category,
            violation_date: v.violation_date,
            category: s.category,
            priority_score: s.priority_score,
            flag_count: s.flag_count,
        })
        .collect();

    DashboardStats {
        carrier_id,
        total_violations: violations.len(),
        scanned_count: scanned.len(),
        category_counts,
        easy_win_count,
        worth_challenging_count,
        total_actionable: easy_win_count + worth_challenging_count,
        total_estimated_savings,
        total_points_removable,
        top_flagged,
        last_scan_at: scanned.iter().map(|(_, s)| s.last_scanned_at).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_for, ts, ViolationBuilder};
    use crate::TriageEngine;
    use chrono::Duration;

    #[test]
    fn test_summary_counts_and_top_flagged() {
        let now = ts("2026-06-01T00:00:00Z");
        let mut violations: Vec<Violation> = (0..8)
            .map(|i| {
                ViolationBuilder::new()
                    .date(now - Duration::days(20 + i * 30))
                    .code(if i % 2 == 0 { "395.8" } else { "396.3A1" })
                    .build()
            })
            .collect();
        violations.push(ViolationBuilder::new().date(now - Duration::days(10)).build());

        let ctx = context_for(now, violations.clone());
        let engine = TriageEngine::default();
        for v in violations.iter_mut().take(8) {
            v.scan = Some(engine.evaluate(v, &ctx).unwrap());
        }

        let stats = summarize(ctx.carrier.id, &violations);
        assert_eq!(stats.total_violations, 9);
        assert_eq!(stats.scanned_count, 8);
        assert_eq!(
            stats.category_counts.values().map(|s| s.count).sum::<usize>(),
            8
        );
        assert_eq!(stats.total_actionable, stats.easy_win_count + stats.worth_challenging_count);
        assert!(stats.top_flagged.len() <= TOP_FLAGGED);
        assert!(stats
            .top_flagged
            .windows(2)
            .all(|w| w[0].priority_score >= w[1].priority_score));
        assert_eq!(stats.last_scan_at, Some(now));
    }

    #[test]
    fn test_empty_window() {
        let stats = summarize(uuid::Uuid::new_v4(), &[]);
        assert_eq!(stats.total_violations, 0);
        assert!(stats.top_flagged.is_empty());
        assert_eq!(stats.last_scan_at, None);
    }
}
