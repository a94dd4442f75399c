//! Markdown report generation

use super::Report;
use crate::categorize::Category;
use crate::dashboard::DashboardStats;
use crate::jurisdiction::JurisdictionProfile;
use crate::listing::Page;
use crate::model::Violation;
use crate::orchestrator::ScanSummary;
use crate::ScanResult;

pub fn generate(report: &Report<'_>) -> String {
    let mut out = String::new();
    match report {
        Report::Scan(summary) => scan(&mut out, summary),
        Report::Rescan(result) => rescan(&mut out, result),
        Report::Dashboard(stats) => dashboard(&mut out, stats),
        Report::Flagged(page) => flagged(&mut out, page),
        Report::Profiles(profiles) => profiles_table(&mut out, profiles),
    }
    out
}

fn scan(out: &mut String, s: &ScanSummary) {
    out.push_str("# Triage Scan\n\n");
    out.push_str(&format!("- **Carrier:** `{}`\n", s.carrier_id));
    out.push_str(&format!("- **As of:** {}\n", s.as_of.format("%Y-%m-%d %H:%M UTC")));
    out.push_str(&format!("- **Scanned:** {}\n", s.scanned));
    out.push_str(&format!("- **Flagged:** {}\n", s.flagged));
    out.push_str(&format!("- **Failed:** {}\n", s.failed));
    out.push_str(&format!("- **Skipped (fresh):** {}\n\n", s.skipped_fresh));
    out.push_str("| Category | Count |\n");
    out.push_str("|---|---|\n");
    let counts = &s.category_counts;
    for (category, count) in [
        (Category::EasyWin, counts.easy_win),
        (Category::WorthChallenging, counts.worth_challenging),
        (Category::ExpiringSoon, counts.expiring_soon),
        (Category::Unlikely, counts.unlikely),
    ] {
        out.push_str(&format!("| {} | {} |\n", category, count));
    }
}

fn rescan(out: &mut String, r: &ScanResult) {
    out.push_str("# Violation Rescan\n\n");
    out.push_str(&format!(
        "**{}** ({}), score **{}**: {}\n\n",
        r.recommendation.label, r.category, r.priority_score, r.recommendation.reason,
    ));

    out.push_str("## Checks\n\n");
    out.push_str("| Check | Flagged | Confidence | Reason |\n");
    out.push_str("|---|---|---|---|\n");
    for outcome in r.checks.iter() {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            outcome.kind,
            if outcome.flagged { "yes" } else { "no" },
            outcome
                .confidence
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            outcome.reason,
        ));
    }

    let b = &r.breakdown;
    out.push_str("\n## Score Breakdown\n\n");
    for (label, value) in [
        ("Violation type", b.violation_type),
        ("Evidence", b.evidence),
        ("Time", b.time),
        ("Jurisdiction", b.jurisdiction),
        ("Impact", b.impact),
        ("Error-prone code", b.error_prone_code),
        ("Flag density", b.flag_density),
        ("Penalty", b.penalty),
    ] {
        out.push_str(&format!("- {}: {:+}\n", label, value));
    }

    if let Some(impact) = &r.removal_impact {
        out.push_str("\n## Removal Impact\n\n");
        out.push_str(&format!(
            "{}: {} points, percentile {} -> {} (alert {}, critical {})\n",
            impact.category,
            impact.points_removed,
            impact.current_percentile,
            impact.projected_percentile,
            impact.alert_threshold,
            impact.critical_threshold,
        ));
        out.push_str(&format!("\nEstimated annual savings: ${}\n", r.roi.estimated_annual_savings));
    }
}

fn dashboard(out: &mut String, s: &DashboardStats) {
    out.push_str("# Violation Health Check\n\n");
    out.push_str(&format!("- **Violations in window:** {}\n", s.total_violations));
    out.push_str(&format!("- **Scanned:** {}\n", s.scanned_count));
    out.push_str(&format!("- **Actionable:** {}\n", s.total_actionable));
    out.push_str(&format!("- **Estimated savings:** ${}\n", s.total_estimated_savings));
    out.push_str(&format!("- **Points removable:** {}\n", s.total_points_removable));
    match s.last_scan_at {
        Some(at) => {
            out.push_str(&format!("- **Last scan:** {}\n\n", at.format("%Y-%m-%d %H:%M UTC")));
        }
        None => {
            out.push_str("- **Last scan:** never\n\n");
        }
    }

    if !s.category_counts.is_empty() {
        out.push_str("| Category | Count | Avg priority |\n");
        out.push_str("|---|---|---|\n");
        for (category, stat) in &s.category_counts {
            out.push_str(&format!("| {} | {} | {} |\n", category, stat.count, stat.average_priority));
        }
    }

    if !s.top_flagged.is_empty() {
        out.push_str("\n## Top Flagged\n\n");
        for (i, f) in s.top_flagged.iter().enumerate() {
            out.push_str(&format!(
                "{}. `{}` {} ({}) score {} with {} flag(s)\n",
                i + 1,
                f.code.as_deref().unwrap_or("-"),
                f.safety_category,
                f.category,
                f.priority_score,
                f.flag_count,
            ));
        }
    }
}

fn flagged(out: &mut String, page: &Page<Violation>) {
    out.push_str(&format!(
        "# Flagged Violations (page {} of {}, {} total)\n\n",
        page.page,
        page.pages.max(1),
        page.total,
    ));
    out.push_str("| Date | Code | Safety category | Category | Score | Flags | Recommendation |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for v in &page.items {
        let Some(scan) = &v.scan else { continue };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            v.violation_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
            v.code.as_deref().unwrap_or("-"),
            v.category,
            scan.category,
            scan.priority_score,
            scan.flag_count,
            scan.recommendation.label,
        ));
    }
}

fn profiles_table(out: &mut String, profiles: &[JurisdictionProfile]) {
    out.push_str("# Jurisdiction Profiles\n\n");
    out.push_str("| Code | Name | Approval rate | Completed | Avg days |\n");
    out.push_str("|---|---|---|---|---|\n");
    for p in profiles {
        out.push_str(&format!(
            "| {} | {} | {:.1}% | {} | {} |\n",
            p.code,
            p.name,
            p.approval_rate * 100.0,
            p.completed_count(),
            p.average_processing_days,
        ));
    }
}
