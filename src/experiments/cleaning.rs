//! Row-level cleaning for conversion experiments.
//!
//! Order matters and matches how the counts are reported: nulls first, then
//! the `group × landing_page` logic check, then dedup by `user_id` keeping
//! the first occurrence. Dedup runs on logic-valid rows only, so a user whose
//! first row was invalid keeps their first *valid* row.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::config::AnalysisConfig;
use super::dataset::VisitRecord;

/// A visit that survived every cleaning step.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanVisit {
    pub user_id: String,
    pub timestamp: String,
    pub group: String,
    pub landing_page: String,
    pub converted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidCombination {
    pub group: String,
    pub landing_page: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningReport {
    pub rows_read: u64,
    pub null_rows_dropped: u64,
    pub invalid_rows: u64,
    /// Sorted by count descending, then by group and landing page.
    pub invalid_combinations: Vec<InvalidCombination>,
    pub rows_after_logic: u64,
    pub duplicate_rows: u64,
    pub rows_after_dedup: u64,
}

#[derive(Debug, Clone)]
pub struct CleanedVisits {
    pub visits: Vec<CleanVisit>,
    pub report: CleaningReport,
}

pub fn clean_visits(records: &[VisitRecord], config: &AnalysisConfig) -> CleanedVisits {
    let mut report = CleaningReport {
        rows_read: records.len() as u64,
        ..Default::default()
    };

    // 1. Drop rows with a null in any required field
    let complete: Vec<CleanVisit> = records.iter().filter_map(complete_visit).collect();
    report.null_rows_dropped = report.rows_read - complete.len() as u64;

    // 2. Logic check against the sanctioned pairings
    let pairings = config.pairings();
    let mut invalid: BTreeMap<(String, String), u64> = BTreeMap::new();
    let mut valid = Vec::with_capacity(complete.len());
    for v in complete {
        if pairings.iter().any(|p| p.matches(&v.group, &v.landing_page)) {
            valid.push(v);
        } else {
            *invalid
                .entry((v.group.clone(), v.landing_page.clone()))
                .or_default() += 1;
        }
    }
    report.invalid_rows = invalid.values().sum();
    report.rows_after_logic = valid.len() as u64;

    let mut combos: Vec<InvalidCombination> = invalid
        .into_iter()
        .map(|((group, landing_page), count)| InvalidCombination {
            group,
            landing_page,
            count,
        })
        .collect();
    // BTreeMap order is the tie-break; the sort is stable
    combos.sort_by(|a, b| b.count.cmp(&a.count));
    report.invalid_combinations = combos;

    // 3. Dedup by user_id, keep first
    let mut seen: HashSet<String> = HashSet::with_capacity(valid.len());
    let mut visits = Vec::with_capacity(valid.len());
    for v in valid {
        if seen.insert(v.user_id.clone()) {
            visits.push(v);
        } else {
            report.duplicate_rows += 1;
        }
    }
    report.rows_after_dedup = visits.len() as u64;

    tracing::info!(
        rows_read = report.rows_read,
        null_rows_dropped = report.null_rows_dropped,
        invalid_rows = report.invalid_rows,
        duplicate_rows = report.duplicate_rows,
        rows_after_dedup = report.rows_after_dedup,
        "Visit log cleaned"
    );
    for combo in &report.invalid_combinations {
        tracing::debug!(
            group = %combo.group,
            landing_page = %combo.landing_page,
            count = combo.count,
            "Invalid group/landing_page combination"
        );
    }

    CleanedVisits { visits, report }
}

fn complete_visit(r: &VisitRecord) -> Option<CleanVisit> {
    Some(CleanVisit {
        user_id: r.user_id.clone()?,
        timestamp: r.timestamp.clone()?,
        group: r.group.clone()?,
        landing_page: r.landing_page.clone()?,
        converted: r.converted?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(line: u64, user: &str, group: &str, page: &str, converted: bool) -> VisitRecord {
        VisitRecord {
            line,
            user_id: Some(user.to_string()),
            timestamp: Some("2017-01-10 10:00:00".to_string()),
            group: Some(group.to_string()),
            landing_page: Some(page.to_string()),
            converted: Some(converted),
        }
    }

    #[test]
    fn keeps_only_sanctioned_pairings() {
        let records = vec![
            visit(2, "1", "control", "old_page", false),
            visit(3, "2", "treatment", "new_page", true),
            visit(4, "3", "control", "new_page", false),
            visit(5, "4", "treatment", "old_page", false),
            visit(6, "5", "treatment", "old_page", true),
        ];
        let cleaned = clean_visits(&records, &AnalysisConfig::default());
        assert_eq!(cleaned.visits.len(), 2);
        assert_eq!(cleaned.report.invalid_rows, 3);
        assert_eq!(cleaned.report.rows_after_logic, 2);
        assert_eq!(
            cleaned.report.invalid_combinations,
            vec![
                InvalidCombination {
                    group: "treatment".into(),
                    landing_page: "old_page".into(),
                    count: 2
                },
                InvalidCombination {
                    group: "control".into(),
                    landing_page: "new_page".into(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let records = vec![
            visit(2, "7", "control", "old_page", false),
            visit(3, "7", "control", "old_page", true),
            visit(4, "8", "treatment", "new_page", true),
        ];
        let cleaned = clean_visits(&records, &AnalysisConfig::default());
        assert_eq!(cleaned.report.duplicate_rows, 1);
        assert_eq!(cleaned.report.rows_after_dedup, 2);
        let first = &cleaned.visits[0];
        assert_eq!(first.user_id, "7");
        assert!(!first.converted, "the first row for user 7 must win");
    }

    #[test]
    fn dedup_runs_after_logic_filter() {
        // user 9's first row is invalid, so the later valid row survives
        let records = vec![
            visit(2, "9", "control", "new_page", true),
            visit(3, "9", "control", "old_page", false),
        ];
        let cleaned = clean_visits(&records, &AnalysisConfig::default());
        assert_eq!(cleaned.report.invalid_rows, 1);
        assert_eq!(cleaned.report.duplicate_rows, 0);
        assert_eq!(cleaned.visits.len(), 1);
        assert_eq!(cleaned.visits[0].landing_page, "old_page");
    }

    #[test]
    fn rows_with_nulls_are_dropped_before_logic_check() {
        let mut broken = visit(2, "1", "control", "new_page", false);
        broken.landing_page = None;
        let mut no_outcome = visit(3, "2", "control", "old_page", false);
        no_outcome.converted = None;
        let records = vec![broken, no_outcome, visit(4, "3", "control", "old_page", true)];
        let cleaned = clean_visits(&records, &AnalysisConfig::default());
        assert_eq!(cleaned.report.rows_read, 3);
        assert_eq!(cleaned.report.null_rows_dropped, 2);
        assert_eq!(cleaned.report.invalid_rows, 0);
        assert_eq!(cleaned.visits.len(), 1);
    }

    #[test]
    fn custom_pairings_change_validity() {
        let mut config = AnalysisConfig::default();
        config.control.landing_page = "home_v1".into();
        config.treatment.landing_page = "home_v2".into();
        let records = vec![
            visit(2, "1", "control", "home_v1", false),
            visit(3, "2", "control", "old_page", false),
        ];
        let cleaned = clean_visits(&records, &config);
        assert_eq!(cleaned.visits.len(), 1);
        assert_eq!(cleaned.report.invalid_rows, 1);
    }

    #[test]
    fn empty_input_produces_zero_report() {
        let cleaned = clean_visits(&[], &AnalysisConfig::default());
        assert!(cleaned.visits.is_empty());
        assert_eq!(cleaned.report, CleaningReport::default());
    }
}
