//! Exploratory statistics over a cleaned credit dataset.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use super::dataset::{self, CreditDataset, CreditRecord, DurationGroup};
use crate::error::{AbscopeError, Result};
use crate::experiments::dataset::NullReport;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDistribution {
    pub good: u64,
    pub bad: u64,
    pub total: u64,
    pub bad_rate: f64,
}

/// Bad rate of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRate {
    pub label: String,
    pub count: u64,
    pub bad_count: u64,
    pub bad_rate: f64,
}

impl GroupRate {
    fn new(label: impl Into<String>, count: u64, bad_count: u64) -> Self {
        GroupRate {
            label: label.into(),
            count,
            bad_count,
            bad_rate: if count == 0 {
                0.0
            } else {
                bad_count as f64 / count as f64
            },
        }
    }
}

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxStats {
    pub count: u64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Smallest value within `q1 - 1.5·IQR`.
    pub lower_whisker: f64,
    /// Largest value within `q3 + 1.5·IQR`.
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// None for an empty slice. NaN values are ignored.
    pub fn from_values(values: &[f64]) -> Option<BoxStats> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= low_fence && *v <= high_fence)
            .collect();
        let outliers: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(BoxStats {
            count: sorted.len() as u64,
            min: sorted[0],
            q1,
            median,
            q3,
            max: sorted[sorted.len() - 1],
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

/// Linear interpolation between closest ranks, `p` in [0, 1].
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBoxStats {
    pub good: Option<BoxStats>,
    pub bad: Option<BoxStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    pub purpose: String,
    /// One cell per duration group; None when no loans fall in it.
    pub cells: Vec<Option<f64>>,
}

/// Bad rate by purpose (rows, alphabetical) × duration group (columns, bin order).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionPivot {
    pub columns: Vec<String>,
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEda {
    pub rows_read: u64,
    pub rows_analyzed: u64,
    pub unmapped_risk_rows: u64,
    pub missing_before: NullReport,
    pub missing_after: NullReport,
    pub risk: RiskDistribution,
    pub by_age_group: Vec<GroupRate>,
    pub by_job: Vec<GroupRate>,
    pub by_housing: Vec<GroupRate>,
    pub by_sex: Vec<GroupRate>,
    pub by_duration_group: Vec<GroupRate>,
    /// Highest bad rate first.
    pub by_purpose: Vec<GroupRate>,
    pub credit_amount_by_risk: RiskBoxStats,
    pub duration_by_risk: RiskBoxStats,
    pub purpose_by_duration: InteractionPivot,
}

pub fn run_credit_eda(path: &Path) -> Result<CreditEda> {
    let dataset = dataset::read_credit_csv(path)?;
    analyze(&dataset)
}

pub fn analyze(dataset: &CreditDataset) -> Result<CreditEda> {
    let records = &dataset.records;
    if records.is_empty() {
        return Err(AbscopeError::EmptyDataset(
            "no credit rows with a good/bad risk label".to_string(),
        ));
    }

    let bad = records.iter().filter(|r| r.is_bad()).count() as u64;
    let total = records.len() as u64;
    let risk = RiskDistribution {
        good: total - bad,
        bad,
        total,
        bad_rate: bad as f64 / total as f64,
    };
    tracing::info!(
        total,
        bad,
        bad_rate = risk.bad_rate,
        "Credit risk distribution computed"
    );

    let mut by_purpose = rates_by(records, |r| Some(r.purpose.clone()));
    // Stable: ties keep alphabetical order
    by_purpose.sort_by(|a, b| b.1.bad_rate.total_cmp(&a.1.bad_rate));

    let eda = CreditEda {
        rows_read: dataset.rows_read,
        rows_analyzed: total,
        unmapped_risk_rows: dataset.unmapped_risk_rows,
        missing_before: dataset.missing_before.clone(),
        missing_after: dataset.missing_after.clone(),
        risk,
        by_age_group: rates_by(records, |r| r.age_group)
            .into_iter()
            .map(|(g, rate)| GroupRate { label: g.label().to_string(), ..rate })
            .collect(),
        by_job: rates_by(records, |r| Some(r.job))
            .into_iter()
            .map(|(job, rate)| GroupRate { label: job.to_string(), ..rate })
            .collect(),
        by_housing: labelled(rates_by(records, |r| Some(r.housing.clone()))),
        by_sex: labelled(rates_by(records, |r| Some(r.sex.clone()))),
        by_duration_group: rates_by(records, |r| r.duration_group)
            .into_iter()
            .map(|(g, rate)| GroupRate { label: g.label().to_string(), ..rate })
            .collect(),
        by_purpose: labelled(by_purpose),
        credit_amount_by_risk: box_stats_by_risk(records, |r| r.credit_amount),
        duration_by_risk: box_stats_by_risk(records, |r| r.duration as f64),
        purpose_by_duration: purpose_duration_pivot(records),
    };

    for g in &eda.by_purpose {
        tracing::debug!(purpose = %g.label, count = g.count, bad_rate = g.bad_rate, "Purpose bad rate");
    }

    Ok(eda)
}

/// Bad rate per key in key order. Rows whose key is None are skipped.
fn rates_by<K, F>(records: &[CreditRecord], key: F) -> Vec<(K, GroupRate)>
where
    K: Ord + Clone,
    F: Fn(&CreditRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, (u64, u64)> = BTreeMap::new();
    for r in records {
        if let Some(k) = key(r) {
            let entry = groups.entry(k).or_default();
            entry.0 += 1;
            if r.is_bad() {
                entry.1 += 1;
            }
        }
    }
    groups
        .into_iter()
        .map(|(k, (count, bad))| (k, GroupRate::new(String::new(), count, bad)))
        .collect()
}

fn labelled(rates: Vec<(String, GroupRate)>) -> Vec<GroupRate> {
    rates
        .into_iter()
        .map(|(label, rate)| GroupRate { label, ..rate })
        .collect()
}

fn box_stats_by_risk<F>(records: &[CreditRecord], value: F) -> RiskBoxStats
where
    F: Fn(&CreditRecord) -> f64,
{
    let (bad, good): (Vec<&CreditRecord>, Vec<&CreditRecord>) =
        records.iter().partition(|r| r.is_bad());
    let values = |rows: &[&CreditRecord]| rows.iter().map(|&r| value(r)).collect::<Vec<f64>>();
    RiskBoxStats {
        good: BoxStats::from_values(&values(&good)),
        bad: BoxStats::from_values(&values(&bad)),
    }
}

fn purpose_duration_pivot(records: &[CreditRecord]) -> InteractionPivot {
    let mut cells: BTreeMap<&str, BTreeMap<DurationGroup, (u64, u64)>> = BTreeMap::new();
    for r in records {
        let row = cells.entry(r.purpose.as_str()).or_default();
        if let Some(g) = r.duration_group {
            let entry = row.entry(g).or_default();
            entry.0 += 1;
            if r.is_bad() {
                entry.1 += 1;
            }
        }
    }

    InteractionPivot {
        columns: DurationGroup::ALL
            .iter()
            .map(|g| g.label().to_string())
            .collect(),
        rows: cells
            .into_iter()
            .map(|(purpose, row)| PivotRow {
                purpose: purpose.to_string(),
                cells: DurationGroup::ALL
                    .iter()
                    .map(|g| {
                        row.get(g)
                            .map(|(count, bad)| *bad as f64 / *count as f64)
                    })
                    .collect(),
            })
            .collect(),
    }
}
