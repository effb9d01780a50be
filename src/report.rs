//! Text and JSON rendering of analysis results.
//!
//! Rendering is separate from computation: every function here takes a
//! finished result and produces a string or a file.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::credit::eda::{BoxStats, CreditEda, GroupRate};
use crate::error::Result;
use crate::experiments::analysis::AbTestOutcome;
use crate::experiments::cleaning::CleaningReport;
use crate::experiments::dataset::NullReport;
use crate::experiments::stats::{Alternative, GroupSummary, TestResult};

pub const EDA_SUMMARY_FILE: &str = "eda_summary.json";

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn write_json_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, to_json(value)? + "\n")?;
    Ok(())
}

/// Writes the credit EDA as `<results_dir>/eda_summary.json`.
pub fn write_eda_summary(eda: &CreditEda, results_dir: &Path) -> Result<PathBuf> {
    let path = results_dir.join(EDA_SUMMARY_FILE);
    write_json_file(eda, &path)?;
    tracing::info!(path = %path.display(), "EDA summary written");
    Ok(path)
}

// ── Conversion experiments ──────────────────────────────────────────

fn tail_name(alternative: Alternative) -> &'static str {
    match alternative {
        Alternative::Greater => "Right-tailed",
        Alternative::Less => "Left-tailed",
        Alternative::TwoSided => "Two-sided",
    }
}

pub fn render_null_report(nulls: &NullReport) -> String {
    let mut out = String::new();
    out.push_str("Missing value:\n");
    for (column, count) in &nulls.per_column {
        out.push_str(&format!("  {:<16} {}\n", column, count));
    }
    out.push_str(&format!(
        "Number of rows containing any null values: {}\n",
        nulls.rows_with_any_null
    ));
    out
}

pub fn render_cleaning_report(report: &CleaningReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("The amount of invalid rows: {}\n", report.invalid_rows));
    if !report.invalid_combinations.is_empty() {
        out.push_str("Combination of logic mistake (group x landing_page):\n");
        for combo in &report.invalid_combinations {
            out.push_str(&format!(
                "  {:<12} {:<12} {}\n",
                combo.group, combo.landing_page, combo.count
            ));
        }
    }
    let before_logic = report.rows_read - report.null_rows_dropped;
    out.push_str(&format!(
        "Number of rows before delete logic mistakes: {}\n",
        before_logic
    ));
    out.push_str(&format!(
        "Number of rows after delete logic mistakes: {}\n",
        report.rows_after_logic
    ));
    out.push_str(&format!(
        "Number of duplicate rows calculated by user_id: {}\n",
        report.duplicate_rows
    ));
    out.push_str(&format!(
        "Number of rows after remove duplicates: {}\n",
        report.rows_after_dedup
    ));
    out
}

pub fn render_conversion_summary(control: &GroupSummary, treatment: &GroupSummary) -> String {
    let mut out = String::from("=== Conversion Summary ===\n");
    for (name, g) in [("Control", control), ("Treatment", treatment)] {
        out.push_str(&format!(
            "{:<10}: n={}, conversions={}, rate={:.6}\n",
            name,
            g.trial_count,
            g.success_count,
            g.observed_rate()
        ));
    }
    out
}

pub fn render_test_result(result: &TestResult) -> String {
    let mut out = format!(
        "=== Z-test Result ({}, α = {}) ===\n",
        tail_name(result.alternative),
        result.alpha
    );
    out.push_str(&format!("Z-score      : {:.6}\n", result.z_score));
    out.push_str(&format!("P-value      : {:.6}\n", result.p_value));
    out.push_str(&format!("Z-critical   : {:.6}\n", result.z_critical));
    out.push_str(&format!("Lift         : {:+.6}\n", result.absolute_lift));
    out.push_str(&format!(
        "{:.0}% CI      : [{:.6}, {:.6}]\n",
        result.confidence_interval.level * 100.0,
        result.confidence_interval.lower,
        result.confidence_interval.upper
    ));
    out
}

pub fn render_conclusion(result: &TestResult) -> String {
    let (verdict, detail) = match (result.decision, result.alternative) {
        (true, Alternative::Greater) => (
            "Reject H0.",
            "The treatment has a significantly higher conversion rate.",
        ),
        (true, Alternative::Less) => (
            "Reject H0.",
            "The treatment has a significantly lower conversion rate.",
        ),
        (true, Alternative::TwoSided) => (
            "Reject H0.",
            "The conversion rates differ significantly.",
        ),
        (false, Alternative::Greater) => (
            "Fail to reject H0.",
            "No sufficient evidence that the treatment converts better.",
        ),
        (false, Alternative::Less) => (
            "Fail to reject H0.",
            "No sufficient evidence that the treatment converts worse.",
        ),
        (false, Alternative::TwoSided) => (
            "Fail to reject H0.",
            "No sufficient evidence that the conversion rates differ.",
        ),
    };
    format!("Conclusion: {}\n→ {}\n", verdict, detail)
}

/// Full text report for an A/B run, in pipeline order.
pub fn render_ab_report(outcome: &AbTestOutcome) -> String {
    let mut out = String::new();
    out.push_str(&render_null_report(&outcome.nulls));
    out.push('\n');
    out.push_str(&render_cleaning_report(&outcome.cleaning));
    out.push_str(&format!(
        "New page traffic percentage (by row): {:.2}%\n",
        outcome.metrics.treatment_page_share * 100.0
    ));
    if let Some(window) = &outcome.metrics.window {
        out.push_str(&format!(
            "Observation window: {} to {} ({:.1} days)\n",
            window.first, window.last, window.elapsed_days
        ));
    }
    out.push('\n');
    out.push_str(&render_conversion_summary(
        &outcome.metrics.control,
        &outcome.metrics.treatment,
    ));
    out.push('\n');
    out.push_str(&render_test_result(&outcome.test));
    out.push('\n');
    out.push_str(&render_conclusion(&outcome.test));

    if outcome.sample_ratio.mismatch {
        out.push_str(&format!(
            "\nWARNING: sample ratio mismatch (chi2 = {:.3}, p = {:.6})\n",
            outcome.sample_ratio.chi_square, outcome.sample_ratio.p_value
        ));
    }
    if let Some(size) = &outcome.required_sample_size {
        out.push_str(&format!(
            "\nSample size to detect the observed lift at power {}: {} per arm ({} total)\n",
            outcome.config.power, size.per_arm, size.total
        ));
    }
    out
}

// ── Credit EDA ──────────────────────────────────────────────────────

fn render_rates(out: &mut String, heading: &str, rates: &[GroupRate]) {
    out.push_str(&format!("{}:\n", heading));
    for g in rates {
        out.push_str(&format!(
            "  {:<20} n={:<5} bad rate={:.4}\n",
            g.label, g.count, g.bad_rate
        ));
    }
}

fn render_box(out: &mut String, label: &str, stats: Option<&BoxStats>) {
    match stats {
        Some(b) => out.push_str(&format!(
            "  {:<12} median={:.1} q1={:.1} q3={:.1} whiskers=[{:.1}, {:.1}] outliers={}\n",
            label,
            b.median,
            b.q1,
            b.q3,
            b.lower_whisker,
            b.upper_whisker,
            b.outliers.len()
        )),
        None => out.push_str(&format!("  {:<12} no rows\n", label)),
    }
}

pub fn render_credit_report(eda: &CreditEda) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Rows read: {}, analyzed: {}, dropped (unmapped risk): {}\n",
        eda.rows_read, eda.rows_analyzed, eda.unmapped_risk_rows
    ));
    out.push_str("\nMissing value:\n");
    for (column, count) in &eda.missing_before.per_column {
        out.push_str(&format!("  {:<18} {}\n", column, count));
    }
    out.push_str("\nMissing value after cleaning:\n");
    for (column, count) in &eda.missing_after.per_column {
        out.push_str(&format!("  {:<18} {}\n", column, count));
    }

    out.push_str(&format!(
        "\nRisk: good={}, bad={}\nThe bad rate is {:.2}%\n\n",
        eda.risk.good,
        eda.risk.bad,
        eda.risk.bad_rate * 100.0
    ));

    render_rates(&mut out, "Bad rate by age group", &eda.by_age_group);
    render_rates(&mut out, "Bad rate by job", &eda.by_job);
    render_rates(&mut out, "Bad rate by housing", &eda.by_housing);
    render_rates(&mut out, "Bad rate by gender", &eda.by_sex);
    render_rates(&mut out, "Bad rate by duration group", &eda.by_duration_group);
    render_rates(&mut out, "Bad rate by purpose", &eda.by_purpose);

    out.push_str("Credit amount by risk:\n");
    render_box(&mut out, "Good Credit", eda.credit_amount_by_risk.good.as_ref());
    render_box(&mut out, "Bad Credit", eda.credit_amount_by_risk.bad.as_ref());
    out.push_str("Duration by risk:\n");
    render_box(&mut out, "Good Credit", eda.duration_by_risk.good.as_ref());
    render_box(&mut out, "Bad Credit", eda.duration_by_risk.bad.as_ref());

    let pivot = &eda.purpose_by_duration;
    out.push_str("Bad rate by purpose x duration group:\n");
    out.push_str(&format!("  {:<20}", ""));
    for col in &pivot.columns {
        out.push_str(&format!(" {:>7}", col));
    }
    out.push('\n');
    for row in &pivot.rows {
        out.push_str(&format!("  {:<20}", row.purpose));
        for cell in &row.cells {
            match cell {
                Some(v) => out.push_str(&format!(" {:>7.2}", v)),
                None => out.push_str(&format!(" {:>7}", "-")),
            }
        }
        out.push('\n');
    }
    out
}
