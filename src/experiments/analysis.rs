//! End-to-end A/B evaluation: load → clean → aggregate → test.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::cleaning::{self, CleaningReport};
use super::config::AnalysisConfig;
use super::dataset::{self, NullReport, VisitLog};
use super::metrics::{self, ExperimentMetrics};
use super::stats::{self, SampleRatioCheck, SampleSizeEstimate, TestResult};
use crate::chart::{BarChart, ValueFormat};
use crate::error::Result;

pub const CONVERSION_CHART_FILE: &str = "conversion_rate_comparison.svg";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbTestOutcome {
    pub config: AnalysisConfig,
    pub nulls: NullReport,
    pub cleaning: CleaningReport,
    pub metrics: ExperimentMetrics,
    pub test: TestResult,
    pub sample_ratio: SampleRatioCheck,
    /// Per-arm size needed to detect the observed relative lift at the
    /// configured power. None when the lift is zero or not a valid effect.
    pub required_sample_size: Option<SampleSizeEstimate>,
}

pub fn run_ab_test(path: &Path, config: &AnalysisConfig) -> Result<AbTestOutcome> {
    config.validate()?;
    let log = dataset::read_visits(path)?;
    evaluate_visit_log(log, config)
}

/// Pure part of the pipeline, separated from file I/O for testability.
pub fn evaluate_visit_log(log: VisitLog, config: &AnalysisConfig) -> Result<AbTestOutcome> {
    let cleaned = cleaning::clean_visits(&log.records, config);
    let metrics = metrics::aggregate_experiment_metrics(&cleaned.visits, config)?;

    let test = stats::two_proportion_z_test(&metrics.control, &metrics.treatment, &config.test)?;
    tracing::info!(
        z_score = test.z_score,
        p_value = test.p_value,
        alternative = %test.alternative,
        decision = test.decision,
        "Two-proportion z-test evaluated"
    );

    let sample_ratio = stats::check_sample_ratio_mismatch(
        metrics.control.trial_count,
        metrics.treatment.trial_count,
        config.expected_treatment_fraction,
    );
    if sample_ratio.mismatch {
        tracing::warn!(
            chi_square = sample_ratio.chi_square,
            p_value = sample_ratio.p_value,
            "Sample ratio mismatch between arms"
        );
    }

    let required_sample_size = test.relative_lift.and_then(|lift| {
        match stats::required_sample_size(
            test.rate_a,
            lift,
            config.test.alpha,
            config.power,
            config.expected_treatment_fraction,
        ) {
            Ok(est) if est.per_arm != u64::MAX => Some(est),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping sample size estimate");
                None
            }
        }
    });

    Ok(AbTestOutcome {
        config: config.clone(),
        nulls: log.null_report,
        cleaning: cleaned.report,
        metrics,
        test,
        sample_ratio,
        required_sample_size,
    })
}

/// Conversion rate per group, one bar per group, labelled as percentages.
pub fn conversion_chart(outcome: &AbTestOutcome) -> BarChart {
    BarChart {
        title: "Conversion Rate: Old Page vs New Page".to_string(),
        x_label: "Group".to_string(),
        y_label: "Conversion Rate".to_string(),
        bars: outcome
            .metrics
            .groups
            .iter()
            .map(|g| (g.label.clone(), g.observed_rate()))
            .collect(),
        y_max: None,
        value_format: ValueFormat::Percent,
    }
}

pub fn write_conversion_chart(outcome: &AbTestOutcome, figures_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(figures_dir)?;
    let path = figures_dir.join(CONVERSION_CHART_FILE);
    conversion_chart(outcome).write_svg(&path)?;
    tracing::info!(path = %path.display(), "Conversion chart written");
    Ok(path)
}
