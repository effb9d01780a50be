//! Per-arm aggregation for conversion experiments.
//!
//! Groups clean visits by `group`, counting visits and conversions, and
//! returns the two Group Summaries the z-test consumes along with a couple of
//! traffic diagnostics.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use super::cleaning::CleanVisit;
use super::config::AnalysisConfig;
use super::stats::GroupSummary;
use crate::error::{AbscopeError, Result};

/// First and last visit seen in the clean data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationWindow {
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub elapsed_days: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentMetrics {
    /// Every group present in the clean data, sorted by label.
    pub groups: Vec<GroupSummary>,
    pub control: GroupSummary,
    pub treatment: GroupSummary,
    /// Fraction of clean visits that landed on the treatment page.
    pub treatment_page_share: f64,
    pub window: Option<ObservationWindow>,
    pub unparsed_timestamps: u64,
}

pub fn aggregate_experiment_metrics(
    visits: &[CleanVisit],
    config: &AnalysisConfig,
) -> Result<ExperimentMetrics> {
    if visits.is_empty() {
        return Err(AbscopeError::EmptyDataset(
            "no visits left after cleaning".to_string(),
        ));
    }

    // group -> (count, sum(converted))
    let mut by_group: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    let mut treatment_page_visits: u64 = 0;
    for v in visits {
        let entry = by_group.entry(v.group.as_str()).or_default();
        entry.0 += 1;
        if v.converted {
            entry.1 += 1;
        }
        if v.landing_page == config.treatment.landing_page {
            treatment_page_visits += 1;
        }
    }

    let groups: Vec<GroupSummary> = by_group
        .into_iter()
        .map(|(label, (count, conversions))| GroupSummary::new(label, count, conversions))
        .collect();

    for g in &groups {
        tracing::debug!(
            group = %g.label,
            visits = g.trial_count,
            conversions = g.success_count,
            rate = g.observed_rate(),
            "Group summary"
        );
    }

    let find_arm = |label: &str| {
        groups
            .iter()
            .find(|g| g.label == label)
            .cloned()
            .ok_or_else(|| AbscopeError::MissingArm(label.to_string()))
    };
    let control = find_arm(&config.control.group)?;
    let treatment = find_arm(&config.treatment.group)?;

    let (window, unparsed_timestamps) = observation_window(visits);
    if unparsed_timestamps > 0 {
        tracing::warn!(
            unparsed_timestamps,
            "Some timestamps could not be parsed and were left out of the observation window"
        );
    }

    Ok(ExperimentMetrics {
        treatment_page_share: treatment_page_visits as f64 / visits.len() as f64,
        groups,
        control,
        treatment,
        window,
        unparsed_timestamps,
    })
}

/// Accepts `2017-01-21 22:11:48.556739`, the same without fraction, or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

fn observation_window(visits: &[CleanVisit]) -> (Option<ObservationWindow>, u64) {
    let mut unparsed = 0u64;
    let mut bounds: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for v in visits {
        match parse_timestamp(&v.timestamp) {
            Some(ts) => {
                bounds = Some(match bounds {
                    None => (ts, ts),
                    Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
                });
            }
            None => unparsed += 1,
        }
    }

    let window = bounds.map(|(first, last)| ObservationWindow {
        first,
        last,
        elapsed_days: (last - first).num_milliseconds() as f64 / 86_400_000.0,
    });
    (window, unparsed)
}
