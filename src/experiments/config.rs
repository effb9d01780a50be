use serde::{Deserialize, Serialize};
use std::path::Path;

use super::stats::Alternative;

/// Significance level and test direction for the z-test.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TestConfig {
    pub alpha: f64,
    pub alternative: Alternative,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            alternative: Alternative::Greater,
        }
    }
}

impl TestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "alpha must be in (0.0, 1.0) exclusive, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// A sanctioned `group × landing_page` combination.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArmPairing {
    pub group: String,
    pub landing_page: String,
}

impl ArmPairing {
    pub fn new(group: impl Into<String>, landing_page: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            landing_page: landing_page.into(),
        }
    }

    pub fn matches(&self, group: &str, landing_page: &str) -> bool {
        self.group == group && self.landing_page == landing_page
    }
}

/// Everything the A/B analysis needs besides the data file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    pub control: ArmPairing,
    pub treatment: ArmPairing,
    pub test: TestConfig,
    /// Expected fraction of clean traffic in the treatment arm, for the SRM check.
    pub expected_treatment_fraction: f64,
    /// Power used when estimating the sample size needed for the observed lift.
    pub power: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            control: ArmPairing::new("control", "old_page"),
            treatment: ArmPairing::new("treatment", "new_page"),
            test: TestConfig::default(),
            expected_treatment_fraction: 0.5,
            power: 0.8,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.test.validate()?;
        if self.control.group == self.treatment.group {
            return Err(ConfigError::Invalid(format!(
                "control and treatment must use different groups, both are '{}'",
                self.control.group
            )));
        }
        if self.control.landing_page == self.treatment.landing_page {
            return Err(ConfigError::Invalid(format!(
                "control and treatment must use different landing pages, both are '{}'",
                self.control.landing_page
            )));
        }
        for pairing in [&self.control, &self.treatment] {
            if pairing.group.trim().is_empty() || pairing.landing_page.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "arm pairings must name a group and a landing page".to_string(),
                ));
            }
        }
        if self.expected_treatment_fraction <= 0.0 || self.expected_treatment_fraction >= 1.0 {
            return Err(ConfigError::Invalid(
                "expectedTreatmentFraction must be in (0.0, 1.0) exclusive".to_string(),
            ));
        }
        if self.power <= 0.0 || self.power >= 1.0 {
            return Err(ConfigError::Invalid(
                "power must be in (0.0, 1.0) exclusive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pairings(&self) -> [&ArmPairing; 2] {
        [&self.control, &self.treatment]
    }
}
