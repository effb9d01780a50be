pub mod analysis;
pub mod cleaning;
pub mod config;
pub mod dataset;
pub mod metrics;
pub mod stats;

pub use analysis::{evaluate_visit_log, run_ab_test, write_conversion_chart, AbTestOutcome};
pub use config::{AnalysisConfig, ArmPairing, ConfigError, TestConfig};
pub use stats::{two_proportion_z_test, Alternative, GroupSummary, TestError, TestResult};
