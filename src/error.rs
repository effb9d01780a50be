use thiserror::Error;

use crate::experiments::config::ConfigError;
use crate::experiments::stats::TestError;

#[derive(Error, Debug)]
pub enum AbscopeError {
    #[error("Statistical test failed: {0}")]
    Test(#[from] TestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: u64,
        column: String,
        message: String,
    },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("No rows found for experiment arm: {0}")]
    MissingArm(String),

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, AbscopeError>;

impl From<std::io::Error> for AbscopeError {
    fn from(e: std::io::Error) -> Self {
        AbscopeError::Io(e.to_string())
    }
}

impl From<csv::Error> for AbscopeError {
    fn from(e: csv::Error) -> Self {
        AbscopeError::Csv(e.to_string())
    }
}

impl From<serde_json::Error> for AbscopeError {
    fn from(e: serde_json::Error) -> Self {
        AbscopeError::Json(e.to_string())
    }
}

impl AbscopeError {
    /// Process exit code for the CLI. Input problems exit with 2, environment
    /// failures with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AbscopeError::Test(_) => 2,
            AbscopeError::Config(_) => 2,
            AbscopeError::Parse { .. } => 2,
            AbscopeError::MissingColumn(_) => 2,
            AbscopeError::MissingArm(_) => 2,
            AbscopeError::EmptyDataset(_) => 2,
            AbscopeError::Csv(_) => 2,
            AbscopeError::Json(_) => 2,
            AbscopeError::Io(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── exit_code mapping ───────────────────────────────────────────────

    #[test]
    fn degenerate_variance_exits_with_2() {
        let e: AbscopeError = TestError::DegenerateVariance { pooled_rate: 0.0 }.into();
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn invalid_input_exits_with_2() {
        let e: AbscopeError = TestError::InvalidInput("trial_count must be > 0".into()).into();
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn missing_arm_exits_with_2() {
        assert_eq!(AbscopeError::MissingArm("treatment".into()).exit_code(), 2);
    }

    #[test]
    fn io_error_exits_with_1() {
        let e = AbscopeError::Io("disk full".into());
        assert_eq!(e.exit_code(), 1);
    }

    // ── Display ─────────────────────────────────────────────────────────

    #[test]
    fn parse_error_display_names_line_and_column() {
        let e = AbscopeError::Parse {
            line: 42,
            column: "converted".into(),
            message: "expected 0 or 1, got 'yes please'".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("42"), "msg={}", msg);
        assert!(msg.contains("converted"), "msg={}", msg);
    }

    #[test]
    fn test_error_display_is_wrapped() {
        let e: AbscopeError = TestError::DegenerateVariance { pooled_rate: 1.0 }.into();
        assert!(e.to_string().starts_with("Statistical test failed"));
    }

    // ── From conversions ────────────────────────────────────────────────

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AbscopeError = io_err.into();
        assert!(matches!(err, AbscopeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: AbscopeError = json_err.into();
        assert!(matches!(err, AbscopeError::Json(_)));
    }

    #[test]
    fn from_config_error() {
        let err: AbscopeError = ConfigError::Invalid("alpha must be in (0, 1)".into()).into();
        assert!(matches!(err, AbscopeError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
