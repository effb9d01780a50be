//! abscope: conversion-experiment evaluation and credit-risk exploration.
//!
//! The core is [`two_proportion_z_test`], a pure function over two
//! [`GroupSummary`] values. Around it sit CSV ingestion and cleaning for
//! visit logs, a credit-dataset EDA, SVG charts and text/JSON reports.

pub mod chart;
pub mod credit;
pub mod error;
pub mod experiments;
pub mod report;

pub use error::{AbscopeError, Result};
pub use experiments::{
    run_ab_test, two_proportion_z_test, AbTestOutcome, Alternative, AnalysisConfig,
    GroupSummary, TestConfig, TestError, TestResult,
};
