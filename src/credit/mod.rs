//! Credit-risk exploratory analysis: load and bin the customer table,
//! compute bad rates and distributions, draw the figures.

pub mod dataset;
pub mod eda;
pub mod figures;

pub use dataset::{read_credit_csv, AgeGroup, CreditDataset, CreditRecord, DurationGroup};
pub use eda::{analyze, run_credit_eda, BoxStats, CreditEda, GroupRate};
pub use figures::write_credit_figures;
