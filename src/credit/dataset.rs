//! German-credit style customer table: loading, cleaning and binning.
//!
//! Headers are standardised before lookup, so `Saving accounts` and
//! `saving_accounts` both resolve. Rows whose `risk` is neither `good` nor
//! `bad` are dropped and counted; the two account columns get `"unknown"`
//! for missing cells; every other required cell must be present.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;

use crate::error::{AbscopeError, Result};
use crate::experiments::dataset::NullReport;

pub const AGE: &str = "age";
pub const SEX: &str = "sex";
pub const JOB: &str = "job";
pub const HOUSING: &str = "housing";
pub const SAVING_ACCOUNTS: &str = "saving_accounts";
pub const CHECKING_ACCOUNT: &str = "checking_account";
pub const CREDIT_AMOUNT: &str = "credit_amount";
pub const DURATION: &str = "duration";
pub const PURPOSE: &str = "purpose";
pub const RISK: &str = "risk";
pub const AGE_GROUP: &str = "age_group";
pub const DURATION_GROUP: &str = "duration_group";

pub const REQUIRED_COLUMNS: [&str; 10] = [
    AGE,
    SEX,
    JOB,
    HOUSING,
    SAVING_ACCOUNTS,
    CHECKING_ACCOUNT,
    CREDIT_AMOUNT,
    DURATION,
    PURPOSE,
    RISK,
];

pub const UNKNOWN: &str = "unknown";

// ── Bins ────────────────────────────────────────────────────────────

/// Right-closed age bins: (18,25], (25,35], (35,45], (45,55], (55,100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeGroup {
    #[serde(rename = "18-25")]
    From18To25,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "36-45")]
    From36To45,
    #[serde(rename = "46-55")]
    From46To55,
    #[serde(rename = "56+")]
    From56,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::From18To25,
        AgeGroup::From26To35,
        AgeGroup::From36To45,
        AgeGroup::From46To55,
        AgeGroup::From56,
    ];

    pub fn from_age(age: u32) -> Option<Self> {
        match age {
            19..=25 => Some(AgeGroup::From18To25),
            26..=35 => Some(AgeGroup::From26To35),
            36..=45 => Some(AgeGroup::From36To45),
            46..=55 => Some(AgeGroup::From46To55),
            56..=100 => Some(AgeGroup::From56),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::From18To25 => "18-25",
            AgeGroup::From26To35 => "26-35",
            AgeGroup::From36To45 => "36-45",
            AgeGroup::From46To55 => "46-55",
            AgeGroup::From56 => "56+",
        }
    }
}

/// Right-closed loan duration bins in months: (0,12], (12,24], (24,36], (36,72].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DurationGroup {
    #[serde(rename = "<=12")]
    UpTo12,
    #[serde(rename = "13-24")]
    From13To24,
    #[serde(rename = "25-36")]
    From25To36,
    #[serde(rename = "37-72")]
    From37To72,
}

impl DurationGroup {
    pub const ALL: [DurationGroup; 4] = [
        DurationGroup::UpTo12,
        DurationGroup::From13To24,
        DurationGroup::From25To36,
        DurationGroup::From37To72,
    ];

    pub fn from_months(months: u32) -> Option<Self> {
        match months {
            1..=12 => Some(DurationGroup::UpTo12),
            13..=24 => Some(DurationGroup::From13To24),
            25..=36 => Some(DurationGroup::From25To36),
            37..=72 => Some(DurationGroup::From37To72),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DurationGroup::UpTo12 => "<=12",
            DurationGroup::From13To24 => "13-24",
            DurationGroup::From25To36 => "25-36",
            DurationGroup::From37To72 => "37-72",
        }
    }
}

// ── Records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CreditRecord {
    pub line: u64,
    pub age: u32,
    pub sex: String,
    pub job: u32,
    pub housing: String,
    pub saving_accounts: String,
    pub checking_account: String,
    pub credit_amount: f64,
    pub duration: u32,
    pub purpose: String,
    /// 0 = good, 1 = bad.
    pub risk: u8,
    pub age_group: Option<AgeGroup>,
    pub duration_group: Option<DurationGroup>,
}

impl CreditRecord {
    pub fn is_bad(&self) -> bool {
        self.risk == 1
    }
}

#[derive(Debug, Clone)]
pub struct CreditDataset {
    pub records: Vec<CreditRecord>,
    pub rows_read: u64,
    pub unmapped_risk_rows: u64,
    /// Empty cells per required column in the raw file.
    pub missing_before: NullReport,
    /// Missing values left after cleaning, binned columns included.
    pub missing_after: NullReport,
}

/// `" Saving accounts "` → `"saving_accounts"`.
pub fn standardize_column_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

fn is_dropped_column(name: &str) -> bool {
    name.is_empty() || name.starts_with("unnamed:")
}

pub fn map_risk(raw: &str) -> Option<u8> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "good" => Some(0),
        "bad" => Some(1),
        _ => None,
    }
}

/// Empty cells and the `NA`/`nan` tokens count as missing.
fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan")
}

fn fill_account(raw: Option<&str>) -> String {
    raw.unwrap_or(UNKNOWN).to_string()
}

// ── Loading ─────────────────────────────────────────────────────────

pub fn read_credit_csv(path: &Path) -> Result<CreditDataset> {
    let file = std::fs::File::open(path)?;
    let dataset = read_credit_from_reader(std::io::BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        rows_read = dataset.rows_read,
        rows_kept = dataset.records.len(),
        unmapped_risk_rows = dataset.unmapped_risk_rows,
        "Credit dataset loaded"
    );
    Ok(dataset)
}

pub fn read_credit_from_reader<R: Read>(reader: R) -> Result<CreditDataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let index = column_index(&headers)?;

    let mut raw_rows: Vec<(u64, StringRecord)> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        raw_rows.push((line, record));
    }

    let missing_before = {
        let mut counts: Vec<(String, u64)> =
            REQUIRED_COLUMNS.iter().map(|c| (c.to_string(), 0)).collect();
        let mut any = 0;
        for (_, record) in &raw_rows {
            let mut row_has_null = false;
            for (slot, name) in counts.iter_mut().zip(REQUIRED_COLUMNS) {
                if cell(record, &index, name).is_none() {
                    slot.1 += 1;
                    row_has_null = true;
                }
            }
            if row_has_null {
                any += 1;
            }
        }
        null_report(raw_rows.len() as u64, counts, any)
    };

    let mut records = Vec::with_capacity(raw_rows.len());
    let mut unmapped_risk_rows = 0u64;
    for (line, record) in &raw_rows {
        let risk = match cell(record, &index, RISK).and_then(map_risk) {
            Some(r) => r,
            None => {
                unmapped_risk_rows += 1;
                continue;
            }
        };
        records.push(parse_record(record, &index, *line, risk)?);
    }

    if unmapped_risk_rows > 0 {
        tracing::warn!(unmapped_risk_rows, "Dropped rows whose risk is neither good nor bad");
    }

    let missing_after = {
        let unbinned_age = records.iter().filter(|r| r.age_group.is_none()).count() as u64;
        let unbinned_duration = records
            .iter()
            .filter(|r| r.duration_group.is_none())
            .count() as u64;
        let any = records
            .iter()
            .filter(|r| r.age_group.is_none() || r.duration_group.is_none())
            .count() as u64;
        let mut counts: Vec<(String, u64)> =
            REQUIRED_COLUMNS.iter().map(|c| (c.to_string(), 0)).collect();
        counts.push((AGE_GROUP.to_string(), unbinned_age));
        counts.push((DURATION_GROUP.to_string(), unbinned_duration));
        null_report(records.len() as u64, counts, any)
    };

    Ok(CreditDataset {
        rows_read: raw_rows.len() as u64,
        records,
        unmapped_risk_rows,
        missing_before,
        missing_after,
    })
}

fn null_report(total_rows: u64, mut counts: Vec<(String, u64)>, any: u64) -> NullReport {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    NullReport {
        total_rows,
        per_column: counts.into_iter().collect(),
        rows_with_any_null: any,
    }
}

fn column_index(headers: &StringRecord) -> Result<HashMap<&'static str, usize>> {
    let standardized: Vec<String> = headers.iter().map(standardize_column_name).collect();
    let mut index = HashMap::new();
    for name in REQUIRED_COLUMNS {
        let pos = standardized
            .iter()
            .position(|h| !is_dropped_column(h) && h == name)
            .ok_or_else(|| AbscopeError::MissingColumn(name.to_string()))?;
        index.insert(name, pos);
    }
    Ok(index)
}

fn cell<'r>(
    record: &'r StringRecord,
    index: &HashMap<&'static str, usize>,
    name: &str,
) -> Option<&'r str> {
    index
        .get(name)
        .and_then(|&pos| record.get(pos))
        .map(str::trim)
        .filter(|v| !is_missing(v))
}

fn required_text(
    record: &StringRecord,
    index: &HashMap<&'static str, usize>,
    name: &'static str,
    line: u64,
) -> Result<String> {
    cell(record, index, name)
        .map(str::to_string)
        .ok_or_else(|| AbscopeError::Parse {
            line,
            column: name.to_string(),
            message: "missing value".to_string(),
        })
}

fn required_number<T: std::str::FromStr>(
    record: &StringRecord,
    index: &HashMap<&'static str, usize>,
    name: &'static str,
    line: u64,
) -> Result<T> {
    let raw = required_text(record, index, name, line)?;
    raw.parse::<T>().map_err(|_| AbscopeError::Parse {
        line,
        column: name.to_string(),
        message: format!("expected a number, got '{}'", raw),
    })
}

fn parse_record(
    record: &StringRecord,
    index: &HashMap<&'static str, usize>,
    line: u64,
    risk: u8,
) -> Result<CreditRecord> {
    let age: u32 = required_number(record, index, AGE, line)?;
    let duration: u32 = required_number(record, index, DURATION, line)?;
    let credit_amount: f64 = required_number(record, index, CREDIT_AMOUNT, line)?;
    if !credit_amount.is_finite() {
        return Err(AbscopeError::Parse {
            line,
            column: CREDIT_AMOUNT.to_string(),
            message: "credit amount must be finite".to_string(),
        });
    }

    Ok(CreditRecord {
        line,
        age,
        sex: required_text(record, index, SEX, line)?,
        job: required_number(record, index, JOB, line)?,
        housing: required_text(record, index, HOUSING, line)?,
        saving_accounts: fill_account(cell(record, index, SAVING_ACCOUNTS)),
        checking_account: fill_account(cell(record, index, CHECKING_ACCOUNT)),
        credit_amount,
        duration,
        purpose: required_text(record, index, PURPOSE, line)?,
        risk,
        age_group: AgeGroup::from_age(age),
        duration_group: DurationGroup::from_months(duration),
    })
}
