//! SVG figures for the credit EDA.

use std::path::{Path, PathBuf};

use super::eda::{CreditEda, GroupRate, RiskBoxStats};
use crate::chart::{BarChart, BoxPlot, Heatmap, ValueFormat};
use crate::error::Result;

pub const OVERALL_CREDIT_RISK: &str = "overall_credit_risk.svg";
pub const BAD_RATE_BY_AGE_GROUP: &str = "bad_rate_by_age_group.svg";
pub const BAD_RATE_BY_JOB: &str = "bad_credit_rate_by_job.svg";
pub const BAD_RATE_BY_HOUSING: &str = "bad_credit_rate_by_housing.svg";
pub const BAD_RATE_BY_GENDER: &str = "bad_credit_rate_by_gender.svg";
pub const CREDIT_AMOUNT_BY_RISK: &str = "credit_amount_distribution_by_risk.svg";
pub const DURATION_BY_RISK: &str = "duration_distribution_by_risk.svg";
pub const BAD_RATE_BY_DURATION_GROUP: &str = "bad_rate_by_duration_group.svg";
pub const BAD_RATE_BY_PURPOSE: &str = "bad_rate_by_purpose.svg";
pub const INTERACTION_DURATION_PURPOSE: &str = "interaction_duration_purpose.svg";

fn rate_chart(title: &str, x_label: &str, rates: &[GroupRate]) -> BarChart {
    BarChart {
        title: title.to_string(),
        x_label: x_label.to_string(),
        y_label: "Bad Credit Rate".to_string(),
        bars: rates.iter().map(|g| (g.label.clone(), g.bad_rate)).collect(),
        y_max: Some(1.0),
        value_format: ValueFormat::Decimal,
    }
}

fn risk_box_plot(title: &str, y_label: &str, stats: &RiskBoxStats) -> BoxPlot {
    let mut boxes = Vec::new();
    if let Some(good) = &stats.good {
        boxes.push(("Good Credit".to_string(), good.clone()));
    }
    if let Some(bad) = &stats.bad {
        boxes.push(("Bad Credit".to_string(), bad.clone()));
    }
    BoxPlot {
        title: title.to_string(),
        x_label: "Credit Risk".to_string(),
        y_label: y_label.to_string(),
        boxes,
    }
}

/// Writes every credit figure into `dir`, returning the paths in write order.
pub fn write_credit_figures(eda: &CreditEda, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let mut bar = |name: &str, chart: BarChart| -> Result<()> {
        let path = dir.join(name);
        chart.write_svg(&path)?;
        written.push(path);
        Ok(())
    };

    bar(
        OVERALL_CREDIT_RISK,
        BarChart {
            title: "Overall Credit Risk Distribution".to_string(),
            x_label: "Credit Risk".to_string(),
            y_label: "Number of Customers".to_string(),
            bars: vec![
                ("Good Credit".to_string(), eda.risk.good as f64),
                ("Bad Credit".to_string(), eda.risk.bad as f64),
            ],
            y_max: None,
            value_format: ValueFormat::Integer,
        },
    )?;
    bar(
        BAD_RATE_BY_AGE_GROUP,
        rate_chart("Bad Credit Rate by Age Group", "Age Group", &eda.by_age_group),
    )?;
    bar(BAD_RATE_BY_JOB, rate_chart("Bad Credit Rate by Job", "Job", &eda.by_job))?;
    bar(
        BAD_RATE_BY_HOUSING,
        rate_chart("Bad Credit Rate by Housing", "Housing", &eda.by_housing),
    )?;
    bar(
        BAD_RATE_BY_GENDER,
        rate_chart("Bad Credit Rate by Gender", "Gender", &eda.by_sex),
    )?;
    bar(
        BAD_RATE_BY_DURATION_GROUP,
        rate_chart(
            "Bad Credit Rate by Loan Duration Group",
            "Loan Duration Group (Months)",
            &eda.by_duration_group,
        ),
    )?;
    bar(
        BAD_RATE_BY_PURPOSE,
        rate_chart("Bad Credit Rate by Loan Purpose", "Purpose", &eda.by_purpose),
    )?;

    let path = dir.join(CREDIT_AMOUNT_BY_RISK);
    risk_box_plot(
        "Credit Amount Distribution by Credit Risk",
        "Credit Amount",
        &eda.credit_amount_by_risk,
    )
    .write_svg(&path)?;
    written.push(path);

    let path = dir.join(DURATION_BY_RISK);
    risk_box_plot(
        "Loan Duration Distribution by Credit Risk",
        "Loan Duration (Months)",
        &eda.duration_by_risk,
    )
    .write_svg(&path)?;
    written.push(path);

    let path = dir.join(INTERACTION_DURATION_PURPOSE);
    Heatmap {
        title: "Bad Credit Rate by Loan Purpose and Duration Group".to_string(),
        x_label: "Loan Duration Group (Months)".to_string(),
        y_label: "Loan Purpose".to_string(),
        columns: eda.purpose_by_duration.columns.clone(),
        rows: eda
            .purpose_by_duration
            .rows
            .iter()
            .map(|r| (r.purpose.clone(), r.cells.clone()))
            .collect(),
    }
    .write_svg(&path)?;
    written.push(path);

    tracing::info!(dir = %dir.display(), figures = written.len(), "Credit EDA figures written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::dataset::read_credit_from_reader;
    use crate::credit::eda::analyze;

    #[test]
    fn writes_all_ten_figures() {
        let csv = "age,sex,job,housing,saving_accounts,checking_account,credit_amount,duration,purpose,risk\n\
                   22,female,2,own,little,little,1000,6,car,bad\n\
                   30,male,1,own,,little,3000,18,car,good\n\
                   60,male,2,rent,little,,20000,48,radio/TV,bad\n";
        let eda = analyze(&read_credit_from_reader(csv.as_bytes()).unwrap()).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let written = write_credit_figures(&eda, dir.path()).unwrap();

        assert_eq!(written.len(), 10);
        for name in [
            OVERALL_CREDIT_RISK,
            BAD_RATE_BY_AGE_GROUP,
            BAD_RATE_BY_JOB,
            BAD_RATE_BY_HOUSING,
            BAD_RATE_BY_GENDER,
            CREDIT_AMOUNT_BY_RISK,
            DURATION_BY_RISK,
            BAD_RATE_BY_DURATION_GROUP,
            BAD_RATE_BY_PURPOSE,
            INTERACTION_DURATION_PURPOSE,
        ] {
            assert!(dir.path().join(name).is_file(), "missing {}", name);
        }

        let overall = std::fs::read_to_string(dir.path().join(OVERALL_CREDIT_RISK)).unwrap();
        assert_eq!(overall.matches(r#"class="bar""#).count(), 2);
        let purpose = std::fs::read_to_string(dir.path().join(BAD_RATE_BY_PURPOSE)).unwrap();
        assert!(purpose.contains("radio/TV"));
    }
}
