use std::path::{Path, PathBuf};
use std::process::ExitCode;

use abscope::credit::{self, figures};
use abscope::experiments::{self, analysis};
use abscope::report;
use abscope::{AbscopeError, Alternative, AnalysisConfig, GroupSummary, TestConfig};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "abscope", version, about = "Conversion A/B tests and credit-risk EDA")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean a visit log, compare conversion rates and run the z-test
    AbTest {
        /// Visit log CSV (user_id, timestamp, group, landing_page, converted)
        #[arg(long, env = "ABSCOPE_DATA")]
        data: PathBuf,
        /// JSON analysis config; defaults to control/old_page vs treatment/new_page
        #[arg(long, env = "ABSCOPE_CONFIG")]
        config: Option<PathBuf>,
        /// Significance level, overrides the config file
        #[arg(long, env = "ABSCOPE_ALPHA")]
        alpha: Option<f64>,
        /// greater | less | two-sided, overrides the config file
        #[arg(long, env = "ABSCOPE_ALTERNATIVE")]
        alternative: Option<Alternative>,
        #[arg(long, env = "ABSCOPE_FIGURES_DIR", default_value = "figures")]
        figures_dir: PathBuf,
        /// Print the full outcome as JSON instead of the text report
        #[arg(long, env = "ABSCOPE_JSON")]
        json: bool,
        #[arg(long, env = "ABSCOPE_NO_CHART")]
        no_chart: bool,
    },
    /// Run the z-test on explicit counts
    Ztest {
        #[arg(long, env = "ABSCOPE_CONTROL_TRIALS")]
        control_trials: u64,
        #[arg(long, env = "ABSCOPE_CONTROL_SUCCESSES")]
        control_successes: u64,
        #[arg(long, env = "ABSCOPE_TREATMENT_TRIALS")]
        treatment_trials: u64,
        #[arg(long, env = "ABSCOPE_TREATMENT_SUCCESSES")]
        treatment_successes: u64,
        #[arg(long, env = "ABSCOPE_ALPHA", default_value_t = 0.05)]
        alpha: f64,
        #[arg(long, env = "ABSCOPE_ALTERNATIVE", default_value = "greater")]
        alternative: Alternative,
        #[arg(long, env = "ABSCOPE_JSON")]
        json: bool,
    },
    /// Exploratory analysis of a credit-risk customer table
    Credit {
        #[arg(long, env = "ABSCOPE_DATA")]
        data: PathBuf,
        #[arg(long, env = "ABSCOPE_FIGURES_DIR", default_value = "figures/eda")]
        figures_dir: PathBuf,
        #[arg(long, env = "ABSCOPE_RESULTS_DIR", default_value = "results")]
        results_dir: PathBuf,
        #[arg(long, env = "ABSCOPE_JSON")]
        json: bool,
        #[arg(long, env = "ABSCOPE_NO_CHART")]
        no_chart: bool,
    },
}

fn main() -> ExitCode {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Command::AbTest {
            data,
            config,
            alpha,
            alternative,
            figures_dir,
            json,
            no_chart,
        } => run_ab_test(
            &data,
            config.as_deref(),
            alpha,
            alternative,
            (!no_chart).then_some(figures_dir.as_path()),
            json,
        ),
        Command::Ztest {
            control_trials,
            control_successes,
            treatment_trials,
            treatment_successes,
            alpha,
            alternative,
            json,
        } => run_ztest(
            GroupSummary::new("control", control_trials, control_successes),
            GroupSummary::new("treatment", treatment_trials, treatment_successes),
            TestConfig { alpha, alternative },
            json,
        ),
        Command::Credit {
            data,
            figures_dir,
            results_dir,
            json,
            no_chart,
        } => run_credit(
            &data,
            (!no_chart).then_some(figures_dir.as_path()),
            &results_dir,
            json,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run_ab_test(
    data: &Path,
    config_path: Option<&Path>,
    alpha: Option<f64>,
    alternative: Option<Alternative>,
    figures_dir: Option<&Path>,
    json: bool,
) -> Result<(), AbscopeError> {
    let mut config = match config_path {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(alpha) = alpha {
        config.test.alpha = alpha;
    }
    if let Some(alternative) = alternative {
        config.test.alternative = alternative;
    }
    tracing::info!(
        data = %data.display(),
        alpha = config.test.alpha,
        alternative = %config.test.alternative,
        "Running A/B test analysis"
    );

    let outcome = experiments::run_ab_test(data, &config)?;
    let chart = match figures_dir {
        Some(dir) => Some(analysis::write_conversion_chart(&outcome, dir)?),
        None => None,
    };

    if json {
        println!("{}", report::to_json(&outcome)?);
    } else {
        print!("{}", report::render_ab_report(&outcome));
        if let Some(path) = chart {
            println!("\nFigure saved to: {}", path.display());
        }
    }
    Ok(())
}

fn run_ztest(
    control: GroupSummary,
    treatment: GroupSummary,
    config: TestConfig,
    json: bool,
) -> Result<(), AbscopeError> {
    config.validate()?;
    let result = abscope::two_proportion_z_test(&control, &treatment, &config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", report::render_conversion_summary(&control, &treatment));
        println!();
        print!("{}", report::render_test_result(&result));
        println!();
        print!("{}", report::render_conclusion(&result));
    }
    Ok(())
}

fn run_credit(
    data: &Path,
    figures_dir: Option<&Path>,
    results_dir: &Path,
    json: bool,
) -> Result<(), AbscopeError> {
    tracing::info!(data = %data.display(), "Running credit EDA");
    let eda = credit::run_credit_eda(data)?;
    let figures = match figures_dir {
        Some(dir) => figures::write_credit_figures(&eda, dir)?,
        None => Vec::new(),
    };
    let summary = report::write_eda_summary(&eda, results_dir)?;

    if json {
        println!("{}", report::to_json(&eda)?);
    } else {
        print!("{}", report::render_credit_report(&eda));
        if let Some(dir) = figures_dir {
            println!("\nEDA plots saved to: {}/ ({} files)", dir.display(), figures.len());
        }
        println!("Summary saved to: {}", summary.display());
    }
    Ok(())
}
