use serde::{Deserialize, Serialize};

use super::config::TestConfig;

// ── Input / Result Structs ──────────────────────────────────────────

/// Trial and success counts for one arm of an experiment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub label: String,
    pub trial_count: u64,
    pub success_count: u64,
}

impl GroupSummary {
    pub fn new(label: impl Into<String>, trial_count: u64, success_count: u64) -> Self {
        Self {
            label: label.into(),
            trial_count,
            success_count,
        }
    }

    /// `success_count / trial_count`, or 0.0 for an empty arm.
    pub fn observed_rate(&self) -> f64 {
        if self.trial_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.trial_count as f64
        }
    }

    pub fn validate(&self) -> Result<(), TestError> {
        if self.trial_count == 0 {
            return Err(TestError::InvalidInput(format!(
                "arm '{}': trial_count must be > 0",
                self.label
            )));
        }
        if self.success_count > self.trial_count {
            return Err(TestError::InvalidInput(format!(
                "arm '{}': success_count {} exceeds trial_count {}",
                self.label, self.success_count, self.trial_count
            )));
        }
        Ok(())
    }
}

/// Direction of the alternative hypothesis, stated for arm B relative to arm A.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// H1: rate_B > rate_A (right-tailed).
    #[default]
    Greater,
    /// H1: rate_B < rate_A (left-tailed).
    Less,
    /// H1: rate_B != rate_A.
    TwoSided,
}

impl std::fmt::Display for Alternative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Alternative::Greater => "greater",
            Alternative::Less => "less",
            Alternative::TwoSided => "two-sided",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Alternative {
    type Err = super::config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greater" | "right" | "right-tailed" => Ok(Alternative::Greater),
            "less" | "left" | "left-tailed" => Ok(Alternative::Less),
            "two-sided" | "two_sided" | "both" => Ok(Alternative::TwoSided),
            other => Err(super::config::ConfigError::Invalid(format!(
                "unknown alternative '{}': expected greater, less or two-sided",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

/// Outcome of a pooled two-proportion z-test. Computed once, never revised.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub rate_a: f64,
    pub rate_b: f64,
    pub pooled_rate: f64,
    pub standard_error: f64,
    pub z_score: f64,
    pub p_value: f64,
    pub alpha: f64,
    pub alternative: Alternative,
    pub z_critical: f64,
    /// true when the null hypothesis is rejected (`p_value < alpha`).
    pub decision: bool,
    pub absolute_lift: f64,
    /// None when arm A has a zero rate.
    pub relative_lift: Option<f64>,
    /// Unpooled Wald interval for `rate_b - rate_a` at level `1 - alpha`.
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("degenerate variance: pooled rate is {pooled_rate}, standard error is zero")]
    DegenerateVariance { pooled_rate: f64 },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleRatioCheck {
    pub chi_square: f64,
    pub p_value: f64,
    pub mismatch: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SampleSizeEstimate {
    pub per_arm: u64,
    pub total: u64,
}

// ── Normal Distribution ─────────────────────────────────────────────

const FRAC_1_SQRT_PI: f64 = 0.564_189_583_547_756_3;

/// Complementary error function, absolute error around 1e-15.
///
/// Below 3.0 the all-positive series for erf is summed (no cancellation);
/// above, the Laplace continued fraction is evaluated with modified Lentz.
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    if x < 3.0 {
        1.0 - erf_series(x)
    } else {
        erfc_continued_fraction(x)
    }
}

/// erf(x) = 2/sqrt(pi) * exp(-x^2) * sum_n (2x^2)^n * x / (1*3*...*(2n+1))
fn erf_series(x: f64) -> f64 {
    const MAX_TERMS: u32 = 500;

    let two_x2 = 2.0 * x * x;
    let mut term = x;
    let mut sum = x;
    for n in 1..=MAX_TERMS {
        term *= two_x2 / (2 * n + 1) as f64;
        sum += term;
        if term.abs() <= sum.abs() * f64::EPSILON {
            break;
        }
    }
    2.0 * FRAC_1_SQRT_PI * (-x * x).exp() * sum
}

/// erfc(x) = exp(-x^2)/sqrt(pi) * 1/(x + (1/2)/(x + 1/(x + (3/2)/(x + ...))))
fn erfc_continued_fraction(x: f64) -> f64 {
    const MAX_ITERS: u32 = 1000;
    const TINY: f64 = 1.0e-300;

    let mut f = x;
    let mut c = f;
    let mut d = 0.0;
    for k in 1..=MAX_ITERS {
        let a = k as f64 / 2.0;
        d = x + a * d;
        if d.abs() < TINY {
            d = TINY;
        }
        d = 1.0 / d;
        c = x + a / c;
        if c.abs() < TINY {
            c = TINY;
        }
        let delta = c * d;
        f *= delta;
        if (delta - 1.0).abs() < 1.0e-16 {
            break;
        }
    }
    (-x * x).exp() * FRAC_1_SQRT_PI / f
}

/// P(Z <= z) for the standard normal distribution.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// P(Z > z) for the standard normal distribution. Exactly 0.5 at z = 0.
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Inverse normal CDF: returns z such that P(Z < z) = p.
///
/// Acklam's rational approximation (relative error ~1e-9) followed by one
/// Halley step against `normal_cdf`, which brings it to ~1e-15 in the body.
pub fn normal_quantile(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let x = acklam_quantile(p);
    let e = normal_cdf(x) - p;
    let u = e * (2.0 * std::f64::consts::PI).sqrt() * (x * x / 2.0).exp();
    x - u / (1.0 + x * u / 2.0)
}

#[allow(clippy::excessive_precision)]
fn acklam_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    // Horner's method for the tail and central rational functions
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

// ── Pooled Two-Proportion Z-Test ────────────────────────────────────

/// Pooled two-proportion z-test of arm B against arm A.
///
/// The z-score is `(rate_b - rate_a) / se` where `se` uses the pooled rate
/// under H0. With the default `Alternative::Greater` the p-value is the
/// upper tail `1 - Phi(z)`.
pub fn two_proportion_z_test(
    a: &GroupSummary,
    b: &GroupSummary,
    config: &TestConfig,
) -> Result<TestResult, TestError> {
    a.validate()?;
    b.validate()?;
    let alpha = config.alpha;
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(TestError::InvalidInput(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }

    let n_a = a.trial_count as f64;
    let n_b = b.trial_count as f64;
    let rate_a = a.observed_rate();
    let rate_b = b.observed_rate();

    // Summed as f64: two u64 counts near the top of the range overflow
    let pooled_rate = (a.success_count as f64 + b.success_count as f64) / (n_a + n_b);
    let standard_error = (pooled_rate * (1.0 - pooled_rate) * (1.0 / n_a + 1.0 / n_b)).sqrt();
    if standard_error == 0.0 {
        return Err(TestError::DegenerateVariance { pooled_rate });
    }

    let z_score = (rate_b - rate_a) / standard_error;
    let (p_value, z_critical) = match config.alternative {
        Alternative::Greater => (normal_sf(z_score), normal_quantile(1.0 - alpha)),
        Alternative::Less => (normal_cdf(z_score), normal_quantile(alpha)),
        Alternative::TwoSided => (
            (2.0 * normal_sf(z_score.abs())).min(1.0),
            normal_quantile(1.0 - alpha / 2.0),
        ),
    };

    let absolute_lift = rate_b - rate_a;
    let relative_lift = if rate_a != 0.0 {
        Some(absolute_lift / rate_a)
    } else {
        None
    };

    let unpooled_se = (rate_a * (1.0 - rate_a) / n_a + rate_b * (1.0 - rate_b) / n_b).sqrt();
    let margin = normal_quantile(1.0 - alpha / 2.0) * unpooled_se;

    Ok(TestResult {
        rate_a,
        rate_b,
        pooled_rate,
        standard_error,
        z_score,
        p_value,
        alpha,
        alternative: config.alternative,
        z_critical,
        decision: p_value < alpha,
        absolute_lift,
        relative_lift,
        confidence_interval: ConfidenceInterval {
            lower: absolute_lift - margin,
            upper: absolute_lift + margin,
            level: 1.0 - alpha,
        },
    })
}

// ── SRM Detection ───────────────────────────────────────────────────

/// Chi-squared test for sample ratio mismatch.
/// Flags a mismatch when chi2 > 6.635 (p=0.01 threshold, 1 dof).
pub fn check_sample_ratio_mismatch(
    control_n: u64,
    treatment_n: u64,
    expected_treatment_fraction: f64,
) -> SampleRatioCheck {
    let no_mismatch = SampleRatioCheck {
        chi_square: 0.0,
        p_value: 1.0,
        mismatch: false,
    };

    let total = control_n as f64 + treatment_n as f64;
    if total == 0.0 {
        return no_mismatch;
    }
    let expected_control = total * (1.0 - expected_treatment_fraction);
    let expected_treatment = total * expected_treatment_fraction;

    if expected_control <= 0.0 || expected_treatment <= 0.0 {
        return no_mismatch;
    }

    let chi_square = (control_n as f64 - expected_control).powi(2) / expected_control
        + (treatment_n as f64 - expected_treatment).powi(2) / expected_treatment;

    SampleRatioCheck {
        chi_square,
        // chi2 with one degree of freedom is the square of a standard normal
        p_value: 2.0 * normal_sf(chi_square.sqrt()),
        mismatch: chi_square > 6.635,
    }
}

// ── Sample Size Estimator ───────────────────────────────────────────

/// Two-proportion power analysis for sample size estimation.
/// Returns per-arm sample size needed to detect relative MDE at given power/alpha
/// (two-sided alpha).
pub fn required_sample_size(
    baseline_rate: f64,
    relative_mde: f64,
    alpha: f64,
    power: f64,
    traffic_split: f64,
) -> Result<SampleSizeEstimate, TestError> {
    let open_unit = |name: &str, v: f64| {
        if v > 0.0 && v < 1.0 {
            Ok(())
        } else {
            Err(TestError::InvalidInput(format!(
                "{} must be in (0, 1), got {}",
                name, v
            )))
        }
    };
    open_unit("baseline_rate", baseline_rate)?;
    open_unit("alpha", alpha)?;
    open_unit("power", power)?;
    open_unit("traffic_split", traffic_split)?;

    let p1 = baseline_rate;
    let p2 = baseline_rate * (1.0 + relative_mde);
    if !(0.0..=1.0).contains(&p2) {
        return Err(TestError::InvalidInput(format!(
            "baseline_rate * (1 + relative_mde) = {} is not a probability",
            p2
        )));
    }
    let delta = (p2 - p1).abs();

    if delta == 0.0 {
        return Ok(SampleSizeEstimate {
            per_arm: u64::MAX,
            total: u64::MAX,
        });
    }

    let z_alpha = normal_quantile(1.0 - alpha / 2.0);
    let z_power = normal_quantile(power);

    let p_bar = (p1 + p2) / 2.0;

    // n = (z_alpha * sqrt(2*p_bar*(1-p_bar)) + z_power * sqrt(p1*(1-p1) + p2*(1-p2)))^2 / delta^2
    let numerator = z_alpha * (2.0 * p_bar * (1.0 - p_bar)).sqrt()
        + z_power * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt();
    let per_arm = (numerator.powi(2) / delta.powi(2)).ceil();

    // If split != 0.5, the smaller arm needs more total traffic
    let split_factor = 1.0 / (traffic_split * (1.0 - traffic_split) * 4.0);
    let adjusted_per_arm = (per_arm * split_factor).ceil() as u64;

    Ok(SampleSizeEstimate {
        per_arm: adjusted_per_arm,
        total: adjusted_per_arm.saturating_mul(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greater(alpha: f64) -> TestConfig {
        TestConfig {
            alpha,
            alternative: Alternative::Greater,
        }
    }

    // ── Normal distribution ─────────────────────────────────────────

    #[test]
    fn normal_sf_at_z196_matches_table() {
        let sf = normal_sf(1.96);
        assert!((sf - 0.024997895148220435).abs() < 1e-12, "sf={}", sf);
    }

    #[test]
    fn normal_sf_at_z0_is_exactly_half() {
        assert_eq!(normal_sf(0.0), 0.5);
        assert_eq!(normal_cdf(0.0), 0.5);
    }

    #[test]
    fn normal_sf_far_tail_keeps_relative_precision() {
        let sf = normal_sf(5.0);
        let expected = 2.866515718791939e-7;
        assert!(((sf - expected) / expected).abs() < 1e-9, "sf={}", sf);
    }

    #[test]
    fn normal_cdf_and_sf_sum_to_one() {
        for z in [-4.0, -1.5, -0.2, 0.7, 2.9, 3.1, 6.0] {
            let total = normal_cdf(z) + normal_sf(z);
            assert!((total - 1.0).abs() < 1e-14, "z={} total={}", z, total);
        }
    }

    #[test]
    fn normal_cdf_negative_one() {
        assert!((normal_cdf(-1.0) - 0.15865525393145707).abs() < 1e-12);
    }

    #[test]
    fn erfc_is_continuous_across_branch_switch() {
        let below = erfc(3.0 - 1e-12);
        let at = erfc(3.0);
        assert!((below - at).abs() < 1e-14, "below={} at={}", below, at);
    }

    #[test]
    fn quantile_matches_known_critical_values() {
        assert!((normal_quantile(0.95) - 1.6448536269514722).abs() < 1e-9);
        assert!((normal_quantile(0.975) - 1.959963984540054).abs() < 1e-9);
        assert!((normal_quantile(0.995) - 2.5758293035489004).abs() < 1e-9);
        assert!((normal_quantile(0.05) + 1.6448536269514722).abs() < 1e-9);
    }

    #[test]
    fn quantile_inverts_cdf() {
        for p in [1e-8, 0.001, 0.3, 0.5, 0.8, 0.999] {
            let z = normal_quantile(p);
            assert!((normal_cdf(z) - p).abs() < 1e-12 * p.max(1e-3), "p={}", p);
        }
    }

    #[test]
    fn quantile_endpoints_and_out_of_range() {
        assert_eq!(normal_quantile(0.0), f64::NEG_INFINITY);
        assert_eq!(normal_quantile(1.0), f64::INFINITY);
        assert!(normal_quantile(1.5).is_nan());
        assert!(normal_quantile(-0.1).is_nan());
    }

    // ── Z-test ──────────────────────────────────────────────────────

    #[test]
    fn worked_example_rejects_null() {
        let a = GroupSummary::new("control", 10_000, 1_000);
        let b = GroupSummary::new("treatment", 10_000, 1_200);
        let r = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap();
        assert!((r.rate_a - 0.10).abs() < 1e-12);
        assert!((r.rate_b - 0.12).abs() < 1e-12);
        assert!((r.pooled_rate - 0.11).abs() < 1e-12);
        assert!((r.standard_error - 0.004425).abs() < 1e-5, "se={}", r.standard_error);
        assert!((r.z_score - 4.52).abs() < 0.01, "z={}", r.z_score);
        assert!(r.p_value > 2.5e-6 && r.p_value < 3.5e-6, "p={}", r.p_value);
        assert!(r.decision);
        assert!((r.z_critical - 1.6448536269514722).abs() < 1e-9);
    }

    #[test]
    fn equal_rates_give_zero_z_and_half_p() {
        let a = GroupSummary::new("control", 4_000, 480);
        let b = GroupSummary::new("treatment", 2_000, 240);
        let r = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap();
        assert_eq!(r.z_score, 0.0);
        assert_eq!(r.p_value, 0.5);
        assert!(!r.decision);
    }

    #[test]
    fn both_arms_zero_successes_is_degenerate() {
        let a = GroupSummary::new("control", 100, 0);
        let b = GroupSummary::new("treatment", 50, 0);
        let err = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap_err();
        assert!(matches!(err, TestError::DegenerateVariance { .. }));
    }

    #[test]
    fn both_arms_all_successes_is_degenerate() {
        let a = GroupSummary::new("control", 100, 100);
        let b = GroupSummary::new("treatment", 50, 50);
        let err = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap_err();
        assert_eq!(err, TestError::DegenerateVariance { pooled_rate: 1.0 });
    }

    #[test]
    fn success_above_trials_is_invalid_input() {
        let a = GroupSummary::new("control", 10, 11);
        let b = GroupSummary::new("treatment", 10, 5);
        let err = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap_err();
        assert!(matches!(err, TestError::InvalidInput(_)));
    }

    #[test]
    fn zero_trials_is_invalid_input() {
        let a = GroupSummary::new("control", 10, 1);
        let b = GroupSummary::new("treatment", 0, 0);
        let err = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap_err();
        assert!(matches!(err, TestError::InvalidInput(_)));
    }

    #[test]
    fn alpha_outside_unit_interval_is_invalid_input() {
        let a = GroupSummary::new("control", 10, 1);
        let b = GroupSummary::new("treatment", 10, 2);
        for alpha in [0.0, 1.0, -0.1, f64::NAN] {
            let err = two_proportion_z_test(&a, &b, &greater(alpha)).unwrap_err();
            assert!(matches!(err, TestError::InvalidInput(_)), "alpha={}", alpha);
        }
    }

    #[test]
    fn counts_near_u64_max_do_not_overflow() {
        let half = u64::MAX / 2 + 1;
        let r = two_proportion_z_test(
            &GroupSummary::new("control", u64::MAX, half),
            &GroupSummary::new("treatment", u64::MAX, half),
            &greater(0.05),
        )
        .unwrap();
        assert!((r.pooled_rate - 0.5).abs() < 1e-12);
        assert!(r.standard_error > 0.0);
        assert_eq!(r.z_score, 0.0);
        assert_eq!(r.p_value, 0.5);
        assert!(!r.decision);
    }

    #[test]
    fn two_sided_p_doubles_the_smaller_tail() {
        let a = GroupSummary::new("control", 5_000, 500);
        let b = GroupSummary::new("treatment", 5_000, 540);
        let one = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap();
        let two = two_proportion_z_test(
            &a,
            &b,
            &TestConfig {
                alpha: 0.05,
                alternative: Alternative::TwoSided,
            },
        )
        .unwrap();
        assert!((two.p_value - 2.0 * one.p_value).abs() < 1e-12);
        assert!((two.z_critical - 1.959963984540054).abs() < 1e-9);
    }

    #[test]
    fn less_alternative_uses_lower_tail() {
        let a = GroupSummary::new("control", 5_000, 600);
        let b = GroupSummary::new("treatment", 5_000, 500);
        let r = two_proportion_z_test(
            &a,
            &b,
            &TestConfig {
                alpha: 0.05,
                alternative: Alternative::Less,
            },
        )
        .unwrap();
        assert!(r.z_score < 0.0);
        assert!(r.decision, "p={}", r.p_value);
        assert!(r.z_critical < 0.0);
    }

    #[test]
    fn relative_lift_absent_when_control_rate_is_zero() {
        let a = GroupSummary::new("control", 100, 0);
        let b = GroupSummary::new("treatment", 100, 5);
        let r = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap();
        assert!(r.relative_lift.is_none());
        assert!((r.absolute_lift - 0.05).abs() < 1e-12);
    }

    #[test]
    fn confidence_interval_brackets_observed_difference() {
        let a = GroupSummary::new("control", 10_000, 1_000);
        let b = GroupSummary::new("treatment", 10_000, 1_200);
        let r = two_proportion_z_test(&a, &b, &greater(0.05)).unwrap();
        let ci = r.confidence_interval;
        assert!(ci.lower < r.absolute_lift && r.absolute_lift < ci.upper);
        assert!(ci.lower > 0.0, "ci={:?}", ci);
        assert!((ci.level - 0.95).abs() < 1e-12);
    }

    #[test]
    fn alternative_parses_and_displays() {
        assert_eq!("greater".parse::<Alternative>().unwrap(), Alternative::Greater);
        assert_eq!("Two-Sided".parse::<Alternative>().unwrap(), Alternative::TwoSided);
        assert_eq!("left".parse::<Alternative>().unwrap(), Alternative::Less);
        assert!("sideways".parse::<Alternative>().is_err());
        assert_eq!(Alternative::TwoSided.to_string(), "two-sided");
    }

    // ── SRM Detection ───────────────────────────────────────────────

    #[test]
    fn srm_not_detected_for_perfect_50_50() {
        let check = check_sample_ratio_mismatch(5000, 5000, 0.5);
        assert!(!check.mismatch);
        assert_eq!(check.p_value, 1.0);
    }

    #[test]
    fn srm_detected_for_45_55_split_at_large_n() {
        assert!(check_sample_ratio_mismatch(45000, 55000, 0.5).mismatch);
    }

    #[test]
    fn srm_threshold_is_p_001_not_p_005() {
        // chi2 = 4.0 → p ≈ 0.0455, not flagged at p=0.01
        let check = check_sample_ratio_mismatch(4900, 5100, 0.5);
        assert!(!check.mismatch);
        assert!((check.p_value - 0.0455).abs() < 1e-3, "p={}", check.p_value);
        // chi2 = 64.0
        assert!(check_sample_ratio_mismatch(4600, 5400, 0.5).mismatch);
    }

    #[test]
    fn srm_counts_near_u64_max_do_not_overflow() {
        let check = check_sample_ratio_mismatch(u64::MAX, u64::MAX, 0.5);
        assert_eq!(check.chi_square, 0.0);
        assert!(!check.mismatch);
    }

    #[test]
    fn srm_empty_arms_do_not_flag() {
        assert!(!check_sample_ratio_mismatch(0, 0, 0.5).mismatch);
        assert!(!check_sample_ratio_mismatch(10, 10, 0.0).mismatch);
    }

    // ── Sample Size Estimator ───────────────────────────────────────

    #[test]
    fn sample_size_baseline_0_12_mde_0_05_power_80_alpha_05() {
        let est = required_sample_size(0.12, 0.05, 0.05, 0.80, 0.5).unwrap();
        assert!(
            est.per_arm > 40_000 && est.per_arm < 65_000,
            "per_arm={}",
            est.per_arm
        );
        assert_eq!(est.total, est.per_arm * 2);
    }

    #[test]
    fn sample_size_larger_mde_needs_fewer_samples() {
        let small = required_sample_size(0.12, 0.05, 0.05, 0.80, 0.5).unwrap();
        let large = required_sample_size(0.12, 0.10, 0.05, 0.80, 0.5).unwrap();
        assert!(large.per_arm < small.per_arm);
    }

    #[test]
    fn sample_size_higher_power_requires_more_samples() {
        let est_80 = required_sample_size(0.12, 0.05, 0.05, 0.80, 0.5).unwrap();
        let est_90 = required_sample_size(0.12, 0.05, 0.05, 0.90, 0.5).unwrap();
        assert!(est_90.per_arm > est_80.per_arm);
    }

    #[test]
    fn sample_size_uneven_split_needs_more_per_arm() {
        let even = required_sample_size(0.12, 0.05, 0.05, 0.80, 0.5).unwrap();
        let skewed = required_sample_size(0.12, 0.05, 0.05, 0.80, 0.2).unwrap();
        assert!(skewed.per_arm > even.per_arm);
    }

    #[test]
    fn sample_size_zero_mde_is_unbounded() {
        let est = required_sample_size(0.12, 0.0, 0.05, 0.80, 0.5).unwrap();
        assert_eq!(est.per_arm, u64::MAX);
    }

    #[test]
    fn sample_size_rejects_bad_arguments() {
        assert!(required_sample_size(0.0, 0.05, 0.05, 0.8, 0.5).is_err());
        assert!(required_sample_size(0.12, 0.05, 1.0, 0.8, 0.5).is_err());
        assert!(required_sample_size(0.6, 1.0, 0.05, 0.8, 0.5).is_err());
    }
}
