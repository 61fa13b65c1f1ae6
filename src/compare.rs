//! Cohort comparison
//!
//! Welch's unequal-variance t statistic between the PD and control cohorts
//! for one metric of the canonical table. The two-sided p-value uses the
//! normal approximation of the t distribution, which is adequate for the
//! sample sizes the table holds (hundreds to thousands of rows per cohort).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::MS_PER_SECOND;
use crate::error::SimError;
use crate::stats::{mean, sample_std};
use crate::types::{Cohort, KeystrokeObservation, Metric};

/// Significance threshold for the reported verdict
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Reported p-values are clamped into this range
const P_VALUE_BOUNDS: (f64, f64) = (0.0001, 0.9999);

/// Quantity compared between cohorts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMetric {
    /// Inter-key delay per observation, ms
    Delay,
    /// Hold duration per observation, ms
    Duration,
    /// Typing speed, one value per subject
    TypingSpeed,
}

/// Sample size, mean and standard deviation of one cohort
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub n: usize,
    pub mean: f64,
    pub std: f64,
}

/// Welch's t-test outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    /// Absolute t statistic
    pub t: f64,
    /// Welch–Satterthwaite degrees of freedom
    pub df: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Full PD vs control comparison for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortComparison {
    pub metric: CompareMetric,
    pub pd: GroupSummary,
    pub control: GroupSummary,
    pub test: WelchTest,
    pub significant: bool,
}

/// Standard normal CDF (Abramowitz & Stegun 26.2.17)
pub fn normal_cdf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989423 * (-x * x / 2.0).exp();
    let tail = d
        * t
        * (0.3193815 + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));
    if x > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Welch's t-test for two samples.
///
/// Samples with fewer than two values, or with no variance at all, carry no
/// evidence of a difference and yield p = 1 (clamped to the upper bound).
pub fn welch_t_test(a: &[f64], b: &[f64]) -> WelchTest {
    let no_evidence = WelchTest {
        t: 0.0,
        df: 0.0,
        p_value: P_VALUE_BOUNDS.1,
    };
    if a.len() < 2 || b.len() < 2 {
        return no_evidence;
    }

    let (Some(mean_a), Some(mean_b), Some(std_a), Some(std_b)) =
        (mean(a), mean(b), sample_std(a), sample_std(b))
    else {
        return no_evidence;
    };

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let se_a = std_a.powi(2) / n_a;
    let se_b = std_b.powi(2) / n_b;
    let denominator = (se_a + se_b).sqrt();
    if denominator == 0.0 {
        return no_evidence;
    }

    let t = ((mean_a - mean_b) / denominator).abs();
    let df = (se_a + se_b).powi(2) / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));
    let p_value = (2.0 * (1.0 - normal_cdf(t))).clamp(P_VALUE_BOUNDS.0, P_VALUE_BOUNDS.1);

    WelchTest { t, df, p_value }
}

/// Values of a metric for one cohort
fn cohort_values(rows: &[KeystrokeObservation], cohort: Cohort, metric: CompareMetric) -> Vec<f64> {
    let members = rows.iter().filter(|o| o.cohort() == cohort);
    match metric {
        CompareMetric::Delay => members.map(|o| o.metric(Metric::Delay) * MS_PER_SECOND).collect(),
        CompareMetric::Duration => members.map(|o| o.metric(Metric::Duration) * MS_PER_SECOND).collect(),
        CompareMetric::TypingSpeed => {
            let mut order = Vec::new();
            let mut per_subject: HashMap<&str, f64> = HashMap::new();
            for o in members {
                if !per_subject.contains_key(o.subject_id.as_str()) {
                    order.push(o.subject_id.as_str());
                    per_subject.insert(o.subject_id.as_str(), o.typing_speed);
                }
            }
            order.into_iter().map(|id| per_subject[id]).collect()
        }
    }
}

fn group_summary(cohort: Cohort, values: &[f64]) -> Result<GroupSummary, SimError> {
    match (mean(values), sample_std(values)) {
        (Some(mean), Some(std)) => Ok(GroupSummary {
            n: values.len(),
            mean,
            std,
        }),
        _ => Err(SimError::NoCohortData(cohort)),
    }
}

/// Compare the PD and control cohorts of the table on one metric
pub fn compare_cohorts(
    rows: &[KeystrokeObservation],
    metric: CompareMetric,
) -> Result<CohortComparison, SimError> {
    let pd_values = cohort_values(rows, Cohort::Pd, metric);
    let control_values = cohort_values(rows, Cohort::Control, metric);

    let pd = group_summary(Cohort::Pd, &pd_values)?;
    let control = group_summary(Cohort::Control, &control_values)?;
    let test = welch_t_test(&pd_values, &control_values);

    info!(?metric, t = test.t, p = test.p_value, "compared cohorts");

    Ok(CohortComparison {
        metric,
        pd,
        control,
        test,
        significant: test.p_value < SIGNIFICANCE_LEVEL,
    })
}
