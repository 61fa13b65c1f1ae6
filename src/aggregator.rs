//! Statistics aggregation
//!
//! Turns the canonical keystroke table into one three-tier timing model per
//! cohort: overall → category → per-key, plus the cohort's mean typing speed.
//! Input timings are seconds; every value written to the model is milliseconds.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::categories::{category_of, KeyCategory};
use crate::stats::{moments, summarize};
use crate::types::{
    CategoryStats, Cohort, CohortModels, KeyStats, KeystrokeObservation, Metric, OverallStats,
    StatisticalModel,
};

/// Seconds → milliseconds
pub(crate) const MS_PER_SECOND: f64 = 1000.0;

/// A key needs strictly more observations than this to get a per-key entry
pub const MIN_KEY_OBSERVATIONS: usize = 5;

/// Aggregator for building cohort timing models
pub struct Aggregator;

impl Aggregator {
    /// Partition the table by cohort and build a model for each partition
    pub fn build(observations: &[KeystrokeObservation]) -> CohortModels {
        let (pd, control): (Vec<&KeystrokeObservation>, Vec<&KeystrokeObservation>) =
            observations.iter().partition(|o| o.has_parkinsons);

        CohortModels {
            pd: Self::build_cohort(Cohort::Pd, &pd),
            control: Self::build_cohort(Cohort::Control, &control),
        }
    }

    /// Build the model of a single cohort's observations
    pub fn build_cohort(cohort: Cohort, rows: &[&KeystrokeObservation]) -> StatisticalModel {
        if rows.is_empty() {
            warn!(%cohort, "no observations for cohort, model tiers left empty");
            return StatisticalModel::default();
        }

        let model = StatisticalModel {
            overall: compute_overall(rows),
            per_key: compute_per_key(rows),
            categories: compute_categories(rows),
            avg_typing_speed: compute_avg_typing_speed(rows),
        };

        info!(
            %cohort,
            observations = rows.len(),
            keys = model.per_key.len(),
            categories = model.categories.len(),
            "aggregated cohort model"
        );

        model
    }
}

/// Timing values of a metric, converted to milliseconds
fn millis(rows: &[&KeystrokeObservation], metric: Metric) -> Vec<f64> {
    rows.iter().map(|o| o.metric(metric) * MS_PER_SECOND).collect()
}

fn compute_overall(rows: &[&KeystrokeObservation]) -> Option<OverallStats> {
    Some(OverallStats {
        delay: summarize(&millis(rows, Metric::Delay))?,
        duration: summarize(&millis(rows, Metric::Duration))?,
    })
}

/// Group by exact key label, keep groups with enough support, emit lowercase keys.
///
/// Groups are visited in first-appearance order, so when two labels differ
/// only by case the later group's entry is the one kept.
fn compute_per_key(rows: &[&KeystrokeObservation]) -> BTreeMap<String, KeyStats> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&KeystrokeObservation>> = HashMap::new();

    for row in rows {
        let label = row.key.as_str();
        groups
            .entry(label)
            .or_insert_with(|| {
                order.push(label);
                Vec::new()
            })
            .push(row);
    }

    let mut per_key = BTreeMap::new();
    for label in order {
        let group = &groups[label];
        if group.len() <= MIN_KEY_OBSERVATIONS {
            debug!(key = label, count = group.len(), "skipping key with too few observations");
            continue;
        }

        let (Some(delay), Some(duration)) = (
            moments(&millis(group, Metric::Delay)),
            moments(&millis(group, Metric::Duration)),
        ) else {
            continue;
        };

        per_key.insert(
            label.to_lowercase(),
            KeyStats {
                delay,
                duration,
                count: group.len(),
            },
        );
    }

    per_key
}

fn compute_categories(rows: &[&KeystrokeObservation]) -> BTreeMap<KeyCategory, CategoryStats> {
    let mut categories = BTreeMap::new();

    for category in KeyCategory::ALL {
        let members: Vec<&KeystrokeObservation> = rows
            .iter()
            .copied()
            .filter(|o| category_of(&o.key) == Some(category))
            .collect();

        let (Some(delay), Some(duration)) = (
            moments(&millis(&members, Metric::Delay)),
            moments(&millis(&members, Metric::Duration)),
        ) else {
            continue;
        };

        categories.insert(category, CategoryStats { delay, duration });
    }

    categories
}

/// Mean over subjects of each subject's first reported typing speed.
///
/// Averaging per row would weight subjects by how much they typed.
fn compute_avg_typing_speed(rows: &[&KeystrokeObservation]) -> Option<f64> {
    let mut per_subject: HashMap<&str, f64> = HashMap::new();
    for row in rows {
        per_subject
            .entry(row.subject_id.as_str())
            .or_insert(row.typing_speed);
    }

    if per_subject.is_empty() {
        return None;
    }
    Some(per_subject.values().sum::<f64>() / per_subject.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obs(key: &str, delay: f64, duration: f64, subject: &str, pd: bool, speed: f64) -> KeystrokeObservation {
        KeystrokeObservation {
            key: key.to_string(),
            delay,
            duration,
            subject_id: subject.to_string(),
            has_parkinsons: pd,
            typing_speed: speed,
        }
    }

    fn sample_table() -> Vec<KeystrokeObservation> {
        let mut rows = Vec::new();
        // PD subject p1: six 'a' presses and two spaces
        for i in 0..6 {
            rows.push(obs("a", 0.20 + 0.01 * i as f64, 0.10, "p1", true, 120.0));
        }
        rows.push(obs("space", 0.30, 0.12, "p1", true, 120.0));
        rows.push(obs("space", 0.32, 0.14, "p1", true, 120.0));
        // PD subject p2: three 'b' presses and a shift
        for _ in 0..3 {
            rows.push(obs("b", 0.25, 0.11, "p2", true, 80.0));
        }
        rows.push(obs("Shift_L", 0.40, 0.20, "p2", true, 80.0));
        // Control subject c1
        for _ in 0..7 {
            rows.push(obs("e", 0.15, 0.08, "c1", false, 200.0));
        }
        rows
    }

    #[test]
    fn test_partition_by_cohort() {
        let models = Aggregator::build(&sample_table());

        assert!(models.pd.per_key.contains_key("a"));
        assert!(!models.pd.per_key.contains_key("e"));
        assert!(models.control.per_key.contains_key("e"));
        assert!(!models.control.per_key.contains_key("a"));
    }

    #[test]
    fn test_overall_converted_to_ms_and_bounded() {
        let models = Aggregator::build(&sample_table());

        for cohort in Cohort::ALL {
            let overall = models.get(cohort).overall.unwrap();
            for summary in [overall.delay, overall.duration] {
                assert!(summary.mean >= summary.min - 1e-9 && summary.mean <= summary.max + 1e-9);
                assert!(summary.percentiles.p25 <= summary.percentiles.p50);
                assert!(summary.percentiles.p50 <= summary.percentiles.p75);
            }
        }

        let control = models.control.overall.unwrap();
        assert!((control.delay.mean - 150.0).abs() < 1e-9);
        assert!((control.duration.min - 80.0).abs() < 1e-9);
        assert!(control.delay.std.abs() < 1e-9);
    }

    #[test]
    fn test_per_key_threshold_and_count() {
        let models = Aggregator::build(&sample_table());

        let a = models.pd.per_key["a"];
        assert_eq!(a.count, 6);
        assert!((a.delay.mean - 225.0).abs() < 1e-9);
        assert!((a.duration.mean - 100.0).abs() < 1e-9);

        // 3 observations of 'b', 2 of space, 1 of Shift_L: all below threshold
        assert!(!models.pd.per_key.contains_key("b"));
        assert!(!models.pd.per_key.contains_key("space"));
        assert!(!models.pd.per_key.contains_key("shift_l"));

        for stats in models.pd.per_key.values().chain(models.control.per_key.values()) {
            assert!(stats.count > MIN_KEY_OBSERVATIONS);
        }
    }

    #[test]
    fn test_exactly_five_is_excluded() {
        let rows: Vec<KeystrokeObservation> =
            (0..5).map(|_| obs("q", 0.2, 0.1, "c1", false, 100.0)).collect();
        let models = Aggregator::build(&rows);
        assert!(models.control.per_key.is_empty());
    }

    #[test]
    fn test_per_key_output_lowercased() {
        let rows: Vec<KeystrokeObservation> =
            (0..6).map(|_| obs("BackSpace", 0.3, 0.1, "c1", false, 100.0)).collect();
        let models = Aggregator::build(&rows);
        assert_eq!(models.control.per_key["backspace"].count, 6);
        assert!(models.control.categories.contains_key(&KeyCategory::Special));
    }

    #[test]
    fn test_categories_only_when_matched() {
        let models = Aggregator::build(&sample_table());

        let pd_categories: Vec<KeyCategory> = models.pd.categories.keys().copied().collect();
        assert_eq!(
            pd_categories,
            vec![KeyCategory::Letters, KeyCategory::Space, KeyCategory::Special]
        );

        let control_categories: Vec<KeyCategory> = models.control.categories.keys().copied().collect();
        assert_eq!(control_categories, vec![KeyCategory::Letters]);

        let space = models.pd.categories[&KeyCategory::Space];
        assert!((space.delay.mean - 310.0).abs() < 1e-9);
        assert!((space.duration.mean - 130.0).abs() < 1e-9);

        // Single Shift_L row: std is zero rather than NaN
        let special = models.pd.categories[&KeyCategory::Special];
        assert_eq!(special.delay.std, 0.0);
    }

    #[test]
    fn test_avg_typing_speed_is_per_subject() {
        let models = Aggregator::build(&sample_table());
        // p1 = 120 (8 rows), p2 = 80 (4 rows): per-subject mean is 100
        assert!((models.pd.avg_typing_speed.unwrap() - 100.0).abs() < 1e-9);

        // Adding keystrokes for p1 must not move the average
        let mut more = sample_table();
        for _ in 0..50 {
            more.push(obs("a", 0.2, 0.1, "p1", true, 120.0));
        }
        let models = Aggregator::build(&more);
        assert!((models.pd.avg_typing_speed.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cohort_yields_empty_model() {
        let rows: Vec<KeystrokeObservation> =
            (0..6).map(|_| obs("a", 0.2, 0.1, "c1", false, 100.0)).collect();
        let models = Aggregator::build(&rows);

        assert!(models.pd.is_empty());
        assert!(models.pd.overall.is_none());
        assert!(models.pd.avg_typing_speed.is_none());
        assert!(!models.control.is_empty());
    }

    #[test]
    fn test_empty_table() {
        let models = Aggregator::build(&[]);
        assert_eq!(models, CohortModels::default());
    }
}
