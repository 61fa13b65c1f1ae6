//! Core data types for Keystroke Flux
//!
//! These types flow through the two stages of the crate:
//! canonical keystroke table → statistical model → synthetic key events.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::categories::KeyCategory;

/// Subject cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    /// Parkinson's-disease subjects
    Pd,
    /// Control subjects
    Control,
}

impl Cohort {
    /// Both cohorts, PD first (matches the order of the model document)
    pub const ALL: [Cohort; 2] = [Cohort::Pd, Cohort::Control];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cohort::Pd => "pd",
            Cohort::Control => "control",
        }
    }

    /// Cohort for a ground-truth flag
    pub fn from_flag(has_parkinsons: bool) -> Self {
        if has_parkinsons {
            Cohort::Pd
        } else {
            Cohort::Control
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing quantity carried by every observation and every model tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Time since the previous key press
    Delay,
    /// Time the key was held down
    Duration,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Delay => f.write_str("delay"),
            Metric::Duration => f.write_str("duration"),
        }
    }
}

/// One row of the canonical keystroke table produced by the ingestion pipeline.
///
/// Timings are in seconds. Extra columns in the input (`updrs108`, `press_0`,
/// `file_1`, ...) are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeObservation {
    /// Symbolic key name (`a`..`z`, `space`, `Shift_L`, ...)
    pub key: String,
    /// Seconds since the previous key press in the same session
    pub delay: f64,
    /// Seconds the key was held
    pub duration: f64,
    /// Subject identifier
    #[serde(rename = "pID", deserialize_with = "de_subject_id")]
    pub subject_id: String,
    /// Ground-truth cohort flag
    #[serde(deserialize_with = "de_flag")]
    pub has_parkinsons: bool,
    /// Subject-level typing speed, constant per subject
    #[serde(rename = "typingSpeed")]
    pub typing_speed: f64,
}

impl KeystrokeObservation {
    pub fn cohort(&self) -> Cohort {
        Cohort::from_flag(self.has_parkinsons)
    }

    /// Value of a timing metric in seconds
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Delay => self.delay,
            Metric::Duration => self.duration,
        }
    }
}

/// Subject ids arrive as strings or numbers depending on the export
fn de_subject_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(s) => s,
        Repr::Int(i) => i.to_string(),
        Repr::Float(f) => f.to_string(),
    })
}

/// Cohort flags arrive as booleans, 0/1, or the strings "True"/"False"
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Bool(b) => Ok(b),
        Repr::Int(i) => Ok(i != 0),
        Repr::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid has_parkinsons value: {other}"
            ))),
        },
    }
}

/// Mean and standard deviation of a metric, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub mean: f64,
    pub std: f64,
}

/// 25th / 50th / 75th percentiles, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    #[serde(rename = "25")]
    pub p25: f64,
    #[serde(rename = "50")]
    pub p50: f64,
    #[serde(rename = "75")]
    pub p75: f64,
}

/// Full distribution summary used by the overall tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Percentiles,
}

impl DistributionSummary {
    pub fn moments(&self) -> Moments {
        Moments {
            mean: self.mean,
            std: self.std,
        }
    }
}

/// Overall tier: every observation of the cohort
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub delay: DistributionSummary,
    pub duration: DistributionSummary,
}

impl OverallStats {
    pub fn moments(&self, metric: Metric) -> Moments {
        match metric {
            Metric::Delay => self.delay.moments(),
            Metric::Duration => self.duration.moments(),
        }
    }
}

/// Category tier entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub delay: Moments,
    pub duration: Moments,
}

impl CategoryStats {
    pub fn moments(&self, metric: Metric) -> Moments {
        match metric {
            Metric::Delay => self.delay,
            Metric::Duration => self.duration,
        }
    }
}

/// Per-key tier entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyStats {
    pub delay: Moments,
    pub duration: Moments,
    /// Number of observations behind this entry (always > 5)
    pub count: usize,
}

impl KeyStats {
    pub fn moments(&self, metric: Metric) -> Moments {
        match metric {
            Metric::Delay => self.delay,
            Metric::Duration => self.duration,
        }
    }
}

/// Three-tier timing model for one cohort. All timings in milliseconds.
///
/// `overall` and `avg_typing_speed` are absent when the cohort had no
/// observations; callers must check before use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<OverallStats>,
    pub per_key: BTreeMap<String, KeyStats>,
    pub categories: BTreeMap<KeyCategory, CategoryStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_typing_speed: Option<f64>,
}

impl StatisticalModel {
    /// True when no observations contributed to this model
    pub fn is_empty(&self) -> bool {
        self.overall.is_none() && self.per_key.is_empty() && self.categories.is_empty()
    }
}

/// The persisted model document: one model per cohort
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortModels {
    pub pd: StatisticalModel,
    pub control: StatisticalModel,
}

impl CohortModels {
    pub fn get(&self, cohort: Cohort) -> &StatisticalModel {
        match cohort {
            Cohort::Pd => &self.pd,
            Cohort::Control => &self.control,
        }
    }
}

/// One synthesized key press. Timings in milliseconds, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticKeyEvent {
    pub key: String,
    pub delay: f64,
    pub duration: f64,
    pub press_time: f64,
    pub release_time: f64,
}

/// Synthesized sequences of one prompt for both cohorts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortSequences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pd: Option<Vec<SyntheticKeyEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Vec<SyntheticKeyEvent>>,
}

impl CohortSequences {
    pub fn get(&self, cohort: Cohort) -> Option<&[SyntheticKeyEvent]> {
        match cohort {
            Cohort::Pd => self.pd.as_deref(),
            Cohort::Control => self.control.as_deref(),
        }
    }

    pub fn set(&mut self, cohort: Cohort, events: Vec<SyntheticKeyEvent>) {
        match cohort {
            Cohort::Pd => self.pd = Some(events),
            Cohort::Control => self.control = Some(events),
        }
    }
}

/// Synthesis output document keyed by prompt text
pub type SimulationSet = BTreeMap<String, CohortSequences>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_observation_with_extra_columns() {
        let json = r#"{
            "key": "a",
            "press_0": 12.5,
            "delay": 0.21,
            "duration": 0.09,
            "pID": 1001,
            "has_parkinsons": "True",
            "updrs108": 14.5,
            "typingSpeed": 150.2
        }"#;

        let obs: KeystrokeObservation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.key, "a");
        assert_eq!(obs.subject_id, "1001");
        assert!(obs.has_parkinsons);
        assert_eq!(obs.cohort(), Cohort::Pd);
        assert!((obs.metric(Metric::Delay) - 0.21).abs() < 1e-12);
    }

    #[test]
    fn test_flag_variants() {
        for (raw, expected) in [("false", false), ("true", true), ("0", false), ("1", true), ("\"False\"", false)] {
            let json = format!(
                r#"{{"key":"b","delay":0.1,"duration":0.1,"pID":"s1","has_parkinsons":{raw},"typingSpeed":100}}"#
            );
            let obs: KeystrokeObservation = serde_json::from_str(&json).unwrap();
            assert_eq!(obs.has_parkinsons, expected, "input {raw}");
        }
    }

    #[test]
    fn test_invalid_flag_rejected() {
        let json = r#"{"key":"b","delay":0.1,"duration":0.1,"pID":"s1","has_parkinsons":"maybe","typingSpeed":100}"#;
        assert!(serde_json::from_str::<KeystrokeObservation>(json).is_err());
    }

    #[test]
    fn test_percentiles_field_names() {
        let p = Percentiles { p25: 1.0, p50: 2.0, p75: 3.0 };
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["25"], 1.0);
        assert_eq!(json["50"], 2.0);
        assert_eq!(json["75"], 3.0);
    }

    #[test]
    fn test_empty_model_omits_optional_tiers() {
        let model = StatisticalModel::default();
        assert!(model.is_empty());

        let json = serde_json::to_value(&model).unwrap();
        assert!(json.get("overall").is_none());
        assert!(json.get("avg_typing_speed").is_none());
        assert!(json["per_key"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_cohort_serialization() {
        assert_eq!(serde_json::to_string(&Cohort::Pd).unwrap(), "\"pd\"");
        assert_eq!(serde_json::to_string(&Cohort::Control).unwrap(), "\"control\"");
        assert_eq!(Cohort::from_flag(true), Cohort::Pd);
        assert_eq!(Cohort::Control.to_string(), "control");
    }
}
