//! Cohort model document loading
//!
//! The document is `{ "pd": Model, "control": Model }`. Structural problems
//! are reported as [`SimError::SchemaViolation`] here, at load time, so the
//! synthesizer never samples from a half-formed model.

use crate::error::SimError;
use crate::types::{Cohort, CohortModels, Moments, StatisticalModel};

/// Parse and check a model document
pub fn parse_models(json: &str) -> Result<CohortModels, SimError> {
    let models: CohortModels =
        serde_json::from_str(json).map_err(|e| SimError::SchemaViolation(e.to_string()))?;
    validate_models(&models)?;
    Ok(models)
}

/// Serialize a model document
pub fn models_to_json(models: &CohortModels, pretty: bool) -> Result<String, SimError> {
    if pretty {
        Ok(serde_json::to_string_pretty(models)?)
    } else {
        Ok(serde_json::to_string(models)?)
    }
}

/// Check both cohort models
pub fn validate_models(models: &CohortModels) -> Result<(), SimError> {
    for cohort in Cohort::ALL {
        validate_model(cohort, models.get(cohort))?;
    }
    Ok(())
}

fn validate_model(cohort: Cohort, model: &StatisticalModel) -> Result<(), SimError> {
    // An empty cohort is legal; a model with keys but no overall tier is not
    if model.overall.is_none() && !model.is_empty() {
        return Err(SimError::SchemaViolation(format!(
            "{cohort}: overall tier missing while per_key/categories are populated"
        )));
    }

    if let Some(overall) = &model.overall {
        for (name, summary) in [("delay", &overall.delay), ("duration", &overall.duration)] {
            check_moments(cohort, &format!("overall.{name}"), &summary.moments())?;
            let p = &summary.percentiles;
            let all = [summary.min, summary.max, p.p25, p.p50, p.p75];
            if all.iter().any(|v| !v.is_finite()) {
                return Err(SimError::SchemaViolation(format!(
                    "{cohort}: overall.{name} contains a non-finite value"
                )));
            }
        }
    }

    for (key, stats) in &model.per_key {
        if key.is_empty() || *key != key.to_lowercase() {
            return Err(SimError::SchemaViolation(format!(
                "{cohort}: per_key entry '{key}' is not a lowercase key name"
            )));
        }
        check_moments(cohort, &format!("per_key.{key}.delay"), &stats.delay)?;
        check_moments(cohort, &format!("per_key.{key}.duration"), &stats.duration)?;
    }

    for (category, stats) in &model.categories {
        check_moments(cohort, &format!("categories.{category}.delay"), &stats.delay)?;
        check_moments(cohort, &format!("categories.{category}.duration"), &stats.duration)?;
    }

    if let Some(speed) = model.avg_typing_speed {
        if !speed.is_finite() {
            return Err(SimError::SchemaViolation(format!(
                "{cohort}: avg_typing_speed is not finite"
            )));
        }
    }

    Ok(())
}

fn check_moments(cohort: Cohort, path: &str, moments: &Moments) -> Result<(), SimError> {
    if !moments.mean.is_finite() {
        return Err(SimError::SchemaViolation(format!(
            "{cohort}: {path}.mean is not finite"
        )));
    }
    if !moments.std.is_finite() || moments.std < 0.0 {
        return Err(SimError::SchemaViolation(format!(
            "{cohort}: {path}.std must be a non-negative finite number"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_document() -> &'static str {
        r#"{
            "pd": {
                "overall": {
                    "delay": { "mean": 320.5, "std": 110.2, "min": 100.0, "max": 900.0,
                               "percentiles": { "25": 240.0, "50": 300.0, "75": 390.0 } },
                    "duration": { "mean": 120.0, "std": 30.0, "min": 40.0, "max": 400.0,
                                  "percentiles": { "25": 100.0, "50": 118.0, "75": 140.0 } }
                },
                "per_key": {
                    "e": { "delay": { "mean": 290.0, "std": 90.0 },
                           "duration": { "mean": 115.0, "std": 25.0 }, "count": 57 }
                },
                "categories": {
                    "letters": { "delay": { "mean": 310.0, "std": 100.0 },
                                 "duration": { "mean": 118.0, "std": 28.0 } }
                },
                "avg_typing_speed": 98.4
            },
            "control": { "per_key": {}, "categories": {} }
        }"#
    }

    #[test]
    fn test_parse_document() {
        let models = parse_models(sample_document()).unwrap();
        assert_eq!(models.pd.per_key["e"].count, 57);
        assert_eq!(models.pd.overall.unwrap().delay.percentiles.p75, 390.0);
        assert_eq!(models.pd.avg_typing_speed, Some(98.4));
        assert!(models.control.is_empty());
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let models = parse_models(sample_document()).unwrap();
        for pretty in [false, true] {
            let json = models_to_json(&models, pretty).unwrap();
            assert_eq!(parse_models(&json).unwrap(), models);
        }
    }

    #[test]
    fn test_aggregated_floats_survive_reload() {
        use crate::aggregator::Aggregator;
        use crate::types::KeystrokeObservation;
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let keys = ["a", "e", "t", "space", "Shift_L", "backspace", "7"];
        let mut rng = StdRng::seed_from_u64(11);
        let rows: Vec<KeystrokeObservation> = (0..3000)
            .map(|i| {
                let subject = i % 6;
                KeystrokeObservation {
                    key: keys[rng.random_range(0..keys.len())].to_string(),
                    delay: rng.random_range(0.05..1.5),
                    duration: rng.random_range(0.02..0.4),
                    subject_id: format!("s{subject}"),
                    has_parkinsons: subject % 2 == 0,
                    typing_speed: 80.0 + subject as f64 * 17.3,
                }
            })
            .collect();

        let models = Aggregator::build(&rows);
        for pretty in [false, true] {
            let json = models_to_json(&models, pretty).unwrap();
            assert_eq!(parse_models(&json).unwrap(), models);
        }
    }

    #[test]
    fn test_missing_cohort_is_schema_violation() {
        let json = r#"{ "pd": { "per_key": {}, "categories": {} } }"#;
        assert!(matches!(parse_models(json), Err(SimError::SchemaViolation(_))));
    }

    #[test]
    fn test_missing_tier_is_schema_violation() {
        let json = r#"{
            "pd": { "per_key": {} },
            "control": { "per_key": {}, "categories": {} }
        }"#;
        let err = parse_models(json).unwrap_err();
        assert!(matches!(err, SimError::SchemaViolation(ref msg) if msg.contains("categories")));
    }

    #[test]
    fn test_populated_model_without_overall() {
        let json = r#"{
            "pd": { "per_key": {}, "categories": {
                "space": { "delay": { "mean": 1.0, "std": 1.0 }, "duration": { "mean": 1.0, "std": 1.0 } }
            } },
            "control": { "per_key": {}, "categories": {} }
        }"#;
        let err = parse_models(json).unwrap_err();
        assert!(matches!(err, SimError::SchemaViolation(ref msg) if msg.contains("overall")));
    }

    #[test]
    fn test_negative_std_rejected() {
        let json = sample_document().replace(r#""std": 90.0"#, r#""std": -90.0"#);
        let err = parse_models(&json).unwrap_err();
        assert!(matches!(err, SimError::SchemaViolation(ref msg) if msg.contains("per_key.e.delay")));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let json = r#"{
            "pd": { "per_key": {}, "categories": {
                "digits": { "delay": { "mean": 1.0, "std": 1.0 }, "duration": { "mean": 1.0, "std": 1.0 } }
            } },
            "control": { "per_key": {}, "categories": {} }
        }"#;
        assert!(matches!(parse_models(json), Err(SimError::SchemaViolation(_))));
    }

    #[test]
    fn test_uppercase_key_rejected() {
        let json = sample_document().replace(r#""e": {"#, r#""E": {"#);
        assert!(matches!(parse_models(&json), Err(SimError::SchemaViolation(_))));
    }
}
