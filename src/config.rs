//! Synthesis configuration
//!
//! Cohort multipliers are calibration constants. The defaults reproduce the
//! reference calibration; a JSON document with the same shape overrides them.
//!
//! ```json
//! {
//!   "pd":      { "base_delay_multiplier": 2.5, "variability_multiplier": 1.5, "duration_multiplier": 1.3 },
//!   "control": { "base_delay_multiplier": 1.5, "variability_multiplier": 1.0, "duration_multiplier": 1.0 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::types::Cohort;

/// Scaling applied to the model's statistics when synthesizing for one cohort
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortParams {
    /// Multiplies every delay mean
    pub base_delay_multiplier: f64,
    /// Multiplies every delay and duration standard deviation
    pub variability_multiplier: f64,
    /// Multiplies every duration mean
    pub duration_multiplier: f64,
}

impl CohortParams {
    /// Slower, more variable typing with longer holds
    pub const PD_DEFAULT: CohortParams = CohortParams {
        base_delay_multiplier: 2.5,
        variability_multiplier: 1.5,
        duration_multiplier: 1.3,
    };

    pub const CONTROL_DEFAULT: CohortParams = CohortParams {
        base_delay_multiplier: 1.5,
        variability_multiplier: 1.0,
        duration_multiplier: 1.0,
    };

    /// Reference calibration for a cohort
    pub fn default_for(cohort: Cohort) -> Self {
        match cohort {
            Cohort::Pd => Self::PD_DEFAULT,
            Cohort::Control => Self::CONTROL_DEFAULT,
        }
    }

    fn validate(&self, cohort: Cohort) -> Result<(), SimError> {
        let fields = [
            ("base_delay_multiplier", self.base_delay_multiplier),
            ("variability_multiplier", self.variability_multiplier),
            ("duration_multiplier", self.duration_multiplier),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "{cohort}.{name} must be a positive finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-cohort synthesis parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "pd_default")]
    pub pd: CohortParams,
    #[serde(default = "control_default")]
    pub control: CohortParams,
}

fn pd_default() -> CohortParams {
    CohortParams::PD_DEFAULT
}

fn control_default() -> CohortParams {
    CohortParams::CONTROL_DEFAULT
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            pd: CohortParams::PD_DEFAULT,
            control: CohortParams::CONTROL_DEFAULT,
        }
    }
}

impl SynthesisConfig {
    pub fn params(&self, cohort: Cohort) -> CohortParams {
        match cohort {
            Cohort::Pd => self.pd,
            Cohort::Control => self.control,
        }
    }

    /// Check every multiplier is usable
    pub fn validate(&self) -> Result<(), SimError> {
        self.pd.validate(Cohort::Pd)?;
        self.control.validate(Cohort::Control)
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: SynthesisConfig =
            serde_json::from_str(json).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SynthesisConfig::default();
        assert_eq!(config.params(Cohort::Pd), CohortParams::default_for(Cohort::Pd));
        assert_eq!(config.pd.base_delay_multiplier, 2.5);
        assert_eq!(config.pd.variability_multiplier, 1.5);
        assert_eq!(config.pd.duration_multiplier, 1.3);
        assert_eq!(config.control.base_delay_multiplier, 1.5);
        assert_eq!(config.control.variability_multiplier, 1.0);
        assert_eq!(config.control.duration_multiplier, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pd_slower_than_control() {
        let config = SynthesisConfig::default();
        assert!(config.pd.base_delay_multiplier > config.control.base_delay_multiplier);
        assert!(config.pd.variability_multiplier > config.control.variability_multiplier);
        assert!(config.pd.duration_multiplier > config.control.duration_multiplier);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "control": { "base_delay_multiplier": 1.2, "variability_multiplier": 0.8, "duration_multiplier": 1.0 }
        }"#;
        let config = SynthesisConfig::from_json(json).unwrap();
        assert_eq!(config.pd, CohortParams::PD_DEFAULT);
        assert_eq!(config.control.base_delay_multiplier, 1.2);
    }

    #[test]
    fn test_rejects_non_positive_multiplier() {
        let json = r#"{
            "pd": { "base_delay_multiplier": 0.0, "variability_multiplier": 1.5, "duration_multiplier": 1.3 }
        }"#;
        let err = SynthesisConfig::from_json(json).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(ref msg) if msg.contains("pd.base_delay_multiplier")));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            SynthesisConfig::from_json("{ not json"),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SynthesisConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(SynthesisConfig::from_json(&json).unwrap(), config);
    }
}
