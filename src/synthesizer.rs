//! Synthetic keystroke sequence generation
//!
//! Walks the tokens of a prompt left to right, sampling an inter-key delay and
//! a hold duration for each from normal distributions parameterized by the
//! cohort's model (see [`crate::resolver`] for the tier fallback) and the
//! cohort's multipliers. The only mutable state is the cumulative clock.
//!
//! Sampling policy, all in milliseconds:
//!
//! ```text
//! first key delay ~ N(200 * base, 50)
//! delay           ~ N(max(150, mean) * base, std * 0.5 * variability)   floor 100
//! duration        ~ N(mean * duration_mult, std * 0.5 * variability)   floor 50
//! ```

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, trace};

use crate::categories::SPACE_KEY;
use crate::config::CohortParams;
use crate::error::SimError;
use crate::resolver::resolve;
use crate::stats::round2;
use crate::types::{Cohort, Metric, StatisticalModel, SyntheticKeyEvent};

/// Mean time to the first keystroke before the cohort multiplier
pub const FIRST_KEY_DELAY_MS: f64 = 200.0;
/// Spread of the time to the first keystroke
pub const FIRST_KEY_DELAY_STD_MS: f64 = 50.0;
/// Resolved delay means below this are raised to it
pub const MIN_DELAY_MEAN_MS: f64 = 150.0;
/// Shrinkage applied to every resolved standard deviation
pub const SPREAD_SHRINK: f64 = 0.5;
/// Floor for every sampled delay
pub const MIN_DELAY_MS: f64 = 100.0;
/// Floor for every sampled duration
pub const MIN_DURATION_MS: f64 = 50.0;

/// Keys typed for a prompt.
///
/// The text is lowercased; spaces become `space`, `a`..`z` are kept and every
/// other character is dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some(SPACE_KEY.to_string()),
            'a'..='z' => Some(c.to_string()),
            _ => None,
        })
        .collect()
}

/// A clamped normal distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub mean: f64,
    pub std: f64,
    pub floor: f64,
}

impl SamplingParams {
    /// Draw one value, raised to `floor` if it falls below
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, SimError> {
        if !self.mean.is_finite() {
            return Err(SimError::InvalidDistribution(format!(
                "mean must be finite, got {}",
                self.mean
            )));
        }
        if !(self.std.is_finite() && self.std >= 0.0) {
            return Err(SimError::InvalidDistribution(format!(
                "std must be a non-negative finite number, got {}",
                self.std
            )));
        }
        let normal = Normal::new(self.mean, self.std).map_err(|e| {
            SimError::InvalidDistribution(format!("N({}, {}): {}", self.mean, self.std, e))
        })?;
        Ok(normal.sample(rng).max(self.floor))
    }
}

/// Delay distribution for the key at `position` in the sequence
pub fn delay_params(
    model: &StatisticalModel,
    key: &str,
    position: usize,
    params: &CohortParams,
) -> Result<SamplingParams, SimError> {
    if position == 0 {
        return Ok(SamplingParams {
            mean: FIRST_KEY_DELAY_MS * params.base_delay_multiplier,
            std: FIRST_KEY_DELAY_STD_MS,
            floor: MIN_DELAY_MS,
        });
    }

    let resolved = resolve(model, key, Metric::Delay)?;
    trace!(key, tier = %resolved.tier, "resolved delay statistics");

    Ok(SamplingParams {
        mean: resolved.moments.mean.max(MIN_DELAY_MEAN_MS) * params.base_delay_multiplier,
        std: resolved.moments.std * SPREAD_SHRINK * params.variability_multiplier,
        floor: MIN_DELAY_MS,
    })
}

/// Duration distribution for a key
pub fn duration_params(
    model: &StatisticalModel,
    key: &str,
    params: &CohortParams,
) -> Result<SamplingParams, SimError> {
    let resolved = resolve(model, key, Metric::Duration)?;
    trace!(key, tier = %resolved.tier, "resolved duration statistics");

    Ok(SamplingParams {
        mean: resolved.moments.mean * params.duration_multiplier,
        std: resolved.moments.std * SPREAD_SHRINK * params.variability_multiplier,
        floor: MIN_DURATION_MS,
    })
}

/// Sequence generator bound to one cohort's model.
///
/// Holds the model by shared reference; one model can back any number of
/// synthesizers, each driven by its own random source.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    cohort: Cohort,
    model: &'a StatisticalModel,
    params: CohortParams,
}

impl<'a> Synthesizer<'a> {
    /// Bind a cohort model. Fails if the cohort had no observations.
    pub fn new(
        cohort: Cohort,
        model: &'a StatisticalModel,
        params: CohortParams,
    ) -> Result<Self, SimError> {
        if model.overall.is_none() {
            return Err(SimError::NoCohortData(cohort));
        }
        Ok(Self {
            cohort,
            model,
            params,
        })
    }

    pub fn cohort(&self) -> Cohort {
        self.cohort
    }

    /// Generate a timed key event for every typeable character of `text`
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        text: &str,
        rng: &mut R,
    ) -> Result<Vec<SyntheticKeyEvent>, SimError> {
        let keys = tokenize(text);
        let mut events = Vec::with_capacity(keys.len());
        let mut clock = 0.0_f64;

        for (position, key) in keys.into_iter().enumerate() {
            let delay = delay_params(self.model, &key, position, &self.params)?.sample(rng)?;
            let duration = duration_params(self.model, &key, &self.params)?.sample(rng)?;

            // Full precision on the clock; rounding happens on the emitted values only
            clock += delay;
            let press_time = round2(clock);
            let duration = round2(duration);

            events.push(SyntheticKeyEvent {
                key,
                delay: round2(delay),
                duration,
                press_time,
                release_time: round2(press_time + duration),
            });
        }

        debug!(cohort = %self.cohort, events = events.len(), elapsed_ms = clock, "synthesized sequence");
        Ok(events)
    }
}

/// One-shot synthesis for a cohort
pub fn synthesize<R: Rng + ?Sized>(
    text: &str,
    cohort: Cohort,
    model: &StatisticalModel,
    params: CohortParams,
    rng: &mut R,
) -> Result<Vec<SyntheticKeyEvent>, SimError> {
    Synthesizer::new(cohort, model, params)?.synthesize(text, rng)
}
