//! Tier fallback resolution
//!
//! For a key and a metric, the synthesizer needs one (mean, std) pair. The
//! model is consulted as an ordered list of candidate tiers and the first tier
//! holding data wins:
//!
//! 1. per-key statistics
//! 2. `space` category (space bar only)
//! 3. `letters` category (letters only)
//! 4. overall statistics

use std::fmt;

use crate::categories::{category_of, KeyCategory};
use crate::error::SimError;
use crate::types::{Metric, Moments, StatisticalModel};

/// Model tier a statistic can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    PerKey,
    Category(KeyCategory),
    Overall,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::PerKey => f.write_str("per_key"),
            Tier::Category(category) => write!(f, "category:{category}"),
            Tier::Overall => f.write_str("overall"),
        }
    }
}

/// Statistics picked for a key, together with where they came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub tier: Tier,
    pub moments: Moments,
}

/// Ordered tiers to try for a key
pub fn candidates(key: &str) -> Vec<Tier> {
    let mut tiers = vec![Tier::PerKey];
    match category_of(key) {
        Some(category @ (KeyCategory::Space | KeyCategory::Letters)) => {
            tiers.push(Tier::Category(category));
        }
        Some(KeyCategory::Special) | None => {}
    }
    tiers.push(Tier::Overall);
    tiers
}

/// Statistics of a single tier, if the model has them
fn lookup(model: &StatisticalModel, tier: Tier, key: &str, metric: Metric) -> Option<Moments> {
    match tier {
        Tier::PerKey => model.per_key.get(key).map(|s| s.moments(metric)),
        Tier::Category(category) => model.categories.get(&category).map(|s| s.moments(metric)),
        Tier::Overall => model.overall.as_ref().map(|s| s.moments(metric)),
    }
}

/// First candidate tier with data for `key`
pub fn resolve(model: &StatisticalModel, key: &str, metric: Metric) -> Result<Resolution, SimError> {
    candidates(key)
        .into_iter()
        .find_map(|tier| lookup(model, tier, key, metric).map(|moments| Resolution { tier, moments }))
        .ok_or_else(|| SimError::NoStatistics {
            key: key.to_string(),
            metric,
        })
}
