use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Weight used for any attribute without an explicit entry.
pub const DEFAULT_WEIGHT: f64 = 1.0;

const DEFAULT_WEIGHTS: [(&str, f64); 9] = [
    ("energy", 2.0),
    ("valence", 1.5),
    ("bpm", 1.5),
    ("danceability", 1.2),
    ("popularity", 1.0),
    ("tempo_range", 1.5),
    ("usage_context", 2.0),
    ("explicitness", 1.0),
    ("live_performance_factor", 1.2),
];

const DEFAULT_TOLERANCES: [(&str, f64); 9] = [
    ("energy", 1.0),
    ("valence", 1.0),
    ("bpm", 10.0),
    ("danceability", 0.1),
    ("popularity", 10.0),
    ("tempo_range", 0.5),
    ("usage_context", 0.0),
    ("explicitness", 0.0),
    ("live_performance_factor", 1.0),
];

/// Partial weight/tolerance overrides, as written in the config file.
///
/// ```toml
/// [scoring.weights]
/// energy = 3.0
/// mood = 2.5
///
/// [scoring.tolerances]
/// release_year = 5
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringOverrides {
    pub weights: HashMap<String, f64>,
    pub tolerances: HashMap<String, f64>,
}

impl ScoringOverrides {
    /// Check override values. Returns all problems at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (key, weight) in sorted(&self.weights) {
            if !weight.is_finite() || *weight <= 0.0 {
                errors.push(format!(
                    "scoring.weights.{key}: must be a positive number, got {weight}"
                ));
            }
        }
        for (key, tolerance) in sorted(&self.tolerances) {
            if !tolerance.is_finite() || *tolerance < 0.0 {
                errors.push(format!(
                    "scoring.tolerances.{key}: must be zero or positive, got {tolerance}"
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn sorted(map: &HashMap<String, f64>) -> Vec<(&String, &f64)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Effective weight and tolerance tables for one scoring call.
///
/// `ScoringConfig::default()` holds the built-in tables. Overrides replace
/// individual keys; the defaults themselves are never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    weights: HashMap<String, f64>,
    tolerances: HashMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            tolerances: DEFAULT_TOLERANCES
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

impl ScoringConfig {
    /// Defaults with `overrides` merged on top, key by key.
    pub fn with_overrides(overrides: &ScoringOverrides) -> Self {
        let mut config = Self::default();
        config.merge(overrides);
        config
    }

    pub fn merge(&mut self, overrides: &ScoringOverrides) {
        for (key, weight) in &overrides.weights {
            self.weights.insert(key.clone(), *weight);
        }
        for (key, tolerance) in &overrides.tolerances {
            self.tolerances.insert(key.clone(), *tolerance);
        }
    }

    /// Maximum contribution of `key`; 1.0 when unlisted.
    pub fn weight(&self, key: &str) -> f64 {
        self.weights.get(key).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// Tolerance band for `key`, if the table has an entry for it.
    pub fn tolerance(&self, key: &str) -> Option<f64> {
        self.tolerances.get(key).copied()
    }
}
