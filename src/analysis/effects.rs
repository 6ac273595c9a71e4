// Deviscope - GPL-3.0-or-later
// This file is part of Deviscope.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// Deviscope is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Deviscope is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Deviscope.  If not, see <https://www.gnu.org/licenses/>.

//! Causal-effect records as delivered by the backend.

use super::level::Desirability;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lowest heat-map intensity, so small effects stay visible
const MIN_TONE_INTENSITY: f64 = 0.15;

/// One average-treatment-effect estimate for a (deviation, dimension) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub deviation: String,
    pub dimension: String,
    #[serde(default)]
    pub ate: Option<f64>,
    #[serde(default)]
    pub p_value: Option<f64>,
    /// Set by the backend when the estimate could not be computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EffectRecord {
    pub fn new(
        deviation: impl Into<String>,
        dimension: impl Into<String>,
        ate: f64,
        p_value: f64,
    ) -> Self {
        Self {
            deviation: deviation.into(),
            dimension: dimension.into(),
            ate: Some(ate),
            p_value: Some(p_value),
            error: None,
        }
    }
}

/// Read-only effect records of one analysis session.
///
/// Cheap to clone; the records are shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectTable {
    records: Arc<Vec<EffectRecord>>,
    generation: u64,
}

impl EffectTable {
    #[must_use]
    pub fn new(records: Vec<EffectRecord>) -> Self {
        Self::with_generation(records, 0)
    }

    /// Tag the table with a fetch generation so consumers can tell reloads apart
    #[must_use]
    pub fn with_generation(records: Vec<EffectRecord>, generation: u64) -> Self {
        Self {
            records: Arc::new(records),
            generation,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn records(&self) -> &[EffectRecord] {
        &self.records
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct deviations in order of first appearance
    #[must_use]
    pub fn deviations(&self) -> Vec<String> {
        first_appearance(self.records.iter().map(|r| r.deviation.as_str()))
    }

    /// Distinct dimensions in order of first appearance
    #[must_use]
    pub fn dimensions(&self) -> Vec<String> {
        first_appearance(self.records.iter().map(|r| r.dimension.as_str()))
    }

    /// First record for the pair, if any
    #[must_use]
    pub fn find(&self, dimension: &str, deviation: &str) -> Option<&EffectRecord> {
        self.records
            .iter()
            .find(|r| r.dimension == dimension && r.deviation == deviation)
    }

    /// Finite ATE values observed for a dimension across all deviations
    #[must_use]
    pub fn ate_values(&self, dimension: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.dimension == dimension)
            .filter_map(|r| r.ate)
            .filter(|v| v.is_finite())
            .collect()
    }

    /// Largest absolute ATE, never below 1
    #[must_use]
    pub fn max_abs_effect(&self) -> f64 {
        self.records
            .iter()
            .filter_map(|r| r.ate)
            .filter(|v| v.is_finite())
            .map(f64::abs)
            .fold(1.0, f64::max)
    }
}

fn first_appearance<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        if !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// Heat-map shading of one effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTone {
    /// Whether the effect moves the dimension in the desired direction
    pub favourable: bool,
    /// Opacity in `[0.15, 1]`, proportional to the effect magnitude
    pub intensity: f64,
}

#[must_use]
pub fn effect_tone(dimension: &str, ate: f64, max_abs: f64) -> EffectTone {
    let intensity = if max_abs > 0.0 {
        (ate.abs() / max_abs).clamp(MIN_TONE_INTENSITY, 1.0)
    } else {
        MIN_TONE_INTENSITY
    };
    let favourable = match Desirability::for_dimension(dimension) {
        Desirability::Decrease => ate < 0.0,
        Desirability::Increase => ate > 0.0,
    };
    EffectTone {
        favourable,
        intensity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EffectTable {
        EffectTable::new(vec![
            EffectRecord::new("(Skip B)", "time", 300.0, 0.04),
            EffectRecord::new("(Skip A)", "time", -120.0, 0.01),
            EffectRecord::new("(Skip B)", "outcome", 0.2, 0.3),
            EffectRecord {
                deviation: "(Skip A)".to_string(),
                dimension: "outcome".to_string(),
                ate: None,
                p_value: None,
                error: Some("singular matrix".to_string()),
            },
        ])
    }

    #[test]
    fn test_first_appearance_order() {
        let t = table();
        assert_eq!(t.deviations(), vec!["(Skip B)", "(Skip A)"]);
        assert_eq!(t.dimensions(), vec!["time", "outcome"]);
    }

    #[test]
    fn test_ate_values_skip_missing() {
        let t = table();
        assert_eq!(t.ate_values("time"), vec![300.0, -120.0]);
        assert_eq!(t.ate_values("outcome"), vec![0.2]);
        assert!(t.ate_values("costs").is_empty());
        assert!((t.max_abs_effect() - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_max_abs_effect_floor() {
        let t = EffectTable::new(vec![EffectRecord::new("d", "quality", 0.2, 0.5)]);
        assert!((t.max_abs_effect() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_backend_record_with_nulls() {
        let json = r#"{"deviation": "(Skip A)", "dimension": "time", "ate": null, "p_value": null}"#;
        let record: EffectRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.ate, None);
        assert_eq!(record.error, None);
    }

    #[test]
    fn test_effect_tone_direction() {
        let faster = effect_tone("Time", -50.0, 100.0);
        assert!(faster.favourable);
        assert!((faster.intensity - 0.5).abs() < 1e-9);

        let better = effect_tone("outcome", 0.01, 100.0);
        assert!(better.favourable);
        assert!((better.intensity - 0.15).abs() < 1e-9);

        let pricier = effect_tone("costs", 500.0, 100.0);
        assert!(!pricier.favourable);
        assert!((pricier.intensity - 1.0).abs() < 1e-9);
    }
}
