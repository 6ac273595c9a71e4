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

//! Interval rules and the criticality classifier.
//!
//! A rule covers the half-open interval `[min, max)`. A value sitting exactly on a
//! cut point belongs to the rule that starts there.

use super::level::CriticalityLevel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One interval of a dimension's criticality scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalityRule {
    #[serde(with = "bound")]
    pub min: f64,
    #[serde(with = "bound")]
    pub max: f64,
    pub label: CriticalityLevel,
}

impl CriticalityRule {
    #[must_use]
    pub const fn new(min: f64, max: f64, label: CriticalityLevel) -> Self {
        Self { min, max, label }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }
}

/// Label of the first rule (in list order) containing `value`.
///
/// Rules are scanned as given; an unsorted list is the caller's problem. Use
/// [`CriticalityRules`] to get the ordering guaranteed.
#[must_use]
pub fn classify(value: f64, rules: &[CriticalityRule]) -> Option<CriticalityLevel> {
    rules
        .iter()
        .find(|rule| rule.contains(value))
        .map(|rule| rule.label)
}

/// Rule list kept sorted ascending by `min`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CriticalityRule>", into = "Vec<CriticalityRule>")]
pub struct CriticalityRules {
    rules: Vec<CriticalityRule>,
}

impl CriticalityRules {
    #[must_use]
    pub fn new(mut rules: Vec<CriticalityRule>) -> Self {
        rules.sort_by(|a, b| a.min.total_cmp(&b.min));
        Self { rules }
    }

    #[must_use]
    pub fn classify(&self, value: f64) -> Option<CriticalityLevel> {
        classify(value, &self.rules)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CriticalityRule] {
        &self.rules
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CriticalityRule> {
        self.rules.iter()
    }
}

impl From<Vec<CriticalityRule>> for CriticalityRules {
    fn from(rules: Vec<CriticalityRule>) -> Self {
        Self::new(rules)
    }
}

impl From<CriticalityRules> for Vec<CriticalityRule> {
    fn from(rules: CriticalityRules) -> Self {
        rules.rules
    }
}

impl<'a> IntoIterator for &'a CriticalityRules {
    type Item = &'a CriticalityRule;
    type IntoIter = std::slice::Iter<'a, CriticalityRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Per-dimension rule lists, in the order the dimensions were configured
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriticalityMap {
    dimensions: IndexMap<String, CriticalityRules>,
}

impl CriticalityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dimension: impl Into<String>, rules: CriticalityRules) {
        self.dimensions.insert(dimension.into(), rules);
    }

    #[must_use]
    pub fn get(&self, dimension: &str) -> Option<&CriticalityRules> {
        self.dimensions.get(dimension)
    }

    /// Classify `value` with the rules of `dimension`; `None` if it has no rules
    #[must_use]
    pub fn classify(&self, dimension: &str, value: f64) -> Option<CriticalityLevel> {
        self.get(dimension).and_then(|rules| rules.classify(value))
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.dimensions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CriticalityRules)> {
        self.dimensions.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

/// JSON has no infinities, so open ends travel as `"-Infinity"` / `"Infinity"`.
mod bound {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(text) => match text.as_str() {
                "Infinity" | "+Infinity" | "inf" => Ok(f64::INFINITY),
                "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse::<f64>()
                    .map_err(|e| D::Error::custom(format!("invalid rule bound {other:?}: {e}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CriticalityLevel::*;

    fn three_band() -> Vec<CriticalityRule> {
        vec![
            CriticalityRule::new(f64::NEG_INFINITY, -10.0, VeryPositive),
            CriticalityRule::new(-10.0, 10.0, Neutral),
            CriticalityRule::new(10.0, f64::INFINITY, VeryNegative),
        ]
    }

    #[test]
    fn test_boundary_value_belongs_to_upper_rule() {
        let rules = three_band();
        assert_eq!(classify(-10.0, &rules), Some(Neutral));
        assert_eq!(classify(10.0, &rules), Some(VeryNegative));
        assert_eq!(classify(9.999, &rules), Some(Neutral));
        assert_eq!(classify(-10.000_001, &rules), Some(VeryPositive));
    }

    #[test]
    fn test_unclassified_values() {
        assert_eq!(classify(1.0, &[]), None);
        assert_eq!(classify(f64::NAN, &three_band()), None);

        let map = CriticalityMap::new();
        assert_eq!(map.classify("time", 3.0), None);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let rules = CriticalityRules::new(three_band());
        for value in [-1e9, -10.0, 0.0, 10.0, 42.5] {
            assert_eq!(rules.classify(value), rules.classify(value));
        }
    }

    #[test]
    fn test_linear_scan_trusts_list_order() {
        let mut unsorted = three_band();
        unsorted.swap(0, 2);
        unsorted[0] = CriticalityRule::new(f64::NEG_INFINITY, f64::INFINITY, Positive);
        // The first rule swallows everything when scanned as given
        assert_eq!(classify(-50.0, &unsorted), Some(Positive));
    }

    #[test]
    fn test_rule_list_is_sorted_on_construction() {
        let mut shuffled = three_band();
        shuffled.reverse();
        let rules = CriticalityRules::new(shuffled);
        let mins: Vec<f64> = rules.iter().map(|r| r.min).collect();
        assert_eq!(mins, vec![f64::NEG_INFINITY, -10.0, 10.0]);
        assert_eq!(rules.classify(-20.0), Some(VeryPositive));
    }

    #[test]
    fn test_map_serializes_infinite_bounds_as_strings() {
        let mut map = CriticalityMap::new();
        map.insert("time", CriticalityRules::new(three_band()));

        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"-Infinity\""));
        assert!(json.contains("\"Infinity\""));
        assert!(json.contains("\"very positive\""));

        let back: CriticalityMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_deserialize_sorts_rules() {
        let json = r#"{"cost": [
            {"min": 0, "max": "Infinity", "label": "negative"},
            {"min": "-Infinity", "max": 0, "label": "positive"}
        ]}"#;
        let map: CriticalityMap = serde_json::from_str(json).unwrap();
        let rules = map.get("cost").unwrap();
        assert_eq!(rules.as_slice()[0].label, Positive);
        assert_eq!(map.classify("cost", 0.0), Some(Negative));
    }
}
