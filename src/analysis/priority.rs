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

//! Remediation priority of deviations.
//!
//! Each deviation sums the weights of its per-dimension criticality labels. Only
//! negative impact produces a reason; positive impact just lowers the score.

use super::effects::{EffectRecord, EffectTable};
use super::level::weight_of;
use super::rules::CriticalityMap;
use serde::{Deserialize, Serialize};

/// Aggregated criticality of one deviation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub deviation: String,
    pub score: i32,
    pub reasons: Vec<String>,
}

/// Score a single deviation across `dimensions`.
///
/// Missing records and records without an ATE contribute nothing.
#[must_use]
pub fn score(
    deviation: &str,
    dimensions: &[String],
    effects: &[EffectRecord],
    map: &CriticalityMap,
) -> PriorityEntry {
    let mut total = 0;
    let mut reasons = Vec::new();

    for dimension in dimensions {
        let Some(ate) = effects
            .iter()
            .find(|r| &r.dimension == dimension && r.deviation == deviation)
            .and_then(|r| r.ate)
        else {
            continue;
        };

        let label = map.classify(dimension, ate);
        let weight = weight_of(label);
        total += weight;

        if let Some(label) = label.filter(|_| weight > 0) {
            reasons.push(format!("{dimension} is {label}"));
        }
    }

    PriorityEntry {
        deviation: deviation.to_string(),
        score: total,
        reasons,
    }
}

/// Score every deviation and rank them, highest score first.
///
/// The sort is stable, so equal scores keep the order in which deviations first
/// appear in the effect records.
#[must_use]
pub fn prioritize(effects: &EffectTable, map: &CriticalityMap) -> Vec<PriorityEntry> {
    profiling::scope!("prioritize");
    let dimensions = effects.dimensions();
    let mut entries: Vec<PriorityEntry> = effects
        .deviations()
        .iter()
        .map(|deviation| score(deviation, &dimensions, effects.records(), map))
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

/// Ranked priorities that survive manual reordering.
///
/// The automatic ranking is only recomputed when the effect records or the
/// criticality map actually change.
#[derive(Debug, Clone, Default)]
pub struct PriorityList {
    entries: Vec<PriorityEntry>,
    computed_from: Option<(u64, CriticalityMap)>,
}

impl PriorityList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-rank if the inputs differ from the last ranking. Returns whether it did.
    pub fn refresh(&mut self, effects: &EffectTable, map: &CriticalityMap) -> bool {
        let unchanged = self
            .computed_from
            .as_ref()
            .is_some_and(|(generation, last_map)| {
                *generation == effects.generation() && last_map == map
            });
        if unchanged {
            return false;
        }

        self.entries = prioritize(effects, map);
        self.computed_from = Some((effects.generation(), map.clone()));
        tracing::debug!("Ranked {} deviations", self.entries.len());
        true
    }

    #[must_use]
    pub fn entries(&self) -> &[PriorityEntry] {
        &self.entries
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Swap the entry at `index` with the one above it
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.entries.len() {
            return false;
        }
        self.entries.swap(index - 1, index);
        true
    }

    /// Swap the entry at `index` with the one below it
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.entries.len() {
            return false;
        }
        self.entries.swap(index, index + 1);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.computed_from = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::boundaries::BoundaryBuilder;
    use crate::analysis::level::CriticalityLevel::{self, *};
    use crate::analysis::rules::{CriticalityRule, CriticalityRules};

    fn sign_map(dimensions: &[&str]) -> CriticalityMap {
        let mut map = CriticalityMap::new();
        for dim in dimensions {
            map.insert(
                *dim,
                CriticalityRules::new(vec![
                    CriticalityRule::new(f64::NEG_INFINITY, 0.0, VeryNegative),
                    CriticalityRule::new(0.0, 1.0, Neutral),
                    CriticalityRule::new(1.0, f64::INFINITY, Positive),
                ]),
            );
        }
        map
    }

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_score_sums_weights_and_collects_negative_reasons() {
        let effects = vec![
            EffectRecord::new("A", "time", -5.0, 0.01),
            EffectRecord::new("A", "outcome", 3.0, 0.01),
            EffectRecord::new("A", "quality", 0.5, 0.01),
        ];
        let map = sign_map(&["time", "outcome", "quality"]);
        let entry = score("A", &dims(&["time", "outcome", "quality"]), &effects, &map);

        assert_eq!(entry.score, 3 - 2);
        assert_eq!(entry.reasons, vec!["time is very negative".to_string()]);
    }

    #[test]
    fn test_missing_records_and_dimensions_contribute_nothing() {
        let mut effects = vec![EffectRecord::new("A", "time", -5.0, 0.01)];
        effects.push(EffectRecord {
            ate: None,
            ..EffectRecord::new("A", "costs", 0.0, 0.0)
        });
        // "compliance" has a record but no rules
        effects.push(EffectRecord::new("A", "compliance", -9.0, 0.0));
        let map = sign_map(&["time", "costs"]);

        let entry = score("A", &dims(&["time", "costs", "outcome", "compliance"]), &effects, &map);
        assert_eq!(entry.score, 3);
        assert_eq!(entry.reasons.len(), 1);
    }

    #[test]
    fn test_prioritize_is_stable_for_ties() {
        let table = EffectTable::new(vec![
            EffectRecord::new("first", "time", 0.5, 0.1),
            EffectRecord::new("second", "time", -1.0, 0.1),
            EffectRecord::new("third", "time", 0.2, 0.1),
            EffectRecord::new("fourth", "time", 5.0, 0.1),
        ]);
        let ranked = prioritize(&table, &sign_map(&["time"]));
        let order: Vec<&str> = ranked.iter().map(|e| e.deviation.as_str()).collect();
        assert_eq!(order, vec!["second", "first", "third", "fourth"]);
        assert_eq!(ranked[3].score, -2);
    }

    #[test]
    fn test_manual_order_survives_unchanged_inputs() {
        let table = EffectTable::with_generation(
            vec![
                EffectRecord::new("A", "time", -1.0, 0.1),
                EffectRecord::new("B", "time", 4.0, 0.1),
            ],
            1,
        );
        let map = sign_map(&["time"]);
        let mut list = PriorityList::new();
        assert!(list.refresh(&table, &map));
        assert_eq!(list.entries()[0].deviation, "A");

        assert!(list.move_down(0));
        assert!(!list.refresh(&table, &map));
        assert_eq!(list.entries()[0].deviation, "B");

        // A different map re-ranks
        let mut other = map.clone();
        other.insert("outcome", CriticalityRules::default());
        assert!(list.refresh(&table, &other));
        assert_eq!(list.entries()[0].deviation, "A");
    }

    #[test]
    fn test_move_bounds() {
        let table = EffectTable::new(vec![
            EffectRecord::new("A", "time", -1.0, 0.1),
            EffectRecord::new("B", "time", 4.0, 0.1),
        ]);
        let mut list = PriorityList::new();
        list.refresh(&table, &sign_map(&["time"]));
        assert!(!list.move_up(0));
        assert!(!list.move_down(1));
        assert!(!list.move_up(7));
        assert!(list.move_up(1));
        assert_eq!(list.entries()[0].deviation, "B");
    }

    #[test]
    fn test_end_to_end_default_map() {
        let table = EffectTable::new(vec![
            EffectRecord::new("A", "time", -1200.0, 0.01),
            EffectRecord::new("A", "outcome", 0.3, 0.02),
        ]);
        let dimensions = table.dimensions();
        let mut builder = BoundaryBuilder::new();
        builder.observe(&table, &dimensions);
        let map = builder.build_map();

        let ranked = prioritize(&table, &map);
        assert_eq!(ranked.len(), 1);
        let entry = &ranked[0];
        assert_eq!(entry.deviation, "A");

        let time_label = map.classify("time", -1200.0);
        let outcome_label = map.classify("outcome", 0.3);
        assert!(time_label.is_some());
        assert!(outcome_label.is_some());
        assert_eq!(entry.score, weight_of(time_label) + weight_of(outcome_label));

        let expected_reasons: Vec<String> = [("time", time_label), ("outcome", outcome_label)]
            .into_iter()
            .filter_map(|(dim, label)| label.filter(|l| l.weight() > 0).map(|l| (dim, l)))
            .map(|(dim, l): (&str, CriticalityLevel)| format!("{dim} is {l}"))
            .collect();
        assert_eq!(entry.reasons, expected_reasons);
    }
}
