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

//! Builds criticality rule lists from selected levels and cut points.
//!
//! Each dimension keeps a subset of the seven levels and `levels - 1` cut points.
//! Cut points the user moved are kept verbatim; only a change in the number of
//! selected levels adds or removes cuts, and it does so at the end of the list.

use super::effects::EffectTable;
use super::level::{display_order, CriticalityLevel, Desirability};
use super::rules::{CriticalityMap, CriticalityRule, CriticalityRules};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Fraction of the observed spread added on both sides of the default range
const RANGE_PADDING_FACTOR: f64 = 0.2;

/// Padding used when every observed value is identical
const FLAT_RANGE_PADDING: f64 = 1.0;

/// Levels selected for a dimension the first time it shows up
pub const DEFAULT_LEVELS: [CriticalityLevel; 4] = [
    CriticalityLevel::VeryNegative,
    CriticalityLevel::Negative,
    CriticalityLevel::Positive,
    CriticalityLevel::VeryPositive,
];

/// Min and max of the finite values, `(0, 0)` when there are none
#[must_use]
pub fn observed_range(values: &[f64]) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min.is_finite() {
        (min, max)
    } else {
        (0.0, 0.0)
    }
}

/// Widen `[min, max]` by 20% of its spread on each side (or by 1 if flat)
#[must_use]
pub fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let spread = max - min;
    let padding = if spread == 0.0 {
        FLAT_RANGE_PADDING
    } else {
        spread * RANGE_PADDING_FACTOR
    };
    (min - padding, max + padding)
}

/// `count` evenly spaced interior points of `[lo, hi]`
#[must_use]
pub fn default_cuts(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let step = (hi - lo) / (count + 1) as f64;
    (1..=count).map(|i| lo + step * i as f64).collect()
}

/// Adjust `existing` to exactly `count` cuts without touching the ones kept.
///
/// Extra cuts are dropped from the end. Missing cuts are spread evenly between the
/// largest existing cut (or `lo`) and `hi`.
#[must_use]
pub fn resize_cuts(existing: &[f64], count: usize, lo: f64, hi: f64) -> Vec<f64> {
    if existing.len() >= count {
        return existing[..count].to_vec();
    }

    let missing = count - existing.len();
    let start = existing
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.max(c))))
        .unwrap_or(lo);
    let end = if hi > start { hi } else { start + (hi - lo).abs().max(FLAT_RANGE_PADDING) };

    let mut cuts = existing.to_vec();
    cuts.extend(default_cuts(start, end, missing));
    cuts
}

/// Assemble `(-inf, c1, l0), (c1, c2, l1), ..., (ck, +inf, lk)`.
///
/// `labels` are in display order (lowest interval first). Returns `None` when the
/// configuration is incomplete: fewer than two labels, a cut count other than
/// `labels - 1`, or a NaN cut.
#[must_use]
pub fn build_rules(labels: &[CriticalityLevel], cuts: &[f64]) -> Option<CriticalityRules> {
    if labels.len() < 2 || cuts.len() != labels.len() - 1 || cuts.iter().any(|c| c.is_nan()) {
        return None;
    }

    let mut sorted = cuts.to_vec();
    sorted.sort_by(f64::total_cmp);

    let lower_bounds = std::iter::once(f64::NEG_INFINITY).chain(sorted.iter().copied());
    let upper_bounds = sorted.iter().copied().chain(std::iter::once(f64::INFINITY));

    let rules = lower_bounds
        .zip(upper_bounds)
        .zip(labels.iter().copied())
        .map(|((min, max), label)| CriticalityRule::new(min, max, label))
        .collect();

    Some(CriticalityRules::new(rules))
}

/// Editable criticality configuration of a single dimension
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionBoundaries {
    levels: BTreeSet<CriticalityLevel>,
    cuts: Vec<f64>,
    range: (f64, f64),
    desirability: Desirability,
}

impl DimensionBoundaries {
    /// Default configuration for a dimension whose observed values span `observed`
    #[must_use]
    pub fn new(dimension: &str, observed: (f64, f64)) -> Self {
        let range = padded_range(observed.0, observed.1);
        let levels: BTreeSet<CriticalityLevel> = DEFAULT_LEVELS.into_iter().collect();
        let cuts = default_cuts(range.0, range.1, levels.len() - 1);
        Self {
            levels,
            cuts,
            range,
            desirability: Desirability::for_dimension(dimension),
        }
    }

    /// Selected levels in canonical order
    pub fn levels(&self) -> impl Iterator<Item = CriticalityLevel> + '_ {
        self.levels.iter().copied()
    }

    #[must_use]
    pub fn is_selected(&self, level: CriticalityLevel) -> bool {
        self.levels.contains(&level)
    }

    /// Cut points as entered, not necessarily sorted
    #[must_use]
    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    /// Padded range the defaults are spread over
    #[must_use]
    pub const fn range(&self) -> (f64, f64) {
        self.range
    }

    #[must_use]
    pub const fn desirability(&self) -> Desirability {
        self.desirability
    }

    /// Selected levels in the order they attach to ascending intervals
    #[must_use]
    pub fn display_labels(&self) -> Vec<CriticalityLevel> {
        display_order(self.levels.iter().copied(), self.desirability)
    }

    fn required_cuts(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    fn fit_cut_count(&mut self) {
        let required = self.required_cuts();
        if self.cuts.len() != required {
            self.cuts = resize_cuts(&self.cuts, required, self.range.0, self.range.1);
        }
    }

    /// Replace the level selection; cuts follow the new count
    pub fn set_levels<I: IntoIterator<Item = CriticalityLevel>>(&mut self, levels: I) {
        self.levels = levels.into_iter().collect();
        self.fit_cut_count();
    }

    /// Select or deselect one level. Returns whether it is selected afterwards.
    pub fn toggle_level(&mut self, level: CriticalityLevel) -> bool {
        let selected = if self.levels.remove(&level) {
            false
        } else {
            self.levels.insert(level);
            true
        };
        self.fit_cut_count();
        selected
    }

    /// Move one cut point. Returns false if `index` is out of range.
    pub fn set_cut(&mut self, index: usize, value: f64) -> bool {
        self.cuts.get_mut(index).map(|cut| *cut = value).is_some()
    }

    /// Discard user edits and spread the cuts evenly again
    pub fn reset_cuts(&mut self) {
        self.cuts = default_cuts(self.range.0, self.range.1, self.required_cuts());
    }

    /// Track a new observed value span; existing cuts are left alone
    pub fn update_range(&mut self, observed: (f64, f64)) {
        self.range = padded_range(observed.0, observed.1);
    }

    /// Rule list for the current configuration, `None` while incomplete
    #[must_use]
    pub fn rules(&self) -> Option<CriticalityRules> {
        build_rules(&self.display_labels(), &self.cuts)
    }
}

/// Criticality configuration of every dimension in a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryBuilder {
    dimensions: IndexMap<String, DimensionBoundaries>,
}

impl BoundaryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the dimensions of `effects`.
    ///
    /// New dimensions get default levels and cuts. Known dimensions only have
    /// their observed range refreshed. Dimensions missing from `dimensions` are
    /// dropped together with their configuration.
    pub fn observe(&mut self, effects: &EffectTable, dimensions: &[String]) {
        self.dimensions.retain(|name, _| {
            let keep = dimensions.contains(name);
            if !keep {
                tracing::debug!("Dropping criticality dimension {name}");
            }
            keep
        });
        for dimension in dimensions {
            let observed = observed_range(&effects.ate_values(dimension));
            match self.dimensions.get_mut(dimension) {
                Some(existing) => existing.update_range(observed),
                None => {
                    tracing::debug!(
                        "New criticality dimension {dimension}, observed range {observed:?}"
                    );
                    self.dimensions
                        .insert(dimension.clone(), DimensionBoundaries::new(dimension, observed));
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, dimension: &str) -> Option<&DimensionBoundaries> {
        self.dimensions.get(dimension)
    }

    pub fn get_mut(&mut self, dimension: &str) -> Option<&mut DimensionBoundaries> {
        self.dimensions.get_mut(dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DimensionBoundaries)> {
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

    pub fn toggle_level(&mut self, dimension: &str, level: CriticalityLevel) -> Option<bool> {
        self.dimensions
            .get_mut(dimension)
            .map(|d| d.toggle_level(level))
    }

    pub fn set_cut(&mut self, dimension: &str, index: usize, value: f64) -> bool {
        self.dimensions
            .get_mut(dimension)
            .is_some_and(|d| d.set_cut(index, value))
    }

    pub fn reset_cuts(&mut self, dimension: &str) {
        if let Some(d) = self.dimensions.get_mut(dimension) {
            d.reset_cuts();
        }
    }

    /// Criticality map of all completely configured dimensions
    #[must_use]
    pub fn build_map(&self) -> CriticalityMap {
        let mut map = CriticalityMap::new();
        for (dimension, boundaries) in &self.dimensions {
            match boundaries.rules() {
                Some(rules) => map.insert(dimension.clone(), rules),
                None => tracing::debug!("Dimension {dimension} is not fully configured, skipping"),
            }
        }
        map
    }
}
