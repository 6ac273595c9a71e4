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

//! Qualitative criticality levels and dimension direction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dimensions where a lower value is the desired outcome
const DECREASE_IS_GOOD: [&str; 2] = ["time", "costs"];

/// Seven ordered criticality buckets, declared in canonical negative-to-positive order.
///
/// The derived `Ord` follows declaration order, so a `BTreeSet<CriticalityLevel>`
/// always iterates canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CriticalityLevel {
    #[serde(rename = "very negative")]
    VeryNegative,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "slightly negative")]
    SlightlyNegative,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "slightly positive")]
    SlightlyPositive,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "very positive")]
    VeryPositive,
}

impl CriticalityLevel {
    /// All levels in canonical order
    pub const ALL: [Self; 7] = [
        Self::VeryNegative,
        Self::Negative,
        Self::SlightlyNegative,
        Self::Neutral,
        Self::SlightlyPositive,
        Self::Positive,
        Self::VeryPositive,
    ];

    /// Priority weight: negative impact raises the score, positive impact lowers it
    #[must_use]
    pub const fn weight(self) -> i32 {
        match self {
            Self::VeryNegative => 3,
            Self::Negative => 2,
            Self::SlightlyNegative => 1,
            Self::Neutral => 0,
            Self::SlightlyPositive => -1,
            Self::Positive => -2,
            Self::VeryPositive => -3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryNegative => "very negative",
            Self::Negative => "negative",
            Self::SlightlyNegative => "slightly negative",
            Self::Neutral => "neutral",
            Self::SlightlyPositive => "slightly positive",
            Self::Positive => "positive",
            Self::VeryPositive => "very positive",
        }
    }
}

/// Weight of an optional classification; unclassified values weigh nothing
#[must_use]
pub fn weight_of(level: Option<CriticalityLevel>) -> i32 {
    level.map_or(0, CriticalityLevel::weight)
}

impl fmt::Display for CriticalityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriticalityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown criticality level: {s}"))
    }
}

/// Which direction of change counts as an improvement for a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Desirability {
    /// Lower values are better (time, costs)
    Decrease,
    /// Higher values are better (everything else)
    Increase,
}

impl Desirability {
    #[must_use]
    pub fn for_dimension(dimension: &str) -> Self {
        let lower = dimension.to_lowercase();
        if DECREASE_IS_GOOD.contains(&lower.as_str()) {
            Self::Decrease
        } else {
            Self::Increase
        }
    }
}

/// Order in which the selected levels attach to ascending value intervals.
///
/// Canonical order for increase-is-good dimensions, reversed otherwise, so the
/// lowest interval of a time dimension reads "very positive".
pub fn display_order<I>(levels: I, desirability: Desirability) -> Vec<CriticalityLevel>
where
    I: IntoIterator<Item = CriticalityLevel>,
{
    let mut ordered: Vec<CriticalityLevel> = levels.into_iter().collect();
    ordered.sort_unstable();
    ordered.dedup();
    if desirability == Desirability::Decrease {
        ordered.reverse();
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_are_symmetric() {
        for level in CriticalityLevel::ALL {
            let mirrored = CriticalityLevel::ALL[6 - CriticalityLevel::ALL
                .iter()
                .position(|l| *l == level)
                .unwrap()];
            assert_eq!(level.weight(), -mirrored.weight());
        }
        assert_eq!(weight_of(None), 0);
    }

    #[test]
    fn test_label_round_trip_through_serde() {
        let json = serde_json::to_string(&CriticalityLevel::SlightlyNegative).unwrap();
        assert_eq!(json, "\"slightly negative\"");
        let parsed: CriticalityLevel = serde_json::from_str("\"very positive\"").unwrap();
        assert_eq!(parsed, CriticalityLevel::VeryPositive);
        assert_eq!("neutral".parse::<CriticalityLevel>(), Ok(CriticalityLevel::Neutral));
        assert!("meh".parse::<CriticalityLevel>().is_err());
    }

    #[test]
    fn test_desirability_is_case_insensitive() {
        assert_eq!(Desirability::for_dimension("Time"), Desirability::Decrease);
        assert_eq!(Desirability::for_dimension("COSTS"), Desirability::Decrease);
        assert_eq!(Desirability::for_dimension("cost"), Desirability::Increase);
        assert_eq!(Desirability::for_dimension("outcome"), Desirability::Increase);
    }

    #[test]
    fn test_display_order_reverses_for_decrease() {
        let levels = [
            CriticalityLevel::Positive,
            CriticalityLevel::VeryNegative,
            CriticalityLevel::Neutral,
        ];
        assert_eq!(
            display_order(levels, Desirability::Increase),
            vec![
                CriticalityLevel::VeryNegative,
                CriticalityLevel::Neutral,
                CriticalityLevel::Positive
            ]
        );
        assert_eq!(
            display_order(levels, Desirability::Decrease),
            vec![
                CriticalityLevel::Positive,
                CriticalityLevel::Neutral,
                CriticalityLevel::VeryNegative
            ]
        );
    }
}
