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

//! Root-cause drill-down over the trace-level impact matrix.
//!
//! The matrix has one row per trace. Cells are numbers, strings, activity
//! sequences or null. Deviation indicator columns hold only 0/1.

use super::stats::{format_number, histogram, mean, pearson, HistogramBin};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dimensions the backend may add as matrix columns
pub const KNOWN_DIMENSIONS: [&str; 5] = ["time", "costs", "quality", "outcome", "compliance"];

/// Dimensions measured as 0/1 per trace
const BINARY_DIMENSIONS: [&str; 3] = ["outcome", "quality", "compliance"];

/// Number of traces shown in the lowest/highest tables
pub const EXTREME_TRACE_COUNT: usize = 5;

/// Default cap on scatter points
pub const DEFAULT_SCATTER_LIMIT: usize = 500;

/// A single matrix cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Sequence(Vec<String>),
    Other(serde_json::Value),
}

impl CellValue {
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        if let Self::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 0 or 1 as a bool, anything else `None`
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self.as_number() {
            Some(n) if n == 0.0 => Some(false),
            Some(n) if n == 1.0 => Some(true),
            Some(_) | None => None,
        }
    }

    /// Text for table cells
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Null => "–".to_string(),
            Self::Number(n) => format_number(*n, 2),
            Self::Text(s) => s.clone(),
            Self::Sequence(acts) => acts.join(" › "),
            Self::Other(v) => v.to_string(),
        }
    }
}

pub type MatrixRow = IndexMap<String, CellValue>;

static NULL_CELL: CellValue = CellValue::Null;

/// Trace-level table returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactMatrix {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

impl ImpactMatrix {
    /// Declared column order, falling back to the keys of the first row
    #[must_use]
    pub fn ordered_columns(&self) -> Vec<String> {
        if !self.columns.is_empty() {
            return self.columns.clone();
        }
        self.rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn cell<'a>(&'a self, row: usize, column: &str) -> &'a CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_CELL)
    }

    fn column_cells<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&NULL_CELL))
    }

    /// Numeric cells of a column, in row order
    #[must_use]
    pub fn numbers(&self, column: &str) -> Vec<f64> {
        self.column_cells(column)
            .filter_map(CellValue::as_number)
            .collect()
    }

    #[must_use]
    pub fn is_numeric_column(&self, column: &str) -> bool {
        self.column_cells(column).any(|c| c.as_number().is_some())
    }

    /// At least one value, and every non-null value is 0 or 1
    #[must_use]
    pub fn is_binary_column(&self, column: &str) -> bool {
        let mut seen = false;
        for cell in self.column_cells(column).filter(|c| !c.is_null()) {
            if cell.as_flag().is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    #[must_use]
    pub fn is_sequence_column(&self, column: &str) -> bool {
        matches!(
            self.rows.first().and_then(|row| row.get(column)),
            Some(CellValue::Sequence(_))
        )
    }

    /// Binary columns that are not dimensions
    #[must_use]
    pub fn deviation_columns(&self) -> Vec<String> {
        self.ordered_columns()
            .into_iter()
            .filter(|c| !KNOWN_DIMENSIONS.contains(&c.as_str()))
            .filter(|c| self.is_binary_column(c))
            .collect()
    }

    /// Counts of 0 and 1 in a column
    #[must_use]
    pub fn flag_counts(&self, column: &str) -> BinaryCounts {
        self.column_cells(column)
            .filter_map(CellValue::as_flag)
            .fold(BinaryCounts::default(), |mut acc, flag| {
                if flag {
                    acc.ones += 1;
                } else {
                    acc.zeros += 1;
                }
                acc
            })
    }

    /// Mean of `column` over rows where `group_column` equals `flag`; 0 if none
    fn group_mean(&self, column: &str, group_column: &str, flag: bool) -> f64 {
        let values: Vec<f64> = self
            .rows
            .iter()
            .filter(|row| row.get(group_column).and_then(CellValue::as_flag) == Some(flag))
            .filter_map(|row| row.get(column).and_then(CellValue::as_number))
            .collect();
        mean(&values).unwrap_or(0.0)
    }
}

#[must_use]
pub fn is_binary_dimension(dimension: &str) -> bool {
    BINARY_DIMENSIONS.contains(&dimension.to_lowercase().as_str())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryCounts {
    pub zeros: usize,
    pub ones: usize,
}

/// How a dimension's values are spread across traces
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    Binary(BinaryCounts),
    Histogram(Vec<HistogramBin>),
}

/// Relation between a chosen column and the dimension
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionRelation {
    /// Mean of the column for dimension 0 and 1
    GroupMeans { zero: f64, one: f64 },
    /// `(column, dimension)` pairs, truncated to the sample limit
    Scatter { points: Vec<(f64, f64)>, total: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub column: String,
    pub mean_without_deviation: f64,
    pub mean_with_deviation: f64,
    /// Pearson r between the column and the dimension
    pub pearson_r: Option<f64>,
    pub relation: DimensionRelation,
}

impl Correlation {
    /// Whether `column` can be correlated against the selected cell
    #[must_use]
    pub fn is_available(
        matrix: &ImpactMatrix,
        dimension: &str,
        deviation: &str,
        column: &str,
    ) -> bool {
        column != dimension
            && column != deviation
            && !matrix.is_sequence_column(column)
            && matrix.is_numeric_column(column)
    }

    #[must_use]
    pub fn compute(
        matrix: &ImpactMatrix,
        dimension: &str,
        deviation: &str,
        column: &str,
        sample_limit: usize,
    ) -> Option<Self> {
        if !Self::is_available(matrix, dimension, deviation, column) {
            return None;
        }
        profiling::scope!("Correlation::compute");

        let pairs: Vec<(f64, f64)> = matrix
            .rows
            .iter()
            .filter_map(|row| {
                let x = row.get(column)?.as_number()?;
                let y = row.get(dimension)?.as_number()?;
                Some((x, y))
            })
            .collect();
        let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();

        let relation = if is_binary_dimension(dimension) {
            DimensionRelation::GroupMeans {
                zero: matrix.group_mean(column, dimension, false),
                one: matrix.group_mean(column, dimension, true),
            }
        } else {
            DimensionRelation::Scatter {
                total: pairs.len(),
                points: pairs.into_iter().take(sample_limit).collect(),
            }
        };

        Some(Self {
            column: column.to_string(),
            mean_without_deviation: matrix.group_mean(column, deviation, false),
            mean_with_deviation: matrix.group_mean(column, deviation, true),
            pearson_r: pearson(&xs, &ys),
            relation,
        })
    }
}

/// Everything the root-cause panel shows for one (dimension, deviation) cell
#[derive(Debug, Clone, PartialEq)]
pub struct RootCauseReport {
    pub dimension: String,
    pub deviation: String,
    pub dimension_distribution: Distribution,
    /// Number of numeric dimension values
    pub dimension_value_count: usize,
    pub deviation_counts: BinaryCounts,
    /// Columns of the trace tables: everything except other deviation indicators
    pub table_columns: Vec<String>,
    /// Columns that can be clicked for correlation
    pub correlatable_columns: Vec<String>,
    /// Row indices with the lowest dimension values, lowest first
    pub lowest: Vec<usize>,
    /// Row indices with the highest dimension values, highest first
    pub highest: Vec<usize>,
    pub correlation: Option<Correlation>,
}

impl RootCauseReport {
    #[must_use]
    pub fn compute(
        matrix: &ImpactMatrix,
        dimension: &str,
        deviation: &str,
        correlate: Option<&str>,
        bins: usize,
        sample_limit: usize,
    ) -> Self {
        profiling::scope!("RootCauseReport::compute");

        let dimension_values = matrix.numbers(dimension);
        let dimension_distribution = if is_binary_dimension(dimension) {
            Distribution::Binary(matrix.flag_counts(dimension))
        } else {
            Distribution::Histogram(histogram(&dimension_values, bins))
        };

        let other_deviations: Vec<String> = matrix
            .deviation_columns()
            .into_iter()
            .filter(|c| c != deviation)
            .collect();
        let table_columns: Vec<String> = matrix
            .ordered_columns()
            .into_iter()
            .filter(|c| !other_deviations.contains(c))
            .collect();
        let correlatable_columns = table_columns
            .iter()
            .filter(|c| Correlation::is_available(matrix, dimension, deviation, c))
            .cloned()
            .collect();

        let mut ranked: Vec<(usize, f64)> = matrix
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| {
                row.get(dimension)
                    .and_then(CellValue::as_number)
                    .map(|v| (i, v))
            })
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        let lowest = ranked
            .iter()
            .take(EXTREME_TRACE_COUNT)
            .map(|(i, _)| *i)
            .collect();
        let highest = ranked
            .iter()
            .rev()
            .take(EXTREME_TRACE_COUNT)
            .map(|(i, _)| *i)
            .collect();

        Self {
            dimension: dimension.to_string(),
            deviation: deviation.to_string(),
            dimension_distribution,
            dimension_value_count: dimension_values.len(),
            deviation_counts: matrix.flag_counts(deviation),
            table_columns,
            correlatable_columns,
            lowest,
            highest,
            correlation: correlate.and_then(|column| {
                Correlation::compute(matrix, dimension, deviation, column, sample_limit)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ImpactMatrix {
        let json = r#"{
            "columns": ["case_id", "time", "outcome", "(Skip A)", "(Insert B)", "amount", "activities"],
            "rows": [
                {"case_id": "c1", "time": 10, "outcome": 1, "(Skip A)": 0, "(Insert B)": 1, "amount": 100, "activities": ["a", "b"]},
                {"case_id": "c2", "time": 50, "outcome": 0, "(Skip A)": 1, "(Insert B)": 0, "amount": 400, "activities": ["a"]},
                {"case_id": "c3", "time": 30, "outcome": 1, "(Skip A)": 1, "(Insert B)": null, "amount": 300, "activities": []},
                {"case_id": "c4", "time": 20, "outcome": 0, "(Skip A)": 0, "(Insert B)": 0, "amount": 200, "activities": ["c"]},
                {"case_id": "c5", "time": null, "outcome": 1, "(Skip A)": 0, "(Insert B)": 0, "amount": "n/a", "activities": ["d"]},
                {"case_id": "c6", "time": 60, "outcome": 0, "(Skip A)": 1, "(Insert B)": 0, "amount": 600, "activities": ["e"]},
                {"case_id": "c7", "time": 40, "outcome": 1, "(Skip A)": 0, "(Insert B)": 0, "amount": 350, "activities": ["f"]}
            ]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_cells_parse_by_shape() {
        let m = matrix();
        assert_eq!(m.cell(0, "case_id"), &CellValue::Text("c1".to_string()));
        assert_eq!(m.cell(0, "time"), &CellValue::Number(10.0));
        assert!(matches!(m.cell(0, "activities"), CellValue::Sequence(v) if v.len() == 2));
        assert!(m.cell(2, "(Insert B)").is_null());
        assert!(m.cell(99, "time").is_null());
        assert_eq!(m.cell(0, "activities").display(), "a › b");
    }

    #[test]
    fn test_column_classification() {
        let m = matrix();
        assert!(m.is_numeric_column("amount"));
        assert!(!m.is_binary_column("amount"));
        assert!(m.is_binary_column("(Insert B)"));
        assert!(m.is_sequence_column("activities"));
        assert!(!m.is_numeric_column("case_id"));
        // outcome is binary but a known dimension
        assert_eq!(m.deviation_columns(), vec!["(Skip A)", "(Insert B)"]);
    }

    #[test]
    fn test_report_for_numeric_dimension() {
        let m = matrix();
        let report = RootCauseReport::compute(&m, "time", "(Skip A)", None, 12, 500);

        assert_eq!(report.dimension_value_count, 6);
        match &report.dimension_distribution {
            Distribution::Histogram(bins) => {
                assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 6);
            }
            Distribution::Binary(_) => panic!("time is not binary"),
        }
        assert_eq!(report.deviation_counts, BinaryCounts { zeros: 4, ones: 3 });
        assert!(!report.table_columns.contains(&"(Insert B)".to_string()));
        assert!(report.table_columns.contains(&"(Skip A)".to_string()));
        assert_eq!(report.correlatable_columns, vec!["outcome", "amount"]);

        let lowest_ids: Vec<String> = report
            .lowest
            .iter()
            .map(|&i| m.cell(i, "case_id").display())
            .collect();
        assert_eq!(lowest_ids, vec!["c1", "c4", "c3", "c7", "c2"]);
        let highest_ids: Vec<String> = report
            .highest
            .iter()
            .map(|&i| m.cell(i, "case_id").display())
            .collect();
        assert_eq!(highest_ids, vec!["c6", "c2", "c7", "c3", "c4"]);
    }

    #[test]
    fn test_report_for_binary_dimension() {
        let m = matrix();
        let report = RootCauseReport::compute(&m, "Outcome", "(Skip A)", None, 12, 500);
        // column lookup is exact, so "Outcome" finds nothing but stays binary
        assert_eq!(report.dimension_distribution, Distribution::Binary(BinaryCounts::default()));

        let report = RootCauseReport::compute(&m, "outcome", "(Skip A)", None, 12, 500);
        assert_eq!(
            report.dimension_distribution,
            Distribution::Binary(BinaryCounts { zeros: 3, ones: 4 })
        );
    }

    #[test]
    fn test_correlation_with_scatter() {
        let m = matrix();
        let c = Correlation::compute(&m, "time", "(Skip A)", "amount", 3).unwrap();
        // amount with Skip A: 400, 300, 600; without: 100, 200, 350 (c5 is text)
        assert!((c.mean_with_deviation - 1300.0 / 3.0).abs() < 1e-9);
        assert!((c.mean_without_deviation - 650.0 / 3.0).abs() < 1e-9);
        assert!(c.pearson_r.unwrap() > 0.9);
        match c.relation {
            DimensionRelation::Scatter { points, total } => {
                assert_eq!(total, 6);
                assert_eq!(points.len(), 3);
                assert_eq!(points[0], (100.0, 10.0));
            }
            DimensionRelation::GroupMeans { .. } => panic!("time is numeric"),
        }
    }

    #[test]
    fn test_correlation_with_binary_dimension() {
        let m = matrix();
        let c = Correlation::compute(&m, "outcome", "(Skip A)", "time", 500).unwrap();
        match c.relation {
            DimensionRelation::GroupMeans { zero, one } => {
                assert!((zero - 130.0 / 3.0).abs() < 1e-9);
                assert!((one - 80.0 / 3.0).abs() < 1e-9);
            }
            DimensionRelation::Scatter { .. } => panic!("outcome is binary"),
        }
    }

    #[test]
    fn test_correlation_unavailable_columns() {
        let m = matrix();
        assert!(Correlation::compute(&m, "time", "(Skip A)", "time", 500).is_none());
        assert!(Correlation::compute(&m, "time", "(Skip A)", "(Skip A)", 500).is_none());
        assert!(Correlation::compute(&m, "time", "(Skip A)", "activities", 500).is_none());
        assert!(Correlation::compute(&m, "time", "(Skip A)", "case_id", 500).is_none());
    }

    #[test]
    fn test_columns_fall_back_to_first_row() {
        let m: ImpactMatrix = serde_json::from_str(r#"{"rows": [{"b": 1, "a": 2}]}"#).unwrap();
        assert_eq!(m.ordered_columns(), vec!["b", "a"]);
    }
}
