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

//! Wire types of the analysis backend.

use crate::analysis::EffectRecord;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alignment move type of a deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviationKind {
    /// Model move: an expected activity never happened
    Skip,
    /// Log move: an activity happened that the model does not allow
    Insertion,
}

impl DeviationKind {
    const fn column_prefix(self) -> &'static str {
        match self {
            Self::Skip => "Skip",
            Self::Insertion => "Insert",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Insertion => "insertion",
        }
    }
}

/// A deviation picked for causal analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviationSelection {
    /// Impact-matrix column of the deviation indicator, e.g. `(Skip A)`
    pub column: String,
    /// Human-readable label
    pub label: String,
    pub kind: DeviationKind,
}

impl DeviationSelection {
    #[must_use]
    pub fn from_activity(activity: &str, kind: DeviationKind) -> Self {
        let prefix = kind.column_prefix();
        Self {
            column: format!("({prefix} {activity})"),
            label: format!("{prefix} {activity}"),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviationCount {
    pub activity: String,
    pub count: u64,
}

/// Response of `GET /api/deviation-overview`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviationOverview {
    #[serde(default)]
    pub skips: Vec<DeviationCount>,
    #[serde(default)]
    pub insertions: Vec<DeviationCount>,
}

impl DeviationOverview {
    #[must_use]
    pub fn items(&self, kind: DeviationKind) -> &[DeviationCount] {
        match kind {
            DeviationKind::Skip => &self.skips,
            DeviationKind::Insertion => &self.insertions,
        }
    }
}

/// Response of `POST /upload`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    #[serde(default)]
    pub message: String,
    /// Number of aligned traces
    #[serde(default)]
    pub alignment_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl ComparisonOperator {
    pub const ALL: [Self; 6] = [
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Less,
        Self::LessOrEqual,
    ];

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

/// Right-hand side of a rule computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

impl RuleValue {
    /// Numbers when the text parses as one, text otherwise
    #[must_use]
    pub fn parse(input: &str) -> Self {
        input
            .trim()
            .parse::<f64>()
            .map_or_else(|_| Self::Text(input.to_string()), Self::Number)
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// How the backend derives a dimension's per-trace value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "computationType", rename_all = "lowercase")]
pub enum DimensionComputation {
    /// Use a log attribute as is
    Existing { column: String },
    /// Arithmetic over log attributes
    Formula { expression: String },
    /// 1 where `column operator value` holds, else 0
    Rule {
        column: String,
        operator: ComparisonOperator,
        value: RuleValue,
    },
}

impl DimensionComputation {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Existing { .. } => "existing",
            Self::Formula { .. } => "formula",
            Self::Rule { .. } => "rule",
        }
    }
}

/// Body of `POST /api/compute-causal-effects`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalEffectsRequest {
    pub deviations: Vec<String>,
    pub dimensions: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dimension_configs: IndexMap<String, DimensionComputation>,
}

/// Response of `POST /api/compute-causal-effects`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalEffectsResponse {
    #[serde(default)]
    pub results: Vec<EffectRecord>,
}

/// Error payload the backend sends with non-2xx answers
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_column_naming() {
        let skip = DeviationSelection::from_activity("Check invoice", DeviationKind::Skip);
        assert_eq!(skip.column, "(Skip Check invoice)");
        let ins = DeviationSelection::from_activity("Pay", DeviationKind::Insertion);
        assert_eq!(ins.column, "(Insert Pay)");
        assert_eq!(ins.kind.as_str(), "insertion");
    }

    #[test]
    fn test_overview_parses() {
        let json = r#"{"skips": [{"activity": "A", "count": 12}], "insertions": []}"#;
        let overview: DeviationOverview = serde_json::from_str(json).unwrap();
        assert_eq!(overview.items(DeviationKind::Skip)[0].count, 12);
        assert!(overview.items(DeviationKind::Insertion).is_empty());
    }

    #[test]
    fn test_upload_summary_parses() {
        let json = r#"{"message": "Files uploaded and alignments computed", "alignment_count": 1050}"#;
        let summary: UploadSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.alignment_count, 1050);
        assert_eq!(serde_json::from_str::<UploadSummary>("{}").unwrap(), UploadSummary::default());
    }

    #[test]
    fn test_computation_is_tagged() {
        let rule = DimensionComputation::Rule {
            column: "amount".to_string(),
            operator: ComparisonOperator::GreaterOrEqual,
            value: RuleValue::parse("5000"),
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["computationType"], "rule");
        assert_eq!(json["operator"], ">=");
        assert_eq!(json["value"], 5000.0);

        let formula: DimensionComputation = serde_json::from_str(
            r#"{"computationType": "formula", "expression": "end - start"}"#,
        )
        .unwrap();
        assert_eq!(
            formula,
            DimensionComputation::Formula {
                expression: "end - start".to_string()
            }
        );
    }

    #[test]
    fn test_request_omits_empty_configs() {
        let request = CausalEffectsRequest {
            deviations: vec!["(Skip A)".to_string()],
            dimensions: vec!["time".to_string()],
            dimension_configs: IndexMap::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"deviations":["(Skip A)"],"dimensions":["time"]}"#);
    }

    #[test]
    fn test_rule_value_parse() {
        assert_eq!(RuleValue::parse(" 2.5 "), RuleValue::Number(2.5));
        assert_eq!(RuleValue::parse("gold"), RuleValue::Text("gold".to_string()));
        assert_eq!(RuleValue::Number(3.0).to_string(), "3");
    }
}
