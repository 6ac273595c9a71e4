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

//! CSV, PDF and JSON export of criticality results.

pub mod pdf;

pub use pdf::{criticality_pdf, write_pdf, DEFAULT_PDF_NAME};

use crate::analysis::{CriticalityLevel, CriticalityMap, EffectTable, PriorityEntry};
use anyhow::Context;
use std::fmt::Write as _;
use std::path::Path;

/// File name offered by save dialogs
pub const DEFAULT_CSV_NAME: &str = "causal_results.csv";
pub const DEFAULT_MAP_NAME: &str = "criticality_map.json";

/// Quote a CSV field if it contains a separator, quote or line break
#[must_use]
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Criticality table followed by the priority ranking.
///
/// Rows are grouped by dimension. Records without an ATE are left out; values the
/// map does not classify get an empty criticality.
#[must_use]
pub fn criticality_csv(
    effects: &EffectTable,
    map: &CriticalityMap,
    priorities: &[PriorityEntry],
) -> String {
    profiling::scope!("criticality_csv");
    let mut csv = String::from("Dimension,Deviation,Criticality,ATE\n");

    let deviations = effects.deviations();
    for dimension in effects.dimensions() {
        for deviation in &deviations {
            let Some(ate) = effects.find(&dimension, deviation).and_then(|r| r.ate) else {
                continue;
            };
            let label = map
                .classify(&dimension, ate)
                .map(CriticalityLevel::as_str)
                .unwrap_or_default();
            let _ = writeln!(
                csv,
                "{},{},{},{ate}",
                csv_field(&dimension),
                csv_field(deviation),
                csv_field(&label)
            );
        }
    }

    csv.push_str("\n\nPriorities\n");
    csv.push_str("Rank,Deviation,Score\n");
    for (idx, entry) in priorities.iter().enumerate() {
        let _ = writeln!(csv, "{},{},{}", idx + 1, csv_field(&entry.deviation), entry.score);
    }
    csv
}

pub fn write_csv(
    path: &Path,
    effects: &EffectTable,
    map: &CriticalityMap,
    priorities: &[PriorityEntry],
) -> anyhow::Result<()> {
    let csv = criticality_csv(effects, map, priorities);
    std::fs::write(path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Exported criticality results to {}", path.display());
    Ok(())
}

pub fn criticality_map_json(map: &CriticalityMap) -> anyhow::Result<String> {
    serde_json::to_string_pretty(map).context("Failed to serialize criticality map")
}

pub fn write_map_json(path: &Path, map: &CriticalityMap) -> anyhow::Result<()> {
    let json = criticality_map_json(map)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Saved criticality map to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BoundaryBuilder, EffectRecord, PriorityList};

    fn sample() -> (EffectTable, CriticalityMap, PriorityList) {
        let table = EffectTable::new(vec![
            EffectRecord::new("(Skip A)", "time", -5000.0, 0.01),
            EffectRecord::new("(Insert B, C)", "time", 5000.0, 0.2),
            EffectRecord {
                ate: None,
                p_value: None,
                ..EffectRecord::new("(Skip A)", "outcome", 0.0, 1.0)
            },
        ]);
        let mut builder = BoundaryBuilder::new();
        builder.observe(&table, &table.dimensions());
        let map = builder.build_map();
        let mut priorities = PriorityList::new();
        priorities.refresh(&table, &map);
        (table, map, priorities)
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("time"), "time");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_layout() {
        let (table, map, priorities) = sample();
        let csv = criticality_csv(&table, &map, priorities.entries());
        let expected = "Dimension,Deviation,Criticality,ATE\n\
                        time,(Skip A),very positive,-5000\n\
                        time,\"(Insert B, C)\",very negative,5000\n\
                        \n\nPriorities\n\
                        Rank,Deviation,Score\n\
                        1,\"(Insert B, C)\",3\n\
                        2,(Skip A),-3\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_unclassified_value_has_empty_label() {
        let table = EffectTable::new(vec![EffectRecord {
            p_value: None,
            ..EffectRecord::new("(Skip A)", "costs", 1.0, 1.0)
        }]);
        let csv = criticality_csv(&table, &CriticalityMap::new(), &[]);
        assert!(csv.contains("costs,(Skip A),,1\n"));
        assert!(csv.ends_with("Rank,Deviation,Score\n"));
    }

    #[test]
    fn test_files_are_written() {
        let (table, map, priorities) = sample();
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join(DEFAULT_CSV_NAME);
        write_csv(&csv_path, &table, &map, priorities.entries()).unwrap();
        let written = std::fs::read_to_string(&csv_path).unwrap();
        assert!(written.starts_with("Dimension,Deviation,Criticality,ATE\n"));

        let map_path = dir.path().join(DEFAULT_MAP_NAME);
        write_map_json(&map_path, &map).unwrap();
        let parsed: CriticalityMap =
            serde_json::from_str(&std::fs::read_to_string(&map_path).unwrap()).unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let (table, map, priorities) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_csv(&path, &table, &map, priorities.entries()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to write"));
    }
}
