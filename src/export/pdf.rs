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

//! Printable report: criticality table on the first page, prioritization on the
//! second. Tables longer than a page continue on extra pages.

use crate::analysis::stats::format_number;
use crate::analysis::{CriticalityLevel, CriticalityMap, EffectTable, PriorityEntry};
use anyhow::{anyhow, Context};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::path::Path;

pub const DEFAULT_PDF_NAME: &str = "causal_analysis.pdf";

// A4 landscape, millimetres
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 14.0;
const TITLE_SIZE: f32 = 14.0;
const TEXT_SIZE: f32 = 8.0;
const ROW_HEIGHT: f32 = 6.0;
/// Average Helvetica glyph width at `TEXT_SIZE`
const CHAR_WIDTH: f32 = 1.5;

/// A titled table as it goes on paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfTable {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One printed page: a slice of a table's rows below the repeated header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfPage<'a> {
    pub table: &'a PdfTable,
    pub rows: &'a [Vec<String>],
    /// Continuation pages get "(continued)" after the title
    pub continued: bool,
}

/// Rows per page below the title and the header
#[must_use]
pub fn rows_per_page() -> usize {
    let usable = PAGE_HEIGHT - 2.0 * MARGIN - 2.0 * ROW_HEIGHT - ROW_HEIGHT;
    (usable / ROW_HEIGHT).floor().max(1.0) as usize
}

/// Dimension rows, deviation columns, `label (ATE)` cells
#[must_use]
pub fn criticality_table(effects: &EffectTable, map: &CriticalityMap) -> PdfTable {
    let deviations = effects.deviations();
    let header = std::iter::once("Dimension".to_string())
        .chain(deviations.iter().cloned())
        .collect();

    let rows = effects
        .dimensions()
        .into_iter()
        .map(|dimension| {
            let cells = deviations.iter().map(|deviation| {
                effects
                    .find(&dimension, deviation)
                    .map(|record| match record.ate {
                        Some(ate) => {
                            let label = map
                                .classify(&dimension, ate)
                                .map_or("-", CriticalityLevel::as_str);
                            format!("{label} ({})", format_number(ate, 2))
                        }
                        None => "- (-)".to_string(),
                    })
                    .unwrap_or_default()
            });
            std::iter::once(dimension.clone()).chain(cells).collect()
        })
        .collect();

    PdfTable {
        title: "Criticality Results".to_string(),
        header,
        rows,
    }
}

#[must_use]
pub fn priority_table(priorities: &[PriorityEntry]) -> PdfTable {
    PdfTable {
        title: "Prioritization".to_string(),
        header: vec!["Rank".to_string(), "Deviation".to_string(), "Score".to_string()],
        rows: priorities
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                vec![
                    (idx + 1).to_string(),
                    entry.deviation.clone(),
                    entry.score.to_string(),
                ]
            })
            .collect(),
    }
}

/// Split every table into pages; an empty table still gets one page
#[must_use]
pub fn paginate(tables: &[PdfTable], per_page: usize) -> Vec<PdfPage<'_>> {
    let per_page = per_page.max(1);
    let mut pages = Vec::new();
    for table in tables {
        if table.rows.is_empty() {
            pages.push(PdfPage {
                table,
                rows: &[],
                continued: false,
            });
            continue;
        }
        for (idx, rows) in table.rows.chunks(per_page).enumerate() {
            pages.push(PdfPage {
                table,
                rows,
                continued: idx > 0,
            });
        }
    }
    pages
}

/// Cut `text` to `max_chars`, marking the cut with "...".
///
/// Built-in PDF fonts only cover Latin-1, anything else becomes '?'.
#[must_use]
pub fn fit(text: &str, max_chars: usize) -> String {
    let printable: String = text
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect();
    if printable.len() <= max_chars {
        return printable;
    }
    if max_chars <= 3 {
        return printable.chars().take(max_chars).collect();
    }
    let mut cut: String = printable.chars().take(max_chars - 3).collect();
    cut.push_str("...");
    cut
}

pub fn criticality_pdf(
    effects: &EffectTable,
    map: &CriticalityMap,
    priorities: &[PriorityEntry],
) -> anyhow::Result<Vec<u8>> {
    profiling::scope!("criticality_pdf");
    let tables = [criticality_table(effects, map), priority_table(priorities)];
    let pages = paginate(&tables, rows_per_page());

    let (doc, first_page, first_layer) = PdfDocument::new(
        "Causal analysis",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("Failed to load PDF font: {e}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("Failed to load PDF font: {e}"))?;

    for (idx, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if idx == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        draw_page(&layer, page, &regular, &bold);
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| anyhow!("Failed to render PDF: {e}"))?;
    tracing::debug!("Rendered {} PDF pages, {} bytes", pages.len(), bytes.len());
    Ok(bytes)
}

fn draw_page(
    layer: &PdfLayerReference,
    page: &PdfPage<'_>,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let title = if page.continued {
        format!("{} (continued)", page.table.title)
    } else {
        page.table.title.clone()
    };
    let mut y = PAGE_HEIGHT - MARGIN;
    layer.use_text(title, TITLE_SIZE, Mm(MARGIN), Mm(y), bold);
    y -= 2.0 * ROW_HEIGHT;

    let columns = page.table.header.len().max(1);
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
    let max_chars = ((column_width - 2.0) / CHAR_WIDTH).floor().max(1.0) as usize;

    let draw_row = |cells: &[String], y: f32, font: &IndirectFontRef| {
        for (col, cell) in cells.iter().enumerate() {
            let x = MARGIN + col as f32 * column_width;
            layer.use_text(fit(cell, max_chars), TEXT_SIZE, Mm(x), Mm(y), font);
        }
    };

    draw_row(&page.table.header, y, bold);
    for row in page.rows {
        y -= ROW_HEIGHT;
        draw_row(row, y, regular);
    }
}

pub fn write_pdf(
    path: &Path,
    effects: &EffectTable,
    map: &CriticalityMap,
    priorities: &[PriorityEntry],
) -> anyhow::Result<()> {
    let bytes = criticality_pdf(effects, map, priorities)?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Exported criticality report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BoundaryBuilder, EffectRecord, PriorityList};

    fn sample() -> (EffectTable, CriticalityMap, PriorityList) {
        let table = EffectTable::new(vec![
            EffectRecord::new("(Skip A)", "time", -5000.0, 0.01),
            EffectRecord::new("(Insert B)", "time", 5000.0, 0.2),
            EffectRecord {
                ate: None,
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
    fn test_criticality_table_cells() {
        let (table, map, _) = sample();
        let pdf_table = criticality_table(&table, &map);
        assert_eq!(pdf_table.header, ["Dimension", "(Skip A)", "(Insert B)"]);
        assert_eq!(
            pdf_table.rows[0],
            ["time", "very positive (-5,000)", "very negative (5,000)"]
        );
        // No ATE for (Skip A), no record at all for (Insert B)
        assert_eq!(pdf_table.rows[1], ["outcome", "- (-)", ""]);
    }

    #[test]
    fn test_priority_table_ranks_in_list_order() {
        let (_, _, priorities) = sample();
        let pdf_table = priority_table(priorities.entries());
        assert_eq!(pdf_table.header, ["Rank", "Deviation", "Score"]);
        assert_eq!(pdf_table.rows[0], ["1", "(Insert B)", "3"]);
        assert_eq!(pdf_table.rows[1], ["2", "(Skip A)", "-3"]);
    }

    #[test]
    fn test_two_pages_unless_a_table_overflows() {
        let (table, map, priorities) = sample();
        let tables = [criticality_table(&table, &map), priority_table(priorities.entries())];
        let pages = paginate(&tables, rows_per_page());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].table.title, "Prioritization");
        assert!(!pages[1].continued);

        let long = PdfTable {
            title: "Prioritization".to_string(),
            header: vec!["Rank".to_string()],
            rows: (0..5).map(|i| vec![i.to_string()]).collect(),
        };
        let empty = PdfTable {
            rows: Vec::new(),
            ..long.clone()
        };
        let tables = [empty, long];
        let pages = paginate(&tables, 2);
        assert_eq!(pages.len(), 4);
        assert!(pages[0].rows.is_empty());
        assert!(pages[3].continued);
        assert_eq!(pages[3].rows.len(), 1);
    }

    #[test]
    fn test_fit_truncates_and_replaces_unprintable() {
        assert_eq!(fit("time", 10), "time");
        assert_eq!(fit("(Skip Check invoice)", 10), "(Skip C...");
        assert_eq!(fit("∞", 5), "?");
        assert_eq!(fit("abcdef", 2), "ab");
    }

    #[test]
    fn test_pdf_is_written() {
        let (table, map, priorities) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_PDF_NAME);
        write_pdf(&path, &table, &map, priorities.entries()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_pdf_into_missing_directory_fails() {
        let (table, map, priorities) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join(DEFAULT_PDF_NAME);
        let err = write_pdf(&path, &table, &map, priorities.entries()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to write"));
    }
}
