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

//! Drill-down into one cell of the criticality table.

use super::ViewEvent;
use crate::analysis::root_cause::{DimensionRelation, Distribution};
use crate::analysis::stats::format_number;
use crate::analysis::{CellValue, Correlation, ImpactMatrix, RootCauseReport};
use crate::state::{Fetched, SelectedCell, Session, SessionUpdate};
use crate::ui::components::{bar_chart, binary_bars, scatter_plot};
use crate::ui::palette::{correlation_color, SKIP_COLOR};
use crate::ui::toasts::error_label;
use egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

/// Report to draw, if one is available for the selected cell
pub struct ReportView<'a> {
    pub report: Option<&'a RootCauseReport>,
    /// A newer report is being computed
    pub computing: bool,
}

pub fn show(ui: &mut Ui, session: &Session, view: &ReportView<'_>) -> Vec<ViewEvent> {
    let mut events = Vec::new();
    let Some(cell) = session.selected_cell() else {
        return events;
    };

    render_header(ui, session, cell, &mut events);
    ui.add_space(6.0);

    let matrix = match session.matrix() {
        Fetched::NotRequested | Fetched::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading impact matrix...");
            });
            return events;
        }
        Fetched::Failed(err) => {
            error_label(ui, err);
            if ui.button("Retry").clicked() {
                events.push(SessionUpdate::RefreshMatrix.into());
            }
            return events;
        }
        Fetched::Ready(matrix) => matrix,
    };

    let Some(report) = view.report else {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Analysing traces...");
        });
        return events;
    };

    if view.computing {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.weak("Updating...");
        });
    }

    render_distributions(ui, report);
    ui.add_space(8.0);
    render_correlation(ui, report, session.correlation(), &mut events);
    ui.add_space(8.0);

    let active = session.correlation();
    render_trace_table(
        ui,
        "lowest_traces",
        &format!("{} traces with lowest {}", report.lowest.len(), report.dimension),
        matrix,
        report,
        &report.lowest,
        active,
        &mut events,
    );
    ui.add_space(8.0);
    render_trace_table(
        ui,
        "highest_traces",
        &format!("{} traces with highest {}", report.highest.len(), report.dimension),
        matrix,
        report,
        &report.highest,
        active,
        &mut events,
    );

    events
}

fn render_header(ui: &mut Ui, session: &Session, cell: &SelectedCell, events: &mut Vec<ViewEvent>) {
    ui.horizontal(|ui| {
        ui.heading("Root cause analysis");
        ui.separator();
        ui.label(RichText::new(format!("Dimension: {}", cell.dimension)).strong());
        ui.label(RichText::new(format!("Deviation: {}", cell.deviation)).color(SKIP_COLOR));
        if let Some(matrix) = session.matrix().ready() {
            ui.weak(format!("{} traces", matrix.rows.len()));
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("✖").on_hover_text("Close").clicked() {
                events.push(
                    SessionUpdate::SelectCell {
                        dimension: cell.dimension.clone(),
                        deviation: cell.deviation.clone(),
                    }
                    .into(),
                );
            }
        });
    });
}

fn render_distributions(ui: &mut Ui, report: &RootCauseReport) {
    ui.columns(2, |columns| {
        let left = &mut columns[0];
        match &report.dimension_distribution {
            Distribution::Binary(counts) => {
                left.strong(format!("Distribution of {} (binary)", report.dimension));
                binary_bars(left, *counts, "0", "1");
            }
            Distribution::Histogram(bins) => {
                left.strong(format!(
                    "Distribution of {}: {} values",
                    report.dimension, report.dimension_value_count
                ));
                bar_chart(left, bins, 140.0);
            }
        }

        let right = &mut columns[1];
        right.strong(format!("Distribution of {}", report.deviation));
        binary_bars(right, report.deviation_counts, "0: no deviation", "1: deviation");
    });
}

fn render_correlation(
    ui: &mut Ui,
    report: &RootCauseReport,
    active: Option<&str>,
    events: &mut Vec<ViewEvent>,
) {
    let Some(correlation) = &report.correlation else {
        if active.is_some() {
            ui.weak("The selected column cannot be correlated.");
        } else if !report.correlatable_columns.is_empty() {
            ui.weak("Click a column header marked ~ to correlate it with the dimension.");
        }
        return;
    };

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.strong(format!("Correlation: {}", correlation.column));
            if let Some(r) = correlation.pearson_r {
                ui.label(RichText::new(format!("r = {r:.3}")).color(correlation_color(r)));
            }
            if ui.small_button("clear").clicked() {
                events.push(SessionUpdate::SelectCorrelation(None).into());
            }
        });
        render_group_means(ui, report, correlation);
    });
}

fn render_group_means(ui: &mut Ui, report: &RootCauseReport, correlation: &Correlation) {
    egui::Grid::new("correlation_means")
        .num_columns(2)
        .spacing([16.0, 4.0])
        .show(ui, |ui| {
            ui.label(format!("Mean without {}", report.deviation));
            ui.label(format_number(correlation.mean_without_deviation, 2));
            ui.end_row();
            ui.label(format!("Mean with {}", report.deviation));
            ui.label(format_number(correlation.mean_with_deviation, 2));
            ui.end_row();

            if let DimensionRelation::GroupMeans { zero, one } = correlation.relation {
                ui.label(format!("Mean when {} = 0", report.dimension));
                ui.label(format_number(zero, 2));
                ui.end_row();
                ui.label(format!("Mean when {} = 1", report.dimension));
                ui.label(format_number(one, 2));
                ui.end_row();
            }
        });

    if let DimensionRelation::Scatter { points, total } = &correlation.relation {
        scatter_plot(ui, points, &correlation.column, &report.dimension);
        if points.len() < *total {
            ui.small(format!("Showing {} of {total} traces", points.len()));
        }
    }
}

fn render_trace_table(
    ui: &mut Ui,
    id: &str,
    title: &str,
    matrix: &ImpactMatrix,
    report: &RootCauseReport,
    rows: &[usize],
    active: Option<&str>,
    events: &mut Vec<ViewEvent>,
) {
    ui.strong(title);
    if rows.is_empty() {
        ui.weak("No traces with a numeric value.");
        return;
    }

    let columns = &report.table_columns;
    let row_height = ui.text_style_height(&egui::TextStyle::Body) + 4.0;
    ui.push_id(id, |ui| {
        egui::ScrollArea::horizontal().show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .columns(Column::auto().at_least(60.0).clip(true), columns.len())
                .header(20.0, |mut header| {
                    for column in columns {
                        header.col(|ui| {
                            render_column_header(ui, report, column, active, events);
                        });
                    }
                })
                .body(|mut body| {
                    for &row_index in rows {
                        body.row(row_height, |mut row| {
                            for column in columns {
                                row.col(|ui| {
                                    render_cell(
                                        ui,
                                        matrix.cell(row_index, column),
                                        column == &report.deviation,
                                    );
                                });
                            }
                        });
                    }
                });
        });
    });
}

fn render_column_header(
    ui: &mut Ui,
    report: &RootCauseReport,
    column: &str,
    active: Option<&str>,
    events: &mut Vec<ViewEvent>,
) {
    let clickable = report.correlatable_columns.iter().any(|c| c == column);
    if !clickable {
        ui.strong(column);
        return;
    }

    let is_active = active == Some(column);
    let marker = if is_active { "↑" } else { "~" };
    let response = ui
        .selectable_label(is_active, RichText::new(format!("{column} {marker}")).strong())
        .on_hover_text("Correlate with the dimension");
    if response.clicked() {
        let next = (!is_active).then(|| column.to_string());
        events.push(SessionUpdate::SelectCorrelation(next).into());
    }
}

fn render_cell(ui: &mut Ui, value: &CellValue, is_deviation: bool) {
    if is_deviation {
        match value.as_flag() {
            Some(true) => {
                ui.label(RichText::new("✓").color(SKIP_COLOR).strong());
            }
            Some(false) | None => {
                ui.label("–");
            }
        }
        return;
    }
    let text = value.display();
    if matches!(value, CellValue::Sequence(_)) {
        ui.label(RichText::new(&text).small()).on_hover_text(text);
    } else {
        ui.label(text);
    }
}
