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

use super::{ExportKind, ViewEvent};
use crate::analysis::stats::format_number;
use crate::analysis::{CriticalityLevel, CriticalityMap, EffectTable, PriorityEntry};
use crate::state::{MoveDirection, Session, SessionUpdate};
use crate::ui::palette::{level_color, level_text_color};
use egui::{Color32, RichText, Sense, Stroke, Ui};
use egui_extras::{Column, TableBuilder};

const HELP_TEXT: &str = "Each cell shows the criticality level of a deviation's effect on a \
dimension, using the levels configured in the previous step. The priority table ranks \
deviations by their overall negative impact; use the arrows to adjust the order. \
Click a cell to inspect its root causes.";

/// Criticality table, legend, priorities and export buttons
pub fn show(ui: &mut Ui, session: &Session) -> Vec<ViewEvent> {
    let mut events = Vec::new();
    let Some(table) = session.effects().ready() else {
        ui.label("No causal effects available.");
        return events;
    };

    ui.horizontal(|ui| {
        ui.heading("Criticality overview");
        ui.label("ℹ").on_hover_text(HELP_TEXT);
    });
    ui.add_space(4.0);
    render_legend(ui);
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        if ui.button("Export as CSV").clicked() {
            events.push(ViewEvent::Export(ExportKind::Csv));
        }
        if ui.button("Export as PDF").clicked() {
            events.push(ViewEvent::Export(ExportKind::Pdf));
        }
        if ui.button("Save criticality map").clicked() {
            events.push(ViewEvent::Export(ExportKind::CriticalityMap));
        }
    });
    ui.add_space(8.0);

    let selected = session
        .selected_cell()
        .map(|cell| (cell.dimension.as_str(), cell.deviation.as_str()));
    render_criticality_table(ui, table, session.criticality_map(), selected, &mut events);

    if selected.is_none() {
        ui.weak(
            "Click any coloured cell to open root cause analysis for that dimension and deviation.",
        );
    } else {
        ui.weak("Click the same cell again to close the root cause analysis.");
    }

    ui.add_space(12.0);
    ui.separator();
    ui.heading("Priorities");
    render_priority_table(ui, session.priorities().entries(), &mut events);

    events
}

fn render_legend(ui: &mut Ui) {
    ui.horizontal_wrapped(|ui| {
        ui.label("Legend:");
        for level in CriticalityLevel::ALL.iter().rev() {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), Sense::hover());
            ui.painter().rect_filled(rect, 2.0, level_color(*level));
            ui.small(level.as_str());
            ui.add_space(6.0);
        }
    });
}

fn render_criticality_table(
    ui: &mut Ui,
    table: &EffectTable,
    map: &CriticalityMap,
    selected: Option<(&str, &str)>,
    events: &mut Vec<ViewEvent>,
) {
    let deviations = table.deviations();

    egui::ScrollArea::horizontal()
        .id_salt("criticality_table")
        .show(ui, |ui| {
            egui::Grid::new("criticality_grid")
                .spacing([4.0, 4.0])
                .show(ui, |ui| {
                    ui.strong("Dimension");
                    for deviation in &deviations {
                        ui.strong(deviation);
                    }
                    ui.end_row();

                    for dimension in table.dimensions() {
                        ui.strong(&dimension);
                        for deviation in &deviations {
                            let Some(record) = table.find(&dimension, deviation) else {
                                ui.label("");
                                continue;
                            };
                            let level = record.ate.and_then(|ate| map.classify(&dimension, ate));
                            let is_selected =
                                selected == Some((dimension.as_str(), deviation.as_str()));
                            if criticality_cell(ui, level, record.ate, is_selected).clicked() {
                                events.push(
                                    SessionUpdate::SelectCell {
                                        dimension: dimension.clone(),
                                        deviation: deviation.clone(),
                                    }
                                    .into(),
                                );
                            }
                        }
                        ui.end_row();
                    }
                });
        });
}

fn criticality_cell(
    ui: &mut Ui,
    level: Option<CriticalityLevel>,
    ate: Option<f64>,
    selected: bool,
) -> egui::Response {
    let (fill, text_color) = level.map_or((Color32::GRAY, Color32::WHITE), |l| {
        (level_color(l), level_text_color(l))
    });
    let text = format!(
        "{} ({})",
        level.map_or("-", CriticalityLevel::as_str),
        ate.map_or_else(|| "–".to_string(), |a| format_number(a, 2))
    );
    let stroke = if selected {
        Stroke::new(3.0, ui.visuals().strong_text_color())
    } else {
        Stroke::NONE
    };

    egui::Frame::default()
        .fill(fill)
        .stroke(stroke)
        .inner_margin(egui::Margin::symmetric(8, 4))
        .show(ui, |ui| {
            ui.set_min_width(110.0);
            ui.label(RichText::new(text).color(text_color));
        })
        .response
        .interact(Sense::click())
        .on_hover_cursor(egui::CursorIcon::PointingHand)
}

fn render_priority_table(ui: &mut Ui, entries: &[PriorityEntry], events: &mut Vec<ViewEvent>) {
    if entries.is_empty() {
        ui.weak("Nothing to rank.");
        return;
    }

    let row_height = ui.text_style_height(&egui::TextStyle::Body) + 6.0;
    ui.push_id("priority_table", |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(false)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(50.0))
            .column(Column::initial(220.0).clip(true))
            .column(Column::exact(60.0))
            .column(Column::remainder().clip(true))
            .column(Column::exact(60.0))
            .header(20.0, |mut header| {
                for title in ["Rank", "Deviation", "Score", "Reasons", ""] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|body| {
                body.rows(row_height, entries.len(), |mut row| {
                    let index = row.index();
                    let entry = &entries[index];
                    row.col(|ui| {
                        ui.label((index + 1).to_string());
                    });
                    row.col(|ui| {
                        ui.label(&entry.deviation);
                    });
                    row.col(|ui| {
                        ui.strong(entry.score.to_string());
                    });
                    row.col(|ui| {
                        let reasons = entry.reasons.join(", ");
                        ui.label(reasons.clone()).on_hover_text(reasons);
                    });
                    row.col(|ui| {
                        if ui.add_enabled(index > 0, egui::Button::new("⬆").small()).clicked() {
                            events.push(move_event(index, MoveDirection::Up));
                        }
                        if ui
                            .add_enabled(index + 1 < entries.len(), egui::Button::new("⬇").small())
                            .clicked()
                        {
                            events.push(move_event(index, MoveDirection::Down));
                        }
                    });
                });
            });
    });
}

fn move_event(index: usize, direction: MoveDirection) -> ViewEvent {
    SessionUpdate::MovePriority { index, direction }.into()
}
