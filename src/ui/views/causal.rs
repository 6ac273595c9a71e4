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

use super::ViewEvent;
use crate::analysis::stats::format_number;
use crate::analysis::{effect_tone, CriticalityLevel, DimensionBoundaries, EffectTable};
use crate::state::{Fetched, Session, SessionUpdate};
use crate::ui::palette::{level_color, level_text_color, tone_color};
use crate::ui::toasts::error_label;
use egui::{RichText, Ui};

pub fn show(ui: &mut Ui, session: &Session) -> Vec<ViewEvent> {
    let mut events = Vec::new();

    ui.heading("Average treatment effects (ATE)");
    if let Some(at) = session.effects_fetched_at() {
        ui.weak(format!("Computed at {}", at.format("%Y-%m-%d %H:%M:%S")));
    }
    ui.add_space(8.0);

    match session.effects() {
        Fetched::NotRequested | Fetched::Loading => {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.spinner();
                ui.label("Computing causal effects...");
            });
        }
        Fetched::Failed(err) => {
            error_label(ui, err);
            if ui.button("Retry").clicked() {
                events.push(SessionUpdate::RecomputeEffects.into());
            }
        }
        Fetched::Ready(table) if table.is_empty() => {
            ui.label("The backend returned no effects for this selection.");
        }
        Fetched::Ready(table) => {
            render_heat_map(ui, table);
            ui.add_space(12.0);
            ui.separator();
            ui.heading("Criticality levels");
            ui.label(
                "Choose the levels per dimension and where one level ends and the next begins.",
            );
            ui.add_space(6.0);
            for (dimension, boundaries) in session.boundaries().iter() {
                render_boundary_editor(ui, dimension, boundaries, &mut events);
                ui.add_space(6.0);
            }
        }
    }

    events
}

fn render_heat_map(ui: &mut Ui, table: &EffectTable) {
    let max_abs = table.max_abs_effect();
    let deviations = table.deviations();

    egui::ScrollArea::horizontal()
        .id_salt("heat_map")
        .show(ui, |ui| {
            egui::Grid::new("effects_heat_map")
                .striped(false)
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
                            match table.find(&dimension, deviation) {
                                Some(record) => {
                                    let fill = record
                                        .ate
                                        .map(|ate| {
                                            tone_color(effect_tone(&dimension, ate, max_abs))
                                        })
                                        .unwrap_or_default();
                                    let text = effect_cell_text(record.ate, record.p_value);
                                    let response = egui::Frame::default()
                                        .fill(fill)
                                        .inner_margin(egui::Margin::symmetric(8, 4))
                                        .show(ui, |ui| {
                                            ui.set_min_width(80.0);
                                            ui.label(RichText::new(text).strong());
                                        })
                                        .response;
                                    if let Some(err) = &record.error {
                                        response.on_hover_text(err);
                                    }
                                }
                                None => {
                                    ui.label("");
                                }
                            }
                        }
                        ui.end_row();
                    }
                });
        });
    ui.small(
        "Green: the deviation moves the dimension in the desired direction. \
         Red: the opposite. p-values in brackets.",
    );
}

/// `ATE (p)` with two and three decimals, `-` for missing numbers
fn effect_cell_text(ate: Option<f64>, p_value: Option<f64>) -> String {
    let ate = ate.map_or_else(|| "-".to_string(), |a| format!("{a:.2}"));
    let p_value = p_value.map_or_else(|| "-".to_string(), |p| format!("{p:.3}"));
    format!("{ate} ({p_value})")
}

fn render_boundary_editor(
    ui: &mut Ui,
    dimension: &str,
    boundaries: &DimensionBoundaries,
    events: &mut Vec<ViewEvent>,
) {
    egui::CollapsingHeader::new(RichText::new(dimension).strong())
        .id_salt(("boundaries", dimension))
        .default_open(true)
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label("Levels:");
                for level in CriticalityLevel::ALL {
                    let mut selected = boundaries.is_selected(level);
                    if ui.checkbox(&mut selected, level.as_str()).changed() {
                        events.push(
                            SessionUpdate::ToggleLevel {
                                dimension: dimension.to_string(),
                                level,
                            }
                            .into(),
                        );
                    }
                }
            });

            ui.horizontal_wrapped(|ui| {
                ui.label("Cut points:");
                if boundaries.cuts().is_empty() {
                    ui.weak("select at least two levels");
                }
                let (lo, hi) = boundaries.range();
                let speed = ((hi - lo) / 200.0).abs().max(0.01);
                for (index, cut) in boundaries.cuts().iter().enumerate() {
                    let mut value = *cut;
                    if ui.add(egui::DragValue::new(&mut value).speed(speed)).changed() {
                        events.push(
                            SessionUpdate::SetCut {
                                dimension: dimension.to_string(),
                                index,
                                value,
                            }
                            .into(),
                        );
                    }
                }
                if ui
                    .button("Reset")
                    .on_hover_text("Spread the cut points evenly again")
                    .clicked()
                {
                    events.push(
                        SessionUpdate::ResetCuts {
                            dimension: dimension.to_string(),
                        }
                        .into(),
                    );
                }
            });

            render_rule_preview(ui, boundaries);
        });
}

fn render_rule_preview(ui: &mut Ui, boundaries: &DimensionBoundaries) {
    let Some(rules) = boundaries.rules() else {
        ui.weak("No rules: choose at least two levels with matching cut points.");
        return;
    };
    ui.horizontal_wrapped(|ui| {
        for rule in &rules {
            let text = format!(
                "[{}, {}) {}",
                format_number(rule.min, 2),
                format_number(rule.max, 2),
                rule.label
            );
            egui::Frame::default()
                .fill(level_color(rule.label))
                .corner_radius(4.0)
                .inner_margin(egui::Margin::symmetric(6, 2))
                .show(ui, |ui| {
                    ui.label(RichText::new(text).color(level_text_color(rule.label)).small());
                });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_cell_text() {
        assert_eq!(effect_cell_text(Some(-1200.456), Some(0.01234)), "-1200.46 (0.012)");
        assert_eq!(effect_cell_text(None, Some(0.5)), "- (0.500)");
        assert_eq!(effect_cell_text(Some(3.0), None), "3.00 (-)");
    }
}
