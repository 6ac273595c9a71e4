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

use crate::config::GlobalConfig;

/// Editor for the global configuration
pub struct SettingsWindow {
    draft: GlobalConfig,
}

/// Outcome of one frame of the settings window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsResult {
    Open,
    Saved(GlobalConfig),
    Cancelled,
}

impl SettingsWindow {
    #[must_use]
    pub const fn new(current: GlobalConfig) -> Self {
        Self { draft: current }
    }

    pub fn render(&mut self, ctx: &egui::Context) -> SettingsResult {
        let mut result = SettingsResult::Open;
        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid")
                    .num_columns(2)
                    .spacing([12.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Backend URL:");
                        ui.text_edit_singleline(&mut self.draft.api_url);
                        ui.end_row();

                        ui.label("Histogram bins:");
                        ui.add(egui::DragValue::new(&mut self.draft.histogram_bins).range(1..=100));
                        ui.end_row();

                        ui.label("Scatter points:");
                        ui.add(
                            egui::DragValue::new(&mut self.draft.scatter_sample_limit)
                                .range(10..=10_000),
                        );
                        ui.end_row();
                    });

                ui.add_space(8.0);
                let escape_pressed = ui.input(|i| i.key_pressed(egui::Key::Escape));
                ui.horizontal(|ui| {
                    let url_ok = !self.draft.api_url.trim().is_empty();
                    if ui.add_enabled(url_ok, egui::Button::new("Save")).clicked() {
                        self.draft.api_url = self.draft.api_url.trim().to_string();
                        result = SettingsResult::Saved(self.draft.clone());
                    }
                    if ui.button("Cancel").clicked() || escape_pressed {
                        result = SettingsResult::Cancelled;
                    }
                });
            });
        result
    }
}
