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

/// Version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash embedded by build.rs
const GIT_HASH: &str = env!("GIT_HASH");

/// Render the About window
pub fn render_about_window(ctx: &egui::Context, open: &mut bool, api_url: &str) {
    egui::Window::new("About Deviscope")
        .collapsible(false)
        .resizable(false)
        .default_width(350.0)
        .open(open)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(10.0);
                ui.heading("Deviscope");
                ui.add_space(5.0);
                ui.label("Criticality scoring and root-cause analysis for process deviations");
                ui.add_space(15.0);

                egui::Grid::new("about_grid")
                    .num_columns(2)
                    .spacing([20.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Version:");
                        ui.label(egui::RichText::new(VERSION).strong());
                        ui.end_row();

                        ui.label("Git:");
                        ui.label(egui::RichText::new(GIT_HASH).code());
                        ui.end_row();

                        ui.label("Backend:");
                        ui.label(egui::RichText::new(api_url).code());
                        ui.end_row();

                        ui.label("License:");
                        ui.label("GPL-3.0-or-later");
                        ui.end_row();
                    });

                ui.add_space(15.0);
                ui.separator();
                ui.add_space(10.0);
                ui.label("© 2025 Daniel Freiermuth");
                ui.add_space(10.0);
            });
        });
}
