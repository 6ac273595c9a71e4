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
use crate::backend::{DeviationCount, DeviationKind, DeviationOverview, DeviationSelection};
use crate::state::{Fetched, Session, SessionUpdate};
use crate::ui::components::ratio_bar;
use crate::ui::palette::{INSERTION_COLOR, SKIP_COLOR};
use crate::ui::toasts::error_label;
use egui::Ui;

pub fn show(ui: &mut Ui, session: &Session) -> Vec<ViewEvent> {
    let mut events = Vec::new();

    ui.heading("Select deviations of interest");
    ui.label(format!(
        "Selected deviations: {}",
        session.selected_deviations().len()
    ));
    render_upload(ui, session, &mut events);
    ui.add_space(8.0);

    match session.overview() {
        Fetched::NotRequested if !session.upload().is_loading() => {}
        Fetched::NotRequested | Fetched::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading deviation overview...");
            });
        }
        Fetched::Failed(err) => {
            error_label(ui, err);
            if ui.button("Retry").clicked() {
                events.push(SessionUpdate::RefreshOverview.into());
            }
        }
        Fetched::Ready(overview) => render_overview(ui, session, overview, &mut events),
    }

    events
}

/// Model and log upload; the backend needs it once before any analysis
fn render_upload(ui: &mut Ui, session: &Session, events: &mut Vec<ViewEvent>) {
    ui.horizontal(|ui| {
        let uploading = session.upload().is_loading();
        if ui
            .add_enabled(!uploading, egui::Button::new("Upload model and log..."))
            .on_hover_text("BPMN model plus an XES or CSV event log")
            .clicked()
        {
            events.push(ViewEvent::PickUpload);
        }
        match session.upload() {
            Fetched::NotRequested => {}
            Fetched::Loading => {
                ui.spinner();
                ui.label("Computing alignments, this can take a while...");
            }
            Fetched::Ready(summary) => {
                ui.weak(format!("{} traces aligned", summary.alignment_count));
            }
            Fetched::Failed(err) => error_label(ui, err),
        }
    });
}

fn render_overview(
    ui: &mut Ui,
    session: &Session,
    overview: &DeviationOverview,
    events: &mut Vec<ViewEvent>,
) {
    ui.columns(2, |columns| {
        columns[0].strong("Skipped activities");
        columns[0].separator();
        render_list(
            &mut columns[0],
            session,
            overview.items(DeviationKind::Skip),
            DeviationKind::Skip,
            events,
        );

        columns[1].strong("Inserted activities");
        columns[1].separator();
        render_list(
            &mut columns[1],
            session,
            overview.items(DeviationKind::Insertion),
            DeviationKind::Insertion,
            events,
        );
    });
}

fn render_list(
    ui: &mut Ui,
    session: &Session,
    items: &[DeviationCount],
    kind: DeviationKind,
    events: &mut Vec<ViewEvent>,
) {
    if items.is_empty() {
        ui.weak("No deviations found.");
        return;
    }

    let max_count = items.iter().map(|i| i.count).max().unwrap_or(1).max(1);
    let color = match kind {
        DeviationKind::Skip => SKIP_COLOR,
        DeviationKind::Insertion => INSERTION_COLOR,
    };

    egui::ScrollArea::vertical()
        .id_salt(kind.as_str())
        .auto_shrink([false, true])
        .show(ui, |ui| {
            egui::Grid::new(("deviation_list", kind.as_str()))
                .num_columns(3)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    for item in items {
                        let selection = DeviationSelection::from_activity(&item.activity, kind);
                        let mut checked = session.is_deviation_selected(&selection.column);
                        if ui.checkbox(&mut checked, &item.activity).changed() {
                            events.push(SessionUpdate::ToggleDeviation(selection).into());
                        }
                        ratio_bar(ui, item.count as f32 / max_count as f32, color);
                        ui.strong(item.count.to_string());
                        ui.end_row();
                    }
                });
        });
}
