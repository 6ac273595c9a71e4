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

//! Small painter-based charts used in the root-cause panel.

use crate::analysis::root_cause::BinaryCounts;
use crate::analysis::stats::format_number;
use crate::analysis::HistogramBin;
use crate::ui::palette::{BAR_COLOR, HIGHLIGHT_COLOR};
use egui::{Color32, Rect, Sense, Ui};

const CHART_BACKGROUND: Color32 = Color32::from_gray(20);

/// Vertical bar chart of histogram bins. Hovering a bar shows its bin and count.
pub fn bar_chart(ui: &mut Ui, bins: &[HistogramBin], height: f32) {
    if bins.is_empty() {
        ui.weak("No numeric values");
        return;
    }

    let desired_size = egui::vec2(ui.available_width(), height);
    let (response, painter) = ui.allocate_painter(desired_size, Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 0.0, CHART_BACKGROUND);

    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(1).max(1);
    let bar_width = rect.width() / bins.len() as f32;
    let hovered = response
        .hover_pos()
        .map(|pos| ((pos.x - rect.min.x) / bar_width).floor())
        .filter(|idx| *idx >= 0.0)
        .map(|idx| idx as usize);

    for (i, bin) in bins.iter().enumerate() {
        if bin.count == 0 {
            continue;
        }
        let bar_height = (bin.count as f32 / max_count as f32) * rect.height();
        let x = rect.min.x + i as f32 * bar_width;
        let bar = Rect::from_min_size(
            egui::pos2(x + 1.0, rect.max.y - bar_height),
            egui::vec2((bar_width - 2.0).max(1.0), bar_height),
        );
        let color = if hovered == Some(i) {
            HIGHLIGHT_COLOR
        } else {
            BAR_COLOR
        };
        painter.rect_filled(bar, 0.0, color);
    }

    if let Some(bin) = hovered.and_then(|i| bins.get(i)) {
        response.on_hover_text(format!("from {}: {} traces", bin.label, bin.count));
    }

    ui.horizontal(|ui| {
        if let (Some(first), Some(last)) = (bins.first(), bins.last()) {
            ui.small(format!("{} … {}", first.label, last.label));
        }
    });
}

/// Two labelled bars for a 0/1 column
pub fn binary_bars(ui: &mut Ui, counts: BinaryCounts, zero_label: &str, one_label: &str) {
    let total = (counts.zeros + counts.ones).max(1);
    egui::Grid::new(ui.id().with(zero_label))
        .num_columns(3)
        .spacing([8.0, 4.0])
        .show(ui, |ui| {
            for (label, count) in [(zero_label, counts.zeros), (one_label, counts.ones)] {
                ui.label(label);
                ratio_bar(ui, count as f32 / total as f32, BAR_COLOR);
                ui.label(count.to_string());
                ui.end_row();
            }
        });
}

/// Horizontal bar filled to `fraction` of its width
pub fn ratio_bar(ui: &mut Ui, fraction: f32, color: Color32) {
    let desired_size = egui::vec2(160.0, ui.spacing().interact_size.y * 0.6);
    let (rect, _) = ui.allocate_exact_size(desired_size, Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 2.0, ui.visuals().extreme_bg_color);
    let filled = Rect::from_min_size(
        rect.min,
        egui::vec2(rect.width() * fraction.clamp(0.0, 1.0), rect.height()),
    );
    painter.rect_filled(filled, 2.0, color);
}

/// Scatter plot of `(x, y)` points scaled to their bounding box
pub fn scatter_plot(ui: &mut Ui, points: &[(f64, f64)], x_label: &str, y_label: &str) {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if finite.is_empty() {
        ui.weak("No points to plot");
        return;
    }

    let (x_min, x_max) = bounds(finite.iter().map(|p| p.0));
    let (y_min, y_max) = bounds(finite.iter().map(|p| p.1));

    let desired_size = egui::vec2(ui.available_width().min(420.0), 180.0);
    let (response, painter) = ui.allocate_painter(desired_size, Sense::hover());
    let rect = response.rect.shrink(6.0);
    painter.rect_filled(response.rect, 0.0, CHART_BACKGROUND);

    for (x, y) in &finite {
        let fx = ((x - x_min) / (x_max - x_min)) as f32;
        let fy = ((y - y_min) / (y_max - y_min)) as f32;
        let pos = egui::pos2(
            rect.min.x + fx * rect.width(),
            rect.max.y - fy * rect.height(),
        );
        painter.circle_filled(pos, 2.5, BAR_COLOR.gamma_multiply(0.7));
    }

    ui.small(format!(
        "{x_label}: {} … {}    {y_label}: {} … {}",
        format_number(x_min, 2),
        format_number(x_max, 2),
        format_number(y_min, 2),
        format_number(y_max, 2)
    ));
}

/// Min and max of `values`, widened so the span is never zero
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}
