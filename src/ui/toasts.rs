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

//! Toast notifications.
//!
//! Errors and confirmations go through egui-toast. Long-running backend calls
//! are shown as activity cards with a spinner for as long as they are in flight.

use crate::ui::palette::ERROR_TEXT;
use egui::{Align2, Color32, Margin};
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};

const ACTIVITY_CARD_WIDTH: f32 = 300.0;
const ACTIVITY_CARD_HEIGHT: f32 = 64.0;
const CARD_MARGIN: f32 = 10.0;
/// Space kept free for the status bar
const BOTTOM_OFFSET: f32 = 40.0;

/// Something the user is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub title: String,
    pub detail: String,
}

impl Activity {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
        }
    }
}

pub struct ToastManager {
    toasts: Toasts,
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastManager {
    #[must_use]
    pub fn new() -> Self {
        let toasts = Toasts::new()
            .anchor(Align2::LEFT_BOTTOM, (10.0, -BOTTOM_OFFSET))
            .direction(egui::Direction::BottomUp);
        Self { toasts }
    }

    /// Show an error toast (auto-dismisses after timeout)
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.toasts.add(Toast {
            text: message.into().into(),
            kind: ToastKind::Error,
            options: ToastOptions::default()
                .duration_in_seconds(8.0)
                .show_progress(true),
            ..Default::default()
        });
    }

    /// Show a success toast (auto-dismisses after timeout)
    pub fn show_success(&mut self, message: impl Into<String>) {
        self.toasts.add(Toast {
            text: message.into().into(),
            kind: ToastKind::Success,
            options: ToastOptions::default()
                .duration_in_seconds(3.0)
                .show_progress(true),
            ..Default::default()
        });
    }

    /// Render everything - call this once per frame
    pub fn show(&mut self, ctx: &egui::Context, activities: &[Activity]) {
        render_activity_cards(ctx, activities);
        self.toasts.show(ctx);
    }
}

fn render_activity_cards(ctx: &egui::Context, activities: &[Activity]) {
    if activities.is_empty() {
        return;
    }

    #[allow(deprecated)]
    let screen_rect = ctx.input(egui::InputState::screen_rect);
    for (idx, activity) in activities.iter().enumerate() {
        let y_offset = BOTTOM_OFFSET + idx as f32 * (ACTIVITY_CARD_HEIGHT + CARD_MARGIN);
        let pos = egui::pos2(
            screen_rect.right() - ACTIVITY_CARD_WIDTH - CARD_MARGIN,
            screen_rect.bottom() - y_offset - ACTIVITY_CARD_HEIGHT,
        );

        egui::Area::new(egui::Id::new(("activity_card", idx)))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .interactable(false)
            .show(ctx, |ui| render_activity_card(ui, activity));
    }
}

fn render_activity_card(ui: &mut egui::Ui, activity: &Activity) {
    egui::Frame::default()
        .fill(ui.visuals().window_fill)
        .stroke(ui.visuals().window_stroke)
        .inner_margin(Margin::same(12))
        .corner_radius(8.0)
        .shadow(egui::epaint::Shadow {
            offset: [0, 2],
            blur: 8,
            spread: 0,
            color: Color32::from_black_alpha(60),
        })
        .show(ui, |ui| {
            ui.set_min_width(ACTIVITY_CARD_WIDTH - 20.0);
            ui.horizontal(|ui| {
                ui.spinner();
                ui.add_space(8.0);
                ui.strong(&activity.title);
            });
            if !activity.detail.is_empty() {
                ui.add_space(4.0);
                ui.label(truncate_front(&activity.detail, 50));
            }
        });
}

/// Render an error line in the style used by the cards
pub fn error_label(ui: &mut egui::Ui, message: &str) {
    ui.colored_label(ERROR_TEXT, message);
}

/// Keep the last `max_chars` characters, prefixed with an ellipsis
fn truncate_front(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - (max_chars - 3)).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_front() {
        assert_eq!(truncate_front("short", 10), "short");
        assert_eq!(truncate_front("abcdefghij", 6), "...hij");
        assert_eq!(truncate_front("ääääääää", 5), "...ää");
    }
}
