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

//! Colours shared by the dashboard views.

use crate::analysis::{CriticalityLevel, EffectTone};
use egui::Color32;

/// Background of a criticality table cell
#[must_use]
pub fn level_color(level: CriticalityLevel) -> Color32 {
    match level {
        CriticalityLevel::VeryPositive => Color32::from_rgba_unmultiplied(0, 100, 0, 217),
        CriticalityLevel::Positive => Color32::from_rgba_unmultiplied(76, 175, 80, 191),
        CriticalityLevel::SlightlyPositive => Color32::from_rgba_unmultiplied(129, 199, 132, 179),
        CriticalityLevel::Neutral => Color32::from_rgba_unmultiplied(200, 200, 200, 179),
        CriticalityLevel::SlightlyNegative => Color32::from_rgba_unmultiplied(255, 183, 77, 191),
        CriticalityLevel::Negative => Color32::from_rgba_unmultiplied(255, 152, 0, 191),
        CriticalityLevel::VeryNegative => Color32::from_rgba_unmultiplied(211, 47, 47, 217),
    }
}

/// Readable text colour on top of [`level_color`]
#[must_use]
pub const fn level_text_color(level: CriticalityLevel) -> Color32 {
    match level {
        CriticalityLevel::VeryPositive | CriticalityLevel::VeryNegative => Color32::WHITE,
        CriticalityLevel::Positive
        | CriticalityLevel::SlightlyPositive
        | CriticalityLevel::Neutral
        | CriticalityLevel::SlightlyNegative
        | CriticalityLevel::Negative => Color32::BLACK,
    }
}

/// Heat-map colour: green when the effect is wanted, red otherwise
#[must_use]
pub fn tone_color(tone: EffectTone) -> Color32 {
    let alpha = (tone.intensity.clamp(0.0, 1.0) * 255.0).round() as u8;
    if tone.favourable {
        Color32::from_rgba_unmultiplied(76, 175, 80, alpha)
    } else {
        Color32::from_rgba_unmultiplied(211, 47, 47, alpha)
    }
}

pub const BAR_COLOR: Color32 = Color32::from_rgb(100, 150, 255);
pub const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(255, 200, 100);
pub const SKIP_COLOR: Color32 = Color32::from_rgb(211, 47, 47);
pub const INSERTION_COLOR: Color32 = Color32::from_rgb(25, 118, 210);
pub const ERROR_TEXT: Color32 = Color32::from_rgb(255, 100, 100);

/// Colour of a correlation coefficient by strength
#[must_use]
pub fn correlation_color(r: f64) -> Color32 {
    let strength = r.abs();
    if strength > 0.5 {
        Color32::from_rgb(198, 40, 40)
    } else if strength > 0.2 {
        Color32::from_rgb(230, 81, 0)
    } else {
        Color32::GRAY
    }
}
