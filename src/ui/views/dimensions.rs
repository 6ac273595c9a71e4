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
use crate::analysis::root_cause::KNOWN_DIMENSIONS;
use crate::backend::{ComparisonOperator, DimensionComputation, RuleValue};
use crate::state::{Session, SessionUpdate};
use egui::Ui;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ComputationKind {
    #[default]
    BuiltIn,
    Existing,
    Formula,
    Rule,
}

impl ComputationKind {
    const ALL: [Self; 4] = [Self::BuiltIn, Self::Existing, Self::Formula, Self::Rule];

    const fn label(self) -> &'static str {
        match self {
            Self::BuiltIn => "Built-in",
            Self::Existing => "Existing attribute",
            Self::Formula => "Formula",
            Self::Rule => "Rule (0/1)",
        }
    }
}

/// Text being edited for one dimension's computation
#[derive(Debug, Clone, PartialEq)]
struct ComputationDraft {
    kind: ComputationKind,
    column: String,
    expression: String,
    operator: ComparisonOperator,
    value: String,
}

impl Default for ComputationDraft {
    fn default() -> Self {
        Self {
            kind: ComputationKind::BuiltIn,
            column: String::new(),
            expression: String::new(),
            operator: ComparisonOperator::Equal,
            value: String::new(),
        }
    }
}

impl ComputationDraft {
    fn from_computation(computation: Option<&DimensionComputation>) -> Self {
        let mut draft = Self::default();
        match computation {
            None => {}
            Some(DimensionComputation::Existing { column }) => {
                draft.kind = ComputationKind::Existing;
                draft.column.clone_from(column);
            }
            Some(DimensionComputation::Formula { expression }) => {
                draft.kind = ComputationKind::Formula;
                draft.expression.clone_from(expression);
            }
            Some(DimensionComputation::Rule {
                column,
                operator,
                value,
            }) => {
                draft.kind = ComputationKind::Rule;
                draft.column.clone_from(column);
                draft.operator = *operator;
                draft.value = value.to_string();
            }
        }
        draft
    }

    /// The computation to send, `None` for built-in or while fields are empty
    fn build(&self) -> Option<DimensionComputation> {
        let column = self.column.trim();
        match self.kind {
            ComputationKind::BuiltIn => None,
            ComputationKind::Existing => {
                (!column.is_empty()).then(|| DimensionComputation::Existing {
                    column: column.to_string(),
                })
            }
            ComputationKind::Formula => {
                let expression = self.expression.trim();
                (!expression.is_empty()).then(|| DimensionComputation::Formula {
                    expression: expression.to_string(),
                })
            }
            ComputationKind::Rule => (!column.is_empty() && !self.value.trim().is_empty()).then(|| {
                DimensionComputation::Rule {
                    column: column.to_string(),
                    operator: self.operator,
                    value: RuleValue::parse(self.value.trim()),
                }
            }),
        }
    }
}

/// Dimension selection with a computation editor per selected dimension
#[derive(Debug, Default)]
pub struct DimensionsView {
    drafts: HashMap<String, ComputationDraft>,
}

impl DimensionsView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all edit buffers, e.g. after a session reset
    pub fn clear(&mut self) {
        self.drafts.clear();
    }

    pub fn show(&mut self, ui: &mut Ui, session: &Session) -> Vec<ViewEvent> {
        let mut events = Vec::new();

        ui.heading("Select dimensions to analyze");
        ui.label(format!(
            "Selected deviations: {}",
            session.selected_deviations().len()
        ));
        ui.add_space(8.0);

        for dimension in KNOWN_DIMENSIONS {
            let mut checked = session.is_dimension_selected(dimension);
            if ui.checkbox(&mut checked, dimension).changed() {
                events.push(SessionUpdate::ToggleDimension(dimension.to_string()).into());
            }
            if checked {
                ui.indent(("computation", dimension), |ui| {
                    if let Some(event) = self.render_editor(ui, session, dimension) {
                        events.push(event);
                    }
                });
            }
        }

        events
    }

    fn render_editor(
        &mut self,
        ui: &mut Ui,
        session: &Session,
        dimension: &str,
    ) -> Option<ViewEvent> {
        let draft = self
            .drafts
            .entry(dimension.to_string())
            .or_insert_with(|| ComputationDraft::from_computation(session.computation(dimension)));
        let before = draft.clone();

        ui.horizontal(|ui| {
            ui.label("Computation:");
            egui::ComboBox::from_id_salt(("kind", dimension))
                .selected_text(draft.kind.label())
                .show_ui(ui, |ui| {
                    for kind in ComputationKind::ALL {
                        ui.selectable_value(&mut draft.kind, kind, kind.label());
                    }
                });

            match draft.kind {
                ComputationKind::BuiltIn => {
                    ui.weak("computed by the backend");
                }
                ComputationKind::Existing => {
                    ui.label("Attribute:");
                    ui.text_edit_singleline(&mut draft.column);
                }
                ComputationKind::Formula => {
                    ui.label("Expression:");
                    ui.add(
                        egui::TextEdit::singleline(&mut draft.expression)
                            .hint_text("e.g. end_time - start_time"),
                    );
                }
                ComputationKind::Rule => {
                    ui.label("Attribute:");
                    ui.add(egui::TextEdit::singleline(&mut draft.column).desired_width(120.0));
                    egui::ComboBox::from_id_salt(("operator", dimension))
                        .selected_text(draft.operator.symbol())
                        .width(50.0)
                        .show_ui(ui, |ui| {
                            for operator in ComparisonOperator::ALL {
                                ui.selectable_value(
                                    &mut draft.operator,
                                    operator,
                                    operator.symbol(),
                                );
                            }
                        });
                    ui.add(egui::TextEdit::singleline(&mut draft.value).desired_width(80.0));
                }
            }
        });

        if *draft == before {
            return None;
        }
        let computation = draft.build();
        (computation.as_ref() != session.computation(dimension)).then(|| {
            SessionUpdate::SetComputation {
                dimension: dimension.to_string(),
                computation,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_drafts_build_nothing() {
        let mut draft = ComputationDraft {
            kind: ComputationKind::Rule,
            column: "amount".to_string(),
            ..ComputationDraft::default()
        };
        assert_eq!(draft.build(), None);

        draft.value = " 100 ".to_string();
        assert_eq!(
            draft.build(),
            Some(DimensionComputation::Rule {
                column: "amount".to_string(),
                operator: ComparisonOperator::Equal,
                value: RuleValue::Number(100.0),
            })
        );

        draft.kind = ComputationKind::BuiltIn;
        assert_eq!(draft.build(), None);
    }

    #[test]
    fn test_draft_round_trips_computation() {
        let computation = DimensionComputation::Formula {
            expression: "cost_a + cost_b".to_string(),
        };
        let draft = ComputationDraft::from_computation(Some(&computation));
        assert_eq!(draft.kind, ComputationKind::Formula);
        assert_eq!(draft.build(), Some(computation));
        assert_eq!(ComputationDraft::from_computation(None).build(), None);
    }
}
