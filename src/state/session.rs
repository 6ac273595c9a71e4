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

//! Application state of one analysis session.
//!
//! The UI never mutates a [`Session`] directly. Every user action and every
//! backend reply becomes a [`SessionUpdate`] fed through [`Session::apply`],
//! which returns the backend requests the update calls for.

use crate::analysis::{
    BoundaryBuilder, CriticalityLevel, CriticalityMap, EffectRecord, EffectTable, ImpactMatrix,
    PriorityList,
};
use crate::backend::{
    CausalEffectsRequest, DeviationOverview, DeviationSelection, DimensionComputation, Reply,
    Request, UploadSummary,
};
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Steps of the analysis, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Deviations,
    Dimensions,
    CausalEffects,
    Criticality,
}

impl Stage {
    pub const ALL: [Self; 4] = [
        Self::Deviations,
        Self::Dimensions,
        Self::CausalEffects,
        Self::Criticality,
    ];

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Deviations => "Deviations",
            Self::Dimensions => "Dimensions",
            Self::CausalEffects => "Causal effects",
            Self::Criticality => "Criticality",
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Deviations => Some(Self::Dimensions),
            Self::Dimensions => Some(Self::CausalEffects),
            Self::CausalEffects => Some(Self::Criticality),
            Self::Criticality => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Deviations => None,
            Self::Dimensions => Some(Self::Deviations),
            Self::CausalEffects => Some(Self::Dimensions),
            Self::Criticality => Some(Self::CausalEffects),
        }
    }
}

/// Lifecycle of data that comes from the backend
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    NotRequested,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self::NotRequested
    }
}

impl<T> Fetched<T> {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::NotRequested | Self::Loading | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(e) => Some(e),
            Self::NotRequested | Self::Loading | Self::Ready(_) => None,
        }
    }

    fn from_result(result: Result<T, String>) -> Self {
        result.map_or_else(Self::Failed, Self::Ready)
    }
}

pub type MatrixState = Fetched<Arc<ImpactMatrix>>;

/// Cell of the criticality table opened for root-cause analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectedCell {
    pub dimension: String,
    pub deviation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Start over with a new process model and event log
    Upload { bpmn: PathBuf, log: PathBuf },
    /// Continue to the next stage if the current one is complete
    Advance,
    Back,
    RefreshOverview,
    ToggleDeviation(DeviationSelection),
    ToggleDimension(String),
    /// `None` falls back to the backend's built-in computation
    SetComputation {
        dimension: String,
        computation: Option<DimensionComputation>,
    },
    RecomputeEffects,
    ToggleLevel {
        dimension: String,
        level: CriticalityLevel,
    },
    SetCut {
        dimension: String,
        index: usize,
        value: f64,
    },
    ResetCuts {
        dimension: String,
    },
    MovePriority {
        index: usize,
        direction: MoveDirection,
    },
    /// Clicking the selected cell again closes it
    SelectCell {
        dimension: String,
        deviation: String,
    },
    SelectCorrelation(Option<String>),
    /// Fetch the impact matrix again after a failure
    RefreshMatrix,
    Reset,
    Replied {
        epoch: u64,
        reply: Reply,
    },
}

#[derive(Debug, Default)]
pub struct Session {
    stage: Stage,
    /// Bumped on reset so replies to older requests are dropped
    epoch: u64,
    upload: Fetched<UploadSummary>,
    overview: Fetched<DeviationOverview>,
    deviations: Vec<DeviationSelection>,
    dimensions: Vec<String>,
    computations: IndexMap<String, DimensionComputation>,
    effects: Fetched<EffectTable>,
    /// Ticket of the newest causal-effects request; older replies are dropped
    effects_ticket: u64,
    effects_generation: u64,
    effects_fetched_at: Option<DateTime<Local>>,
    boundaries: BoundaryBuilder,
    criticality_map: CriticalityMap,
    priorities: PriorityList,
    matrix: MatrixState,
    matrix_generation: u64,
    selected_cell: Option<SelectedCell>,
    correlation: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub const fn upload(&self) -> &Fetched<UploadSummary> {
        &self.upload
    }

    #[must_use]
    pub const fn overview(&self) -> &Fetched<DeviationOverview> {
        &self.overview
    }

    #[must_use]
    pub fn selected_deviations(&self) -> &[DeviationSelection] {
        &self.deviations
    }

    #[must_use]
    pub fn is_deviation_selected(&self, column: &str) -> bool {
        self.deviations.iter().any(|d| d.column == column)
    }

    #[must_use]
    pub fn selected_dimensions(&self) -> &[String] {
        &self.dimensions
    }

    #[must_use]
    pub fn is_dimension_selected(&self, dimension: &str) -> bool {
        self.dimensions.iter().any(|d| d == dimension)
    }

    #[must_use]
    pub fn computation(&self, dimension: &str) -> Option<&DimensionComputation> {
        self.computations.get(dimension)
    }

    #[must_use]
    pub const fn effects(&self) -> &Fetched<EffectTable> {
        &self.effects
    }

    #[must_use]
    pub const fn effects_fetched_at(&self) -> Option<DateTime<Local>> {
        self.effects_fetched_at
    }

    #[must_use]
    pub const fn boundaries(&self) -> &BoundaryBuilder {
        &self.boundaries
    }

    /// Map frozen when the causal-effects stage was last left
    #[must_use]
    pub const fn criticality_map(&self) -> &CriticalityMap {
        &self.criticality_map
    }

    #[must_use]
    pub const fn priorities(&self) -> &PriorityList {
        &self.priorities
    }

    #[must_use]
    pub const fn matrix(&self) -> &MatrixState {
        &self.matrix
    }

    #[must_use]
    pub const fn matrix_generation(&self) -> u64 {
        self.matrix_generation
    }

    #[must_use]
    pub const fn selected_cell(&self) -> Option<&SelectedCell> {
        self.selected_cell.as_ref()
    }

    #[must_use]
    pub fn correlation(&self) -> Option<&str> {
        self.correlation.as_deref()
    }

    /// Whether a reply still answers an outstanding request.
    ///
    /// Replies from before a reset or upload are stale, and so is every
    /// causal-effects reply except the one for the newest request.
    #[must_use]
    pub fn is_current(&self, epoch: u64, reply: &Reply) -> bool {
        epoch == self.epoch
            && match reply {
                Reply::CausalEffects { ticket, .. } => *ticket == self.effects_ticket,
                Reply::Upload(_)
                | Reply::DeviationOverview(_)
                | Reply::ImpactMatrix(_)
                | Reply::Reset(_) => true,
            }
    }

    /// Whether the current stage has what the next one needs
    #[must_use]
    pub const fn can_advance(&self) -> bool {
        match self.stage {
            Stage::Deviations => !self.deviations.is_empty(),
            Stage::Dimensions => !self.dimensions.is_empty(),
            Stage::CausalEffects => self.effects.ready().is_some(),
            Stage::Criticality => false,
        }
    }

    /// Body for the causal-effects call built from the current selection
    #[must_use]
    pub fn causal_request(&self) -> CausalEffectsRequest {
        CausalEffectsRequest {
            deviations: self.deviations.iter().map(|d| d.column.clone()).collect(),
            dimensions: self.dimensions.clone(),
            dimension_configs: self
                .computations
                .iter()
                .filter(|(dimension, _)| self.is_dimension_selected(dimension))
                .map(|(dimension, computation)| (dimension.clone(), computation.clone()))
                .collect(),
        }
    }

    /// Apply one update and return the backend requests it triggers
    pub fn apply(&mut self, update: SessionUpdate) -> Vec<Request> {
        profiling::scope!("Session::apply");
        match update {
            SessionUpdate::Upload { bpmn, log } => return self.start_upload(bpmn, log),
            SessionUpdate::Advance => return self.advance(),
            SessionUpdate::Back => self.back(),
            SessionUpdate::RefreshOverview => {
                self.overview = Fetched::Loading;
                return vec![Request::DeviationOverview];
            }
            SessionUpdate::ToggleDeviation(selection) => {
                let existing = self.deviations.iter().position(|d| d.column == selection.column);
                if let Some(pos) = existing {
                    self.deviations.remove(pos);
                } else {
                    self.deviations.push(selection);
                }
            }
            SessionUpdate::ToggleDimension(dimension) => {
                if let Some(pos) = self.dimensions.iter().position(|d| *d == dimension) {
                    self.dimensions.remove(pos);
                } else {
                    self.dimensions.push(dimension);
                }
            }
            SessionUpdate::SetComputation {
                dimension,
                computation,
            } => match computation {
                Some(computation) => {
                    self.computations.insert(dimension, computation);
                }
                None => {
                    self.computations.shift_remove(&dimension);
                }
            },
            SessionUpdate::RecomputeEffects => return self.request_effects(),
            SessionUpdate::ToggleLevel { dimension, level } => {
                self.boundaries.toggle_level(&dimension, level);
            }
            SessionUpdate::SetCut {
                dimension,
                index,
                value,
            } => {
                self.boundaries.set_cut(&dimension, index, value);
            }
            SessionUpdate::ResetCuts { dimension } => self.boundaries.reset_cuts(&dimension),
            SessionUpdate::MovePriority { index, direction } => {
                match direction {
                    MoveDirection::Up => self.priorities.move_up(index),
                    MoveDirection::Down => self.priorities.move_down(index),
                };
            }
            SessionUpdate::SelectCell {
                dimension,
                deviation,
            } => {
                return self.select_cell(SelectedCell {
                    dimension,
                    deviation,
                });
            }
            SessionUpdate::SelectCorrelation(column) => self.correlation = column,
            SessionUpdate::RefreshMatrix => {
                if !self.matrix.is_loading() {
                    self.matrix = Fetched::Loading;
                    return vec![Request::ImpactMatrix];
                }
            }
            SessionUpdate::Reset => return self.reset(),
            SessionUpdate::Replied { epoch, reply } => {
                if self.is_current(epoch, &reply) {
                    return self.receive(reply);
                }
                tracing::debug!("Ignoring stale reply from epoch {epoch}, now at {}", self.epoch);
            }
        }
        Vec::new()
    }

    fn advance(&mut self) -> Vec<Request> {
        if !self.can_advance() {
            return Vec::new();
        }
        let Some(next) = self.stage.next() else {
            return Vec::new();
        };
        if self.stage == Stage::CausalEffects {
            self.freeze_map();
        }
        tracing::debug!("Stage {:?} -> {next:?}", self.stage);
        self.stage = next;

        if next == Stage::CausalEffects {
            return self.request_effects();
        }
        Vec::new()
    }

    fn back(&mut self) {
        if let Some(previous) = self.stage.previous() {
            if self.stage == Stage::Criticality {
                self.selected_cell = None;
                self.correlation = None;
            }
            self.stage = previous;
        }
    }

    fn request_effects(&mut self) -> Vec<Request> {
        if self.deviations.is_empty() || self.dimensions.is_empty() {
            return Vec::new();
        }
        self.effects_ticket += 1;
        self.effects = Fetched::Loading;
        vec![Request::CausalEffects {
            ticket: self.effects_ticket,
            body: self.causal_request(),
        }]
    }

    fn freeze_map(&mut self) {
        self.criticality_map = self.boundaries.build_map();
        if let Some(table) = self.effects.ready() {
            if self.priorities.refresh(table, &self.criticality_map) {
                tracing::info!(
                    "Priorities re-ranked for {} dimensions",
                    self.criticality_map.len()
                );
            }
        }
    }

    fn select_cell(&mut self, cell: SelectedCell) -> Vec<Request> {
        if self.selected_cell.as_ref() == Some(&cell) {
            self.selected_cell = None;
            self.correlation = None;
            return Vec::new();
        }
        self.selected_cell = Some(cell);
        self.correlation = None;

        match self.matrix {
            Fetched::NotRequested | Fetched::Failed(_) => {
                self.matrix = Fetched::Loading;
                vec![Request::ImpactMatrix]
            }
            Fetched::Loading | Fetched::Ready(_) => Vec::new(),
        }
    }

    /// Forget everything and start over; the backend drops its caches too
    pub fn reset(&mut self) -> Vec<Request> {
        let epoch = self.epoch + 1;
        *self = Self {
            epoch,
            overview: Fetched::Loading,
            ..Self::default()
        };
        tracing::info!("Session reset");
        vec![Request::Reset, Request::DeviationOverview]
    }

    /// Local reset without dropping the backend's state; the upload replaces it
    fn start_upload(&mut self, bpmn: PathBuf, log: PathBuf) -> Vec<Request> {
        let epoch = self.epoch + 1;
        *self = Self {
            epoch,
            upload: Fetched::Loading,
            ..Self::default()
        };
        tracing::info!("Starting new analysis from {}", bpmn.display());
        vec![Request::Upload { bpmn, log }]
    }

    fn receive(&mut self, reply: Reply) -> Vec<Request> {
        match reply {
            Reply::Upload(result) => {
                let uploaded = result.is_ok();
                self.upload = Fetched::from_result(result);
                if uploaded {
                    self.overview = Fetched::Loading;
                    return vec![Request::DeviationOverview];
                }
            }
            Reply::DeviationOverview(result) => self.overview = Fetched::from_result(result),
            Reply::CausalEffects { result, .. } => match result {
                Ok(records) => self.load_effects(records),
                Err(e) => self.effects = Fetched::Failed(e),
            },
            Reply::ImpactMatrix(result) => {
                if result.is_ok() {
                    self.matrix_generation += 1;
                }
                self.matrix = Fetched::from_result(result.map(Arc::new));
            }
            Reply::Reset(_) => {}
        }
        Vec::new()
    }

    fn load_effects(&mut self, records: Vec<EffectRecord>) {
        self.effects_generation += 1;
        let table = EffectTable::with_generation(records, self.effects_generation);
        self.boundaries.observe(&table, &table.dimensions());
        self.effects = Fetched::Ready(table);
        self.effects_fetched_at = Some(Local::now());
        if self.stage == Stage::Criticality {
            self.freeze_map();
        }
    }
}
