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

use crate::backend::{BackendClient, Reply};
use crate::config::GlobalConfig;
use crate::core::fetch::Fetcher;
use crate::core::report_cache::{AnalysisSlot, ReportCache, ReportKey};
use crate::core::worker::JobWorker;
use crate::export::{self, DEFAULT_CSV_NAME, DEFAULT_MAP_NAME, DEFAULT_PDF_NAME};
use crate::state::{Fetched, Session, SessionUpdate, Stage};
use crate::ui::toasts::{Activity, ToastManager};
use crate::ui::views::{self, root_cause::ReportView, DimensionsView, ExportKind, ViewEvent};
use crate::ui::windows::{self, SettingsResult, SettingsWindow};
use std::path::PathBuf;
use std::sync::Arc;

pub struct DeviscopeApp {
    session: Session,

    /// Runs backend requests in the background
    fetcher: Fetcher,

    /// Computes root-cause reports off the UI thread
    worker: JobWorker<AnalysisSlot>,
    reports: ReportCache,

    config: GlobalConfig,
    /// Where settings are saved; the default location when `None`
    config_path: Option<PathBuf>,

    toasts: ToastManager,
    dimensions_view: DimensionsView,

    /// Status message shown in the bottom panel
    status_message: String,

    /// Whether the initial overview request went out
    started: bool,

    show_about: bool,
    settings_window: Option<SettingsWindow>,
}

impl DeviscopeApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: GlobalConfig,
        config_path: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let client = BackendClient::new(config.api_url.clone())?;
        tracing::info!("Using backend at {}", client.base_url());

        Ok(Self {
            session: Session::new(),
            fetcher: Fetcher::new(client),
            worker: JobWorker::new("root-cause-worker"),
            reports: ReportCache::new(),
            config,
            config_path,
            toasts: ToastManager::new(),
            dimensions_view: DimensionsView::new(),
            status_message: "Connecting to backend...".to_string(),
            started: false,
            show_about: false,
            settings_window: None,
        })
    }

    /// Feed an update to the session and start whatever requests it asks for
    fn apply(&mut self, update: SessionUpdate, ctx: &egui::Context) {
        if matches!(update, SessionUpdate::Reset | SessionUpdate::Upload { .. }) {
            self.reports.clear();
            self.dimensions_view.clear();
        }
        let epoch = self.session.epoch();
        let requests = self.session.apply(update);
        if self.session.epoch() != epoch {
            tracing::debug!("Session epoch is now {}", self.session.epoch());
        }
        for request in requests {
            self.status_message = format!("{}...", request.describe());
            self.fetcher.dispatch(request, self.session.epoch(), ctx);
        }
    }

    fn handle_events(&mut self, events: Vec<ViewEvent>, ctx: &egui::Context) {
        for event in events {
            match event {
                ViewEvent::Session(update) => self.apply(update, ctx),
                ViewEvent::Export(kind) => self.export(kind),
                ViewEvent::PickUpload => self.pick_upload(ctx),
            }
        }
    }

    /// Process replies from background requests
    fn process_replies(&mut self, ctx: &egui::Context) {
        for message in self.fetcher.poll() {
            if self.session.is_current(message.epoch, &message.reply) {
                self.report_reply(&message.reply);
            }
            self.apply(
                SessionUpdate::Replied {
                    epoch: message.epoch,
                    reply: message.reply,
                },
                ctx,
            );
        }
    }

    fn report_reply(&mut self, reply: &Reply) {
        if let Some(err) = reply.error() {
            self.status_message = format!("Error: {err}");
            self.toasts.show_error(err);
            return;
        }
        self.status_message = match reply {
            Reply::Upload(Ok(summary)) => {
                let message = format!("Aligned {} traces", summary.alignment_count);
                self.toasts.show_success(message.clone());
                message
            }
            Reply::DeviationOverview(Ok(overview)) => format!(
                "Ready. {} skipped and {} inserted activities",
                overview.skips.len(),
                overview.insertions.len()
            ),
            Reply::CausalEffects {
                result: Ok(records),
                ..
            } => format!("Received {} effect estimates", records.len()),
            Reply::ImpactMatrix(Ok(matrix)) => {
                format!("Loaded impact matrix with {} traces", matrix.rows.len())
            }
            Reply::Reset(Ok(())) => {
                self.toasts.show_success("Backend reset");
                "Backend reset".to_string()
            }
            Reply::Upload(Err(_))
            | Reply::DeviationOverview(Err(_))
            | Reply::CausalEffects { result: Err(_), .. }
            | Reply::ImpactMatrix(Err(_))
            | Reply::Reset(Err(_)) => return,
        };
    }

    fn export(&mut self, kind: ExportKind) {
        let Some(table) = self.session.effects().ready() else {
            self.toasts.show_error("Nothing to export yet");
            return;
        };
        let map = self.session.criticality_map();

        let (name, filter, extension) = match kind {
            ExportKind::Csv => (DEFAULT_CSV_NAME, "CSV", "csv"),
            ExportKind::Pdf => (DEFAULT_PDF_NAME, "PDF", "pdf"),
            ExportKind::CriticalityMap => (DEFAULT_MAP_NAME, "JSON", "json"),
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(name)
            .add_filter(filter, &[extension])
            .save_file()
        else {
            return;
        };

        let priorities = self.session.priorities().entries();
        let result = match kind {
            ExportKind::Csv => export::write_csv(&path, table, map, priorities),
            ExportKind::Pdf => export::write_pdf(&path, table, map, priorities),
            ExportKind::CriticalityMap => export::write_map_json(&path, map),
        };
        match result {
            Ok(()) => {
                self.status_message = format!("Saved {}", path.display());
                self.toasts.show_success(format!("Saved {}", path.display()));
            }
            Err(e) => {
                tracing::error!("Export failed: {e:#}");
                self.toasts.show_error(format!("{e:#}"));
            }
        }
    }

    /// Ask for a process model and an event log, then start a new analysis
    fn pick_upload(&mut self, ctx: &egui::Context) {
        let Some(bpmn) = rfd::FileDialog::new()
            .set_title("Select BPMN model")
            .add_filter("BPMN", &["bpmn"])
            .pick_file()
        else {
            return;
        };
        let Some(log) = rfd::FileDialog::new()
            .set_title("Select event log")
            .add_filter("Event log", &["xes", "csv"])
            .pick_file()
        else {
            return;
        };
        self.apply(SessionUpdate::Upload { bpmn, log }, ctx);
    }

    fn apply_settings(&mut self, config: GlobalConfig, ctx: &egui::Context) {
        let saved = self
            .config_path
            .as_ref()
            .map_or_else(|| config.save(), |path| config.save_to(path));
        if let Err(e) = saved {
            self.toasts.show_error(format!("{e:#}"));
        }

        if config.api_url != self.config.api_url {
            match BackendClient::new(config.api_url.clone()) {
                Ok(client) => {
                    tracing::info!("Switching backend to {}", client.base_url());
                    self.fetcher = Fetcher::new(client);
                    self.config = config;
                    self.apply(SessionUpdate::Reset, ctx);
                    return;
                }
                Err(e) => self.toasts.show_error(format!("{e:#}")),
            }
        }
        self.config = config;
    }

    /// Things the user is waiting for, shown as activity cards
    fn activities(&self) -> Vec<Activity> {
        let mut activities = Vec::new();
        if self.session.upload().is_loading() {
            activities.push(Activity::new("Computing alignments", self.config.api_url.clone()));
        }
        if self.session.overview().is_loading() {
            activities.push(Activity::new("Loading deviations", self.config.api_url.clone()));
        }
        if self.session.effects().is_loading() {
            activities.push(Activity::new(
                "Computing causal effects",
                format!(
                    "{} deviations x {} dimensions",
                    self.session.selected_deviations().len(),
                    self.session.selected_dimensions().len()
                ),
            ));
        }
        if self.session.matrix().is_loading() {
            activities.push(Activity::new("Loading impact matrix", String::new()));
        }
        activities
    }

    fn update_window_title(&self, ctx: &egui::Context) {
        let title = format!("Deviscope - {}", self.session.stage().title());
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
    }

    /// Render top menu bar
    fn render_menu_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        let can_export = self.session.stage() == Stage::Criticality;

        ui.menu_button("File", |ui| {
            if ui.button("Upload model and log...").clicked() {
                events.push(ViewEvent::PickUpload);
                ui.close();
            }
            ui.separator();
            if ui
                .add_enabled(can_export, egui::Button::new("Export as CSV..."))
                .clicked()
            {
                events.push(ViewEvent::Export(ExportKind::Csv));
                ui.close();
            }
            if ui
                .add_enabled(can_export, egui::Button::new("Export as PDF..."))
                .clicked()
            {
                events.push(ViewEvent::Export(ExportKind::Pdf));
                ui.close();
            }
            if ui
                .add_enabled(can_export, egui::Button::new("Save criticality map..."))
                .clicked()
            {
                events.push(ViewEvent::Export(ExportKind::CriticalityMap));
                ui.close();
            }
            ui.separator();
            if ui.button("Quit").clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.menu_button("Session", |ui| {
            if ui.button("Reset & start over").clicked() {
                events.push(SessionUpdate::Reset.into());
                ui.close();
            }
            if ui.button("Reload deviations").clicked() {
                events.push(SessionUpdate::RefreshOverview.into());
                ui.close();
            }
            ui.separator();
            if ui.button("Settings...").clicked() {
                self.settings_window = Some(SettingsWindow::new(self.config.clone()));
                ui.close();
            }
        });

        ui.menu_button("Help", |ui| {
            if ui.button("About").clicked() {
                self.show_about = true;
                ui.close();
            }
        });

        events
    }

    /// Stage breadcrumb with Back / Continue / Reset
    fn render_navigation(&self, ui: &mut egui::Ui) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        let stage = self.session.stage();

        ui.horizontal(|ui| {
            for (idx, step) in Stage::ALL.iter().enumerate() {
                if idx > 0 {
                    ui.weak("›");
                }
                let text = egui::RichText::new(format!("{}. {}", idx + 1, step.title()));
                if *step == stage {
                    ui.label(text.strong());
                } else {
                    ui.weak(text);
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(next) = stage.next() {
                    let label = match next {
                        Stage::Dimensions => "Continue to dimensions",
                        Stage::CausalEffects => "Compute causal effects",
                        Stage::Criticality => "Continue to criticality",
                        Stage::Deviations => "Continue",
                    };
                    if ui
                        .add_enabled(self.session.can_advance(), egui::Button::new(label))
                        .clicked()
                    {
                        events.push(SessionUpdate::Advance.into());
                    }
                }
                if ui
                    .add_enabled(stage.previous().is_some(), egui::Button::new("Back"))
                    .clicked()
                {
                    events.push(SessionUpdate::Back.into());
                }
                if ui.button("Reset & start over").clicked() {
                    events.push(SessionUpdate::Reset.into());
                }
            });
        });

        events
    }

    /// Render bottom status panel
    fn render_status_panel(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.status_message);

            if self.fetcher.in_flight() > 0 {
                ui.separator();
                ui.spinner();
                ui.label(format!("{} request(s) running", self.fetcher.in_flight()));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(self.fetcher.client().base_url());
                if let Some(at) = self.session.effects_fetched_at() {
                    ui.separator();
                    ui.weak(format!("Effects from {}", at.format("%H:%M:%S")));
                }
            });
        });
    }

    /// Render the current stage
    fn render_central_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) -> Vec<ViewEvent> {
        profiling::scope!("central_panel");

        let mut events = Vec::new();
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match self.session.stage() {
                Stage::Deviations => events.extend(views::deviations::show(ui, &self.session)),
                Stage::Dimensions => {
                    events.extend(self.dimensions_view.show(ui, &self.session));
                }
                Stage::CausalEffects => events.extend(views::causal::show(ui, &self.session)),
                Stage::Criticality => {
                    events.extend(views::criticality::show(ui, &self.session));
                    if self.session.selected_cell().is_some() {
                        ui.add_space(12.0);
                        ui.separator();
                        events.extend(self.render_root_cause(ui, ctx));
                    }
                }
            });
        events
    }

    fn render_root_cause(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) -> Vec<ViewEvent> {
        let key = if let (Some(cell), Fetched::Ready(matrix)) =
            (self.session.selected_cell(), self.session.matrix())
        {
            let key = ReportKey {
                matrix_generation: self.session.matrix_generation(),
                dimension: cell.dimension.clone(),
                deviation: cell.deviation.clone(),
                correlate: self.session.correlation().map(str::to_string),
                bins: self.config.histogram_bins,
                sample_limit: self.config.scatter_sample_limit,
            };
            let repaint = ctx.clone();
            self.reports.request(
                key.clone(),
                Arc::clone(matrix),
                &self.worker.sender(),
                move || repaint.request_repaint(),
            );
            Some(key)
        } else {
            None
        };

        let latest = self.reports.latest();
        let report = latest.as_ref().and_then(|(done, report)| {
            key.as_ref()
                .filter(|k| {
                    k.matrix_generation == done.matrix_generation
                        && k.dimension == done.dimension
                        && k.deviation == done.deviation
                })
                .map(|_| report.as_ref())
        });
        let computing = key.as_ref().is_some_and(|k| self.reports.is_computing(k));

        views::root_cause::show(ui, &self.session, &ReportView { report, computing })
    }
}

impl eframe::App for DeviscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        profiling::scope!("DeviscopeApp::update");

        if !self.started {
            self.started = true;
            self.apply(SessionUpdate::RefreshOverview, ctx);
        }

        // Check for messages from background threads
        self.process_replies(ctx);

        self.update_window_title(ctx);

        let mut events = Vec::new();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                events.extend(self.render_menu_bar(ui, ctx));
            });
        });

        egui::TopBottomPanel::top("navigation_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            events.extend(self.render_navigation(ui));
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            self.render_status_panel(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            events.extend(self.render_central_panel(ui, ctx));
        });

        self.handle_events(events, ctx);

        // Show windows
        if self.show_about {
            windows::render_about_window(ctx, &mut self.show_about, &self.config.api_url);
        }

        if let Some(window) = &mut self.settings_window {
            match window.render(ctx) {
                SettingsResult::Open => {}
                SettingsResult::Cancelled => self.settings_window = None,
                SettingsResult::Saved(config) => {
                    self.settings_window = None;
                    self.apply_settings(config, ctx);
                }
            }
        }

        let activities = self.activities();
        self.toasts.show(ctx, &activities);

        profiling::finish_frame!();
    }
}
