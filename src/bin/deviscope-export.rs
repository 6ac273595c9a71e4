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

//! Headless export: fetch causal effects, classify them with the default
//! criticality boundaries and write the ranked results as CSV.

use anyhow::{bail, Context, Result};
use clap::Parser;
use deviscope::analysis::root_cause::KNOWN_DIMENSIONS;
use deviscope::analysis::{prioritize, BoundaryBuilder, EffectTable};
use deviscope::backend::{BackendClient, CausalEffectsRequest, DeviationKind, DeviationSelection};
use deviscope::config::{GlobalConfig, API_URL_ENV};
use deviscope::export;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deviscope-export")]
#[command(version)]
#[command(
    about = "Write criticality and priority results of the current backend session as CSV",
    long_about = None
)]
struct Args {
    /// Base URL of the analysis backend, overrides config and environment
    #[arg(long = "api-url", value_name = "URL")]
    api_url: Option<String>,

    /// Config file to use instead of the one in the user config directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// BPMN model to upload before exporting; needs --log
    #[arg(long, value_name = "FILE", requires = "log")]
    bpmn: Option<PathBuf>,

    /// XES or CSV event log to upload before exporting; needs --bpmn
    #[arg(long, value_name = "FILE", requires = "bpmn")]
    log: Option<PathBuf>,

    /// Skipped activity to analyse (repeatable)
    #[arg(long = "skip", value_name = "ACTIVITY")]
    skips: Vec<String>,

    /// Inserted activity to analyse (repeatable)
    #[arg(long = "insert", value_name = "ACTIVITY")]
    insertions: Vec<String>,

    /// Dimension to analyse (repeatable); all known dimensions when omitted
    #[arg(long = "dimension", value_name = "NAME")]
    dimensions: Vec<String>,

    /// CSV output file; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write the criticality map as JSON
    #[arg(long = "map-json", value_name = "FILE")]
    map_json: Option<PathBuf>,

    /// Also write the two-page PDF report
    #[arg(long, value_name = "FILE")]
    pdf: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let mut config = GlobalConfig::load_from(path);
            config.apply_env_override(std::env::var(API_URL_ENV).ok());
            config
        }
        None => GlobalConfig::load(),
    };
    config.apply_env_override(args.api_url.clone());

    let client = BackendClient::new(config.api_url)?;
    client
        .health()
        .with_context(|| format!("Backend at {} is not healthy", client.base_url()))?;

    if let (Some(bpmn), Some(log)) = (&args.bpmn, &args.log) {
        let summary = client.upload(bpmn, log)?;
        tracing::info!("{} ({} alignments)", summary.message, summary.alignment_count);
    }

    let deviations = select_deviations(&client, &args)?;
    if deviations.is_empty() {
        bail!("The backend reports no deviations to analyse");
    }
    let dimensions = if args.dimensions.is_empty() {
        KNOWN_DIMENSIONS.iter().map(ToString::to_string).collect()
    } else {
        args.dimensions.clone()
    };

    let request = CausalEffectsRequest {
        deviations: deviations.iter().map(|d| d.column.clone()).collect(),
        dimensions: dimensions.clone(),
        ..Default::default()
    };
    let effects = EffectTable::new(client.compute_causal_effects(&request)?);
    for record in effects.records() {
        if let Some(err) = &record.error {
            tracing::warn!("{} / {}: {err}", record.dimension, record.deviation);
        }
    }

    let mut boundaries = BoundaryBuilder::new();
    boundaries.observe(&effects, &dimensions);
    let map = boundaries.build_map();
    let priorities = prioritize(&effects, &map);

    match &args.output {
        Some(path) => export::write_csv(path, &effects, &map, &priorities)?,
        None => {
            let csv = export::criticality_csv(&effects, &map, &priorities);
            std::io::stdout()
                .lock()
                .write_all(csv.as_bytes())
                .context("Failed to write CSV to stdout")?;
        }
    }

    if let Some(path) = &args.map_json {
        export::write_map_json(path, &map)?;
    }
    if let Some(path) = &args.pdf {
        export::write_pdf(path, &effects, &map, &priorities)?;
    }

    Ok(())
}

/// Deviations named on the command line, or every deviation the backend knows
fn select_deviations(client: &BackendClient, args: &Args) -> Result<Vec<DeviationSelection>> {
    let named = args
        .skips
        .iter()
        .map(|a| DeviationSelection::from_activity(a, DeviationKind::Skip))
        .chain(
            args.insertions
                .iter()
                .map(|a| DeviationSelection::from_activity(a, DeviationKind::Insertion)),
        );
    let selected: Vec<DeviationSelection> = named.collect();
    if !selected.is_empty() {
        return Ok(selected);
    }

    let overview = client.deviation_overview()?;
    tracing::info!(
        "No deviations given, using all {} skips and {} insertions",
        overview.skips.len(),
        overview.insertions.len()
    );
    Ok([DeviationKind::Skip, DeviationKind::Insertion]
        .into_iter()
        .flat_map(|kind| {
            overview
                .items(kind)
                .iter()
                .map(move |item| DeviationSelection::from_activity(&item.activity, kind))
        })
        .collect())
}
