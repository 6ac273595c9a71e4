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

use clap::Parser;
use deviscope::config::GlobalConfig;
use deviscope::ui::DeviscopeApp;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "ram-profiling")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[derive(Parser, Debug)]
#[command(name = "deviscope")]
#[command(author = "Deviscope Team")]
#[command(version)]
#[command(
    about = "Explore causal effects of process deviations and rank them by criticality",
    long_about = None
)]
struct Args {
    /// Base URL of the analysis backend, overrides config and environment
    #[arg(long = "api-url", value_name = "URL")]
    api_url: Option<String>,

    /// Config file to use instead of the one in the user config directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path for the DHAT heap profiling output (only used when built with --features ram-profiling)
    #[cfg(feature = "ram-profiling")]
    #[arg(
        long = "profile-output",
        value_name = "PROFILE_FILE",
        default_value = "dhat-heap.json"
    )]
    profile_output: PathBuf,
}

fn main() -> eframe::Result<()> {
    // Set RUST_LOG environment variable to override (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        "Deviscope starting up (version {})",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    #[cfg(feature = "ram-profiling")]
    let _profiler = {
        tracing::info!("RAM profiling enabled, output: {:?}", args.profile_output);
        dhat::Profiler::builder()
            .file_name(args.profile_output.clone())
            .build()
    };

    #[cfg(feature = "cpu-profiling")]
    let _tracy = {
        tracing::info!("CPU profiling enabled with Tracy - run Tracy profiler to connect");
        tracy_client::Client::start()
    };

    let mut config = match &args.config {
        Some(path) => {
            let mut config = GlobalConfig::load_from(path);
            config.apply_env_override(std::env::var(deviscope::config::API_URL_ENV).ok());
            config
        }
        None => GlobalConfig::load(),
    };
    config.apply_env_override(args.api_url);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    let config_path = args.config;
    eframe::run_native(
        "Deviscope - Deviation Criticality Explorer",
        native_options,
        Box::new(move |cc| Ok(Box::new(DeviscopeApp::new(cc, config, config_path)?))),
    )
}

