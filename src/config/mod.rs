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

use crate::analysis::root_cause::DEFAULT_SCATTER_LIMIT;
use crate::analysis::stats::DEFAULT_BINS;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Environment variable overriding the configured backend URL
pub const API_URL_ENV: &str = "DEVISCOPE_API_URL";

/// Global user configuration stored in config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Base URL of the analysis backend
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Number of bins in root-cause histograms
    #[serde(default = "default_bins")]
    pub histogram_bins: usize,

    /// Maximum number of points drawn in correlation scatter plots
    #[serde(default = "default_scatter_limit")]
    pub scatter_sample_limit: usize,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_bins() -> usize {
    DEFAULT_BINS
}

const fn default_scatter_limit() -> usize {
    DEFAULT_SCATTER_LIMIT
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            histogram_bins: default_bins(),
            scatter_sample_limit: default_scatter_limit(),
        }
    }
}

impl GlobalConfig {
    /// Get the path to the global config file
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deviscope").join("config.json"))
    }

    /// Load global config from disk, returning defaults if not found or unreadable.
    ///
    /// The `DEVISCOPE_API_URL` environment variable wins over the file.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_env_override(std::env::var(API_URL_ENV).ok());
        config
    }

    /// Load a config file, falling back to defaults on any problem
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No global config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => {
                tracing::info!("Loaded global config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable config: {e:#}");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Replace the backend URL if `value` is set and non-empty
    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            tracing::debug!("Backend URL overridden from environment: {url}");
            self.api_url = url;
        }
    }

    /// Save global config to its default location
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().context("Could not determine config directory")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).context("Failed to write config file")?;

        tracing::info!("Saved global config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GlobalConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_url": "http://analysis:8080"}"#).unwrap();

        let config = GlobalConfig::load_from(&path);
        assert_eq!(config.api_url, "http://analysis:8080");
        assert_eq!(config.histogram_bins, DEFAULT_BINS);
    }

    #[test]
    fn test_garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(GlobalConfig::load_from(&path), GlobalConfig::default());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = GlobalConfig {
            api_url: "http://example:1".to_string(),
            histogram_bins: 20,
            scatter_sample_limit: 50,
        };
        config.save_to(&path).unwrap();
        assert_eq!(GlobalConfig::load_from(&path), config);
    }

    #[test]
    fn test_env_override() {
        let mut config = GlobalConfig::default();
        config.apply_env_override(Some("   ".to_string()));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        config.apply_env_override(Some(" http://other:9000 ".to_string()));
        assert_eq!(config.api_url, "http://other:9000");
        config.apply_env_override(None);
        assert_eq!(config.api_url, "http://other:9000");
    }
}
