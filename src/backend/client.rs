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

//! Blocking HTTP client for the analysis backend.
//!
//! Calls are made from background threads, never from the UI thread. There are no
//! timeouts or retries: alignment and causal estimation can take minutes.

use super::types::{
    CausalEffectsRequest, CausalEffectsResponse, DeviationOverview, ErrorBody, UploadSummary,
};
use crate::analysis::{EffectRecord, ImpactMatrix};
use anyhow::{bail, Context, Result};
use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!("deviscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base_url, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .with_context(|| format!("Backend at {} is unreachable", self.base_url))?;
        decode::<serde_json::Value>(response, "health status").map(|_| ())
    }

    /// Send a BPMN model and an event log (XES or CSV).
    ///
    /// The backend computes the alignments before answering.
    pub fn upload(&self, bpmn: &Path, log: &Path) -> Result<UploadSummary> {
        let form = upload_form(bpmn, log)?;
        tracing::info!("Uploading {} and {}", bpmn.display(), log.display());
        let response = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .context("Failed to upload model and log")?;
        let summary: UploadSummary = decode(response, "upload confirmation")?;
        tracing::info!("Backend computed {} alignments", summary.alignment_count);
        Ok(summary)
    }

    pub fn deviation_overview(&self) -> Result<DeviationOverview> {
        tracing::debug!("Fetching deviation overview");
        let response = self
            .http
            .get(self.url("/api/deviation-overview"))
            .send()
            .context("Failed to request deviation overview")?;
        decode(response, "deviation overview")
    }

    pub fn compute_causal_effects(
        &self,
        request: &CausalEffectsRequest,
    ) -> Result<Vec<EffectRecord>> {
        tracing::info!(
            "Requesting causal effects for {} deviations x {} dimensions",
            request.deviations.len(),
            request.dimensions.len()
        );
        let response = self
            .http
            .post(self.url("/api/compute-causal-effects"))
            .json(request)
            .send()
            .context("Failed to request causal effects")?;
        let body: CausalEffectsResponse = decode(response, "causal effects")?;
        tracing::info!("Received {} effect records", body.results.len());
        Ok(body.results)
    }

    pub fn current_impact_matrix(&self) -> Result<ImpactMatrix> {
        tracing::debug!("Fetching impact matrix");
        let response = self
            .http
            .get(self.url("/api/current-impact-matrix"))
            .send()
            .context("Failed to request impact matrix")?;
        let matrix: ImpactMatrix = decode(response, "impact matrix")?;
        tracing::info!(
            "Received impact matrix with {} rows and {} columns",
            matrix.rows.len(),
            matrix.columns.len()
        );
        Ok(matrix)
    }

    /// Drop the backend's cached alignments and log
    pub fn reset(&self) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/reset"))
            .send()
            .context("Failed to reset backend")?;
        decode::<serde_json::Value>(response, "reset confirmation").map(|_| ())
    }
}

fn upload_form(bpmn: &Path, log: &Path) -> Result<Form> {
    Form::new()
        .file("bpmn", bpmn)
        .with_context(|| format!("Failed to read BPMN model {}", bpmn.display()))?
        .file("xes", log)
        .with_context(|| format!("Failed to read event log {}", log.display()))
}

fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("Failed to read {what} response"))?;

    if !status.is_success() {
        bail!(error_message(status.as_u16(), &body));
    }

    parse_body(&body, what)
}

fn parse_body<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body).with_context(|| format!("Backend returned malformed {what}"))
}

/// Text for a failed call: the backend's `error` field when it sent one
#[must_use]
pub fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(payload) => format!("Backend error ({status}): {}", payload.error),
        Err(_) if body.trim().is_empty() => format!("Backend error ({status})"),
        Err(_) => {
            let snippet: String = body.trim().chars().take(200).collect();
            format!("Backend error ({status}): {snippet}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = BackendClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
        assert_eq!(
            client.url("/api/current-impact-matrix"),
            "http://127.0.0.1:5000/api/current-impact-matrix"
        );
        assert_eq!(client.url("health"), "http://127.0.0.1:5000/health");
    }

    #[test]
    fn test_error_message_prefers_backend_text() {
        assert_eq!(
            error_message(400, r#"{"error": "Alignments not computed yet"}"#),
            "Backend error (400): Alignments not computed yet"
        );
        assert_eq!(error_message(502, "  "), "Backend error (502)");
        assert_eq!(
            error_message(500, "<h1>Internal Server Error</h1>"),
            "Backend error (500): <h1>Internal Server Error</h1>"
        );
    }

    #[test]
    fn test_upload_form_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let bpmn = dir.path().join("model.bpmn");
        std::fs::write(&bpmn, "<definitions/>").unwrap();
        let log = dir.path().join("missing.xes");

        let err = upload_form(&bpmn, &log).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read event log"));
        assert!(upload_form(&bpmn, &bpmn).is_ok());
    }

    #[test]
    fn test_parse_causal_effects_body() {
        let body = r#"{"results": [
            {"deviation": "(Skip A)", "dimension": "time", "ate": -1200.5, "p_value": 0.01},
            {"deviation": "(Skip A)", "dimension": "outcome", "ate": null, "p_value": null, "error": "no variance"}
        ]}"#;
        let parsed: CausalEffectsResponse = parse_body(body, "causal effects").unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].ate, Some(-1200.5));
        assert_eq!(parsed.results[1].error.as_deref(), Some("no variance"));

        let missing: CausalEffectsResponse = parse_body("{}", "causal effects").unwrap();
        assert!(missing.results.is_empty());
        assert!(parse_body::<CausalEffectsResponse>("[", "causal effects").is_err());
    }
}
