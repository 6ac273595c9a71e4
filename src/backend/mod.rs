pub mod client;
pub mod types;

pub use client::BackendClient;
pub use types::{
    CausalEffectsRequest, ComparisonOperator, DeviationCount, DeviationKind, DeviationOverview,
    DeviationSelection, DimensionComputation, RuleValue, UploadSummary,
};

use crate::analysis::{EffectRecord, ImpactMatrix};
use std::path::PathBuf;

/// A backend call the UI wants made
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Send a process model and an event log; the backend aligns them
    Upload { bpmn: PathBuf, log: PathBuf },
    DeviationOverview,
    /// `ticket` comes back with the reply so superseded answers can be told apart
    CausalEffects {
        ticket: u64,
        body: CausalEffectsRequest,
    },
    ImpactMatrix,
    Reset,
}

impl Request {
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "Uploading model and log",
            Self::DeviationOverview => "Loading deviation overview",
            Self::CausalEffects { .. } => "Computing causal effects",
            Self::ImpactMatrix => "Loading impact matrix",
            Self::Reset => "Resetting backend",
        }
    }
}

/// Outcome of a [`Request`]; errors are already rendered for display
#[derive(Debug, Clone)]
pub enum Reply {
    Upload(Result<UploadSummary, String>),
    DeviationOverview(Result<DeviationOverview, String>),
    CausalEffects {
        ticket: u64,
        result: Result<Vec<EffectRecord>, String>,
    },
    ImpactMatrix(Result<ImpactMatrix, String>),
    Reset(Result<(), String>),
}

impl Reply {
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Upload(Err(e))
            | Self::DeviationOverview(Err(e))
            | Self::CausalEffects { result: Err(e), .. }
            | Self::ImpactMatrix(Err(e))
            | Self::Reset(Err(e)) => Some(e),
            Self::Upload(Ok(_))
            | Self::DeviationOverview(Ok(_))
            | Self::CausalEffects { result: Ok(_), .. }
            | Self::ImpactMatrix(Ok(_))
            | Self::Reset(Ok(())) => None,
        }
    }
}

/// Run a request to completion on the calling thread
#[must_use]
pub fn execute(client: &BackendClient, request: Request) -> Reply {
    profiling::scope!("backend::execute");
    let render = |e: anyhow::Error| format!("{e:#}");
    match request {
        Request::Upload { bpmn, log } => Reply::Upload(client.upload(&bpmn, &log).map_err(render)),
        Request::DeviationOverview => {
            Reply::DeviationOverview(client.deviation_overview().map_err(render))
        }
        Request::CausalEffects { ticket, body } => Reply::CausalEffects {
            ticket,
            result: client.compute_causal_effects(&body).map_err(render),
        },
        Request::ImpactMatrix => {
            Reply::ImpactMatrix(client.current_impact_matrix().map_err(render))
        }
        Request::Reset => Reply::Reset(client.reset().map_err(render)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_of_missing_files_fails_before_sending() {
        // Nothing listens on port 9; a network attempt would give a different error
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let reply = execute(
            &client,
            Request::Upload {
                bpmn: dir.path().join("model.bpmn"),
                log: dir.path().join("log.xes"),
            },
        );
        let err = reply.error().unwrap();
        assert!(err.contains("model.bpmn"), "{err}");
    }

    #[test]
    fn test_effects_reply_keeps_ticket() {
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let reply = execute(
            &client,
            Request::CausalEffects {
                ticket: 7,
                body: CausalEffectsRequest::default(),
            },
        );
        assert!(matches!(reply, Reply::CausalEffects { ticket: 7, result: Err(_) }));
    }
}
