pub mod causal;
pub mod criticality;
pub mod deviations;
pub mod dimensions;
pub mod root_cause;

use crate::state::SessionUpdate;

pub use dimensions::DimensionsView;

/// Files the criticality view can save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Csv,
    Pdf,
    CriticalityMap,
}

/// What a view asks the app to do after rendering
#[derive(Debug, Clone)]
pub enum ViewEvent {
    Session(SessionUpdate),
    Export(ExportKind),
    /// Ask for a model and a log file, then upload them
    PickUpload,
}

impl From<SessionUpdate> for ViewEvent {
    fn from(update: SessionUpdate) -> Self {
        Self::Session(update)
    }
}
