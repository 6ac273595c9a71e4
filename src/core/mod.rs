pub mod fetch;
pub mod report_cache;
pub mod worker;

pub use fetch::{FetchMessage, Fetcher};
pub use report_cache::{AnalysisSlot, ReportCache, ReportKey};
pub use worker::{JobSender, JobWorker};
