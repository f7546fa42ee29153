//! The monitoring core: catalog pusher, probe worker, and the debounced
//! status-change notifier.
//!
//! Data flow: catalog -> [`pusher::CatalogPusher`] -> stream -> per-region
//! [`worker::ProbeWorker`] -> [`prober`] -> tick sink + [`alerts::AlertEvaluator`]
//! -> alert mailer.

pub mod alerts;
pub mod error;
pub mod prober;
pub mod pusher;
pub mod worker;

pub use alerts::AlertEvaluator;
pub use error::MonitorError;
pub use prober::{normalize_url, Probe, ProbeOutcome, Prober};
pub use pusher::CatalogPusher;
pub use worker::{ProbeWorker, WorkerOptions};

pub type Result<T> = std::result::Result<T, MonitorError>;
