//! Host runtime: owns the corpus state and drives searches and AI enrichment
//! against it.

mod inflight;
pub use inflight::OperationKind;

mod monitor;
pub use monitor::{EnrichOutcome, Monitor, NO_RESULTS, SearchError};
