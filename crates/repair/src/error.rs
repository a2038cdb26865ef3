//! Reconciliation error types.

use adapters::AdapterError;
use thiserror::Error;

/// Errors that abort a whole reconciliation run.
///
/// Per-row problems never surface here; they are counted in the run
/// report and the run continues. Only a failure that makes the scan
/// itself impossible aborts.
#[derive(Debug, Error)]
pub enum RepairError {
    /// The full scan of the listing store failed.
    #[error("listing store scan failed: {0}")]
    Scan(#[source] AdapterError),
}

/// Convenience type alias for reconciliation results.
pub type Result<T> = std::result::Result<T, RepairError>;
