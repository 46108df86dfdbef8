//! Error types for bulkjob
//!
//! The taxonomy follows the job lifecycle:
//! - `InvalidPlan`: planning-time failures, fatal to the job (no batch runs)
//! - `Gateway` / `Network`: per-batch transport failures, recoverable (the
//!   job continues unless the failure policy says otherwise)
//! - `Persist`: the sink could not commit a successful batch; treated as a
//!   batch failure even though the remote call succeeded, since an
//!   uncommitted result must not advance progress

use thiserror::Error;

/// Result type alias for bulkjob operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bulkjob
#[derive(Debug, Error)]
pub enum Error {
    /// Planning failed: bad batch size, contradictory server plan, or a
    /// failed/timed-out planning call. Fatal to the job.
    #[error("invalid plan: {message}")]
    InvalidPlan {
        /// Human-readable description of what made the plan invalid
        message: String,
    },

    /// The remote service answered with a non-success HTTP status
    #[error("gateway returned status {status}: {message}")]
    Gateway {
        /// HTTP status code returned by the remote service
        status: u16,
        /// Response body or status text, for the job report
        message: String,
    },

    /// Network or timeout error talking to the remote service
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The sink could not durably commit a successful batch outcome
    #[error("failed to persist {name}: {source}")]
    Persist {
        /// The output name that could not be written
        name: String,
        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "output_dir")
        key: Option<String>,
    },

    /// The job task terminated without delivering its report
    #[error("job terminated without producing a report")]
    ReportLost,
}

impl Error {
    /// Shorthand for an [`Error::InvalidPlan`]
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan {
            message: message.into(),
        }
    }

    /// True if this error terminates the job before any batch runs
    pub fn is_planning_fatal(&self) -> bool {
        matches!(self, Error::InvalidPlan { .. } | Error::Config { .. })
    }
}
