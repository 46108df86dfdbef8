//! # bulkjob
//!
//! Backend library for long-running batched bulk operations against a remote
//! service: chunked dataset exports saved to files, and bulk message dispatch
//! with per-recipient personalization and accounting.
//!
//! ## Design Philosophy
//!
//! bulkjob is designed to be:
//! - **Batch-oriented** - Work is split into bounded batches executed
//!   strictly in order, so partial progress is always well defined
//! - **Observable** - Every job exposes a live progress snapshot and ends
//!   with exactly one terminal report, failures included
//! - **Cooperative** - Cancellation is a flag observed at batch boundaries;
//!   in-flight work is never interrupted
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use bulkjob::{HttpRemote, JobConfig, JobSpec, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = JobConfig::default();
//!     let remote = HttpRemote::new(
//!         "https://api.example.com/export/info".parse()?,
//!         "https://api.example.com/export/batch".parse()?,
//!         "https://api.example.com/messages/bulk".parse()?,
//!         config.request_timeout,
//!     )?;
//!
//!     let orchestrator = Orchestrator::new(Arc::new(remote), config);
//!
//!     let mut filter = HashMap::new();
//!     filter.insert("estado".to_string(), "activo".to_string());
//!     let handle = orchestrator.start(JobSpec::export(filter, 500));
//!
//!     let report = handle.report().await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single-batch execution
pub mod executor;
/// Job orchestration and handles
pub mod orchestrator;
/// Batch planning
pub mod planner;
/// Progress tracking and cancellation
pub mod progress;
/// Remote service boundary
pub mod remote;
/// Retry logic with exponential backoff
pub mod retry;
/// Result committing (files and ledger)
pub mod sink;
/// Message template rendering
pub mod template;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{FailurePolicy, JobConfig, RetryConfig};
pub use error::{Error, Result};
pub use orchestrator::{JobHandle, Orchestrator};
pub use progress::ProgressTracker;
pub use remote::{ExportBatch, ExportInfo, HttpRemote, OutboundMessage, RemoteService};
pub use sink::{FileStore, PayloadStore, ResultSink};
pub use types::{
    BatchDescriptor, BatchFailure, BatchPlan, BatchSuccess, DEFAULT_SEND_BATCH_SIZE, JobId,
    JobKind, JobReport, JobSpec, JobState, MessageTemplate, ProgressSnapshot, Recipient,
    SendResult,
};
