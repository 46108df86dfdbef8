//! Core types for bulkjob

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a job
///
/// An opaque token assigned when the job is created. It correlates progress
/// queries and reports with a job, and disambiguates output filenames on
/// collision (the token is stable for the job's lifetime).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

impl JobId {
    /// Allocate the next job identifier (process-wide monotonic)
    pub fn next() -> Self {
        Self(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One addressable target of a bulk message send
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Phone number or contact identifier
    pub address: String,
    /// Placeholder name → substitution value (e.g. nombre, ticket, cedula, estado)
    pub fields: HashMap<String, String>,
}

impl Recipient {
    /// Create a recipient with no template fields
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            fields: HashMap::new(),
        }
    }

    /// Add a template substitution field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Message body plus optional attachment URLs, personalized per recipient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    /// Message body with `{placeholder}` markers
    pub body: String,
    /// Attachment URLs appended to the body before personalization
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl MessageTemplate {
    /// Create a template from a body with no attachments
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            attachments: Vec::new(),
        }
    }
}

/// What kind of bulk operation a job performs
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobKind {
    /// Large-dataset export; the server determines item count and chunking
    Export,
    /// Bulk message dispatch to an ordered recipient list
    BulkSend {
        /// Message template personalized per recipient
        template: MessageTemplate,
        /// Ordered recipients; read-only during execution
        recipients: Vec<Recipient>,
    },
}

impl JobKind {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Export => "export",
            JobKind::BulkSend { .. } => "bulk_send",
        }
    }
}

/// Default batch size for bulk-send jobs
///
/// Matches the group size the message gateway expects per request.
pub const DEFAULT_SEND_BATCH_SIZE: usize = 25;

/// Immutable description of a bulk operation
///
/// Created once per user-initiated action, never mutated. The orchestrator
/// instance owns it for the lifetime of one job.
#[derive(Clone, Debug)]
pub struct JobSpec {
    /// Operation kind (carries the recipient list for sends)
    pub kind: JobKind,
    /// Opaque key-value criteria forwarded to the remote service
    pub filter: HashMap<String, String>,
    /// Requested batch size; must be >= 1. For exports this is a hint;
    /// the server determines the authoritative chunking.
    pub batch_size: usize,
}

impl JobSpec {
    /// Describe an export job over a server-side dataset
    pub fn export(filter: HashMap<String, String>, batch_size: usize) -> Self {
        Self {
            kind: JobKind::Export,
            filter,
            batch_size,
        }
    }

    /// Describe a bulk-send job using [`DEFAULT_SEND_BATCH_SIZE`]
    pub fn bulk_send_default(template: MessageTemplate, recipients: Vec<Recipient>) -> Self {
        Self::bulk_send(template, recipients, DEFAULT_SEND_BATCH_SIZE)
    }

    /// Describe a bulk-send job over an in-memory recipient list
    pub fn bulk_send(
        template: MessageTemplate,
        recipients: Vec<Recipient>,
        batch_size: usize,
    ) -> Self {
        Self {
            kind: JobKind::BulkSend {
                template,
                recipients,
            },
            filter: HashMap::new(),
            batch_size,
        }
    }
}

/// Authoritative batch plan for one job
///
/// For exports this comes from the server's info endpoint; for sends it is
/// computed locally. Invariant: `total_batches = ceil(total_items / batch_size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    /// Total items covered by the job
    pub total_items: usize,
    /// Number of batches to execute
    pub total_batches: usize,
    /// Items per batch (the last batch may be smaller, never empty)
    pub batch_size: usize,
}

/// One bounded unit of work within a job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchDescriptor {
    /// 1-based position in the job, contiguous with no gaps
    pub index: usize,
    /// Items covered by this batch
    pub size: usize,
    /// Server-assigned batch number used in the export batch URL
    pub batch_number: usize,
}

/// Per-recipient outcome of a send batch, in batch order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    /// Recipient address the gateway reported on
    pub address: String,
    /// Whether the gateway accepted the message
    pub success: bool,
    /// Gateway message identifier, when accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Gateway error description, when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Successful outcome of one executed batch
///
/// Consumed exactly once by the result sink; never mutated after creation.
/// Failures travel as [`crate::Error`] values instead of a variant here, and
/// the orchestrator records them as [`BatchFailure`] entries.
#[derive(Clone, Debug)]
pub enum BatchSuccess {
    /// An export batch: opaque payload plus its resolved output name
    Download {
        /// Binary payload to persist
        payload: Vec<u8>,
        /// Server-suggested filename, or a synthesized `export_part_<n>` name
        name: String,
    },
    /// A send batch: per-recipient results preserving batch order
    Sent {
        /// One entry per recipient in the batch
        results: Vec<SendResult>,
    },
}

/// One recorded batch failure in a job report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// 1-based index of the batch that failed; 0 marks a planning failure
    pub index: usize,
    /// Error description captured from the executor or sink
    pub message: String,
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Obtaining the batch plan
    Planning,
    /// Executing batches in order
    Running,
    /// All batches succeeded
    Completed,
    /// The run reached the end with one or more batch failures
    PartiallyFailed,
    /// Stopped by request at a batch boundary
    Cancelled,
    /// Stopped by an unrecoverable planning or integrity error
    Aborted,
}

impl JobState {
    /// True once the job can no longer make progress
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Planning | JobState::Running)
    }
}

/// Read-only view of a running job's progress
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Batches attempted so far (failed attempts count, skipped ones do not)
    pub current_batch: usize,
    /// Batches planned for the job (0 while planning)
    pub total_batches: usize,
    /// `current_batch / total_batches * 100`, clamped to [0, 100]
    pub percent: f32,
    /// Whether cancellation has been requested
    pub cancelled: bool,
}

/// Terminal aggregate for one job
///
/// Created once when the job reaches a terminal state; immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobReport {
    /// The job this report belongs to
    pub job_id: JobId,
    /// Terminal state the job reached
    pub state: JobState,
    /// Batches the plan called for
    pub total_batches: usize,
    /// Batches that executed and committed successfully
    pub succeeded_batches: usize,
    /// Batches that were attempted and failed
    pub failed_batches: usize,
    /// Batches never attempted (cancellation or abort), distinct from failed
    pub not_attempted_batches: usize,
    /// Batch failures in execution order
    pub errors: Vec<BatchFailure>,
    /// Per-recipient ledger across all send batches, in batch order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ledger: Vec<SendResult>,
    /// Files written by the sink, in batch order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saved_files: Vec<PathBuf>,
    /// When the job reached its terminal state
    pub completed_at: DateTime<Utc>,
}

impl JobReport {
    /// User-facing one-line summary
    ///
    /// A run with failures is reported as "completed with N errors", never
    /// silently as full success; a cancelled run distinguishes completed
    /// batches from never-attempted ones.
    pub fn summary(&self) -> String {
        match self.state {
            JobState::Completed => {
                format!("completed: {} batches succeeded", self.succeeded_batches)
            }
            JobState::PartiallyFailed => format!(
                "completed with {} errors: {} succeeded, {} failed",
                self.errors.len(),
                self.succeeded_batches,
                self.failed_batches
            ),
            JobState::Cancelled => format!(
                "cancelled: {} completed, {} failed, {} not attempted",
                self.succeeded_batches, self.failed_batches, self.not_attempted_batches
            ),
            JobState::Aborted => format!(
                "aborted: {} completed, {} failed, {} not attempted",
                self.succeeded_batches, self.failed_batches, self.not_attempted_batches
            ),
            JobState::Planning | JobState::Running => "in progress".to_string(),
        }
    }
}
