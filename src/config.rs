//! Configuration types for bulkjob

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What the orchestrator does when a batch fails mid-run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and continue with the next batch (default)
    #[default]
    Continue,
    /// Stop immediately; remaining batches are reported as not attempted
    Abort,
}

/// Retry policy for transient batch failures
///
/// Applied by the orchestrator around each batch execution; the executor
/// itself never retries. The default is no retries, matching the behavior
/// the job report model assumes (one attempt per batch unless opted in).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial try (default: 0)
    #[serde(default)]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 500ms)
    #[serde(default = "default_initial_delay")]
    pub initial_delay: Duration,

    /// Upper bound on any single retry delay (default: 30s)
    #[serde(default = "default_max_delay")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each attempt (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays to avoid thundering herd (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Job execution configuration
///
/// One `JobConfig` is shared by all jobs an orchestrator starts. Per-job
/// inputs (filter, batch size, recipients) live on
/// [`JobSpec`](crate::types::JobSpec) instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Directory export payloads are written to (default: "./exports")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Pause between consecutive batches (default: 1500ms)
    ///
    /// A backpressure valve for downstream systems: message-gateway rate
    /// limits, or environments where each saved file triggers a prompt.
    /// Not a correctness requirement; zero disables pacing.
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay: Duration,

    /// Timeout applied to every remote call (default: 30s)
    ///
    /// A timed-out planning call surfaces as an invalid plan; a timed-out
    /// batch call surfaces as an ordinary batch failure.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Continuation policy for mid-run batch failures
    #[serde(default)]
    pub on_batch_failure: FailurePolicy,

    /// Retry policy for transient batch failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pacing_delay: default_pacing_delay(),
            request_timeout: default_request_timeout(),
            on_batch_failure: FailurePolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_pacing_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}
