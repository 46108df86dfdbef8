//! Job orchestration
//!
//! Owns the full lifecycle of one job: obtain the plan, execute batches
//! strictly in ascending order, commit every successful outcome before
//! progress moves, and deliver exactly one terminal [`JobReport`]. Each job
//! runs on its own tokio task; the caller keeps a [`JobHandle`] to observe
//! progress, request cooperative cancellation, and await the report.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;

use crate::config::{FailurePolicy, JobConfig};
use crate::error::{Error, Result};
use crate::executor::BatchExecutor;
use crate::planner;
use crate::progress::ProgressTracker;
use crate::remote::RemoteService;
use crate::retry::execute_with_retry;
use crate::sink::{FileStore, PayloadStore, ResultSink};
use crate::types::{BatchFailure, JobId, JobReport, JobSpec, JobState, ProgressSnapshot};

/// Starts jobs and owns the wiring they run against
///
/// One orchestrator can start any number of jobs; each gets its own task,
/// tracker, and report channel. The remote transport and payload store are
/// shared.
pub struct Orchestrator {
    remote: Arc<dyn RemoteService>,
    store: Arc<dyn PayloadStore>,
    config: JobConfig,
}

impl Orchestrator {
    /// Create an orchestrator persisting exports under `config.output_dir`
    pub fn new(remote: Arc<dyn RemoteService>, config: JobConfig) -> Self {
        let store = Arc::new(FileStore::new(config.output_dir.clone()));
        Self {
            remote,
            store,
            config,
        }
    }

    /// Create an orchestrator with a caller-supplied payload store
    pub fn with_store(
        remote: Arc<dyn RemoteService>,
        store: Arc<dyn PayloadStore>,
        config: JobConfig,
    ) -> Self {
        Self {
            remote,
            store,
            config,
        }
    }

    /// Start a job and return immediately with a handle to observe it
    ///
    /// The job runs to a terminal state on its own task whether or not the
    /// handle is kept; dropping the handle discards the report but does not
    /// cancel the job.
    pub fn start(&self, spec: JobSpec) -> JobHandle {
        let job_id = JobId::next();
        let tracker = ProgressTracker::new(0);
        let (report_tx, report_rx) = oneshot::channel();

        let remote = Arc::clone(&self.remote);
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let job_tracker = tracker.clone();

        tokio::spawn(async move {
            let report = run_job(job_id, spec, remote, store, config, job_tracker).await;
            tracing::info!(job_id = %job_id, "{}", report.summary());
            // Nobody listening means the report is discarded, not an error here
            let _ = report_tx.send(report);
        });

        JobHandle {
            id: job_id,
            tracker,
            report_rx,
        }
    }
}

/// Caller-side handle for one running job
pub struct JobHandle {
    id: JobId,
    tracker: ProgressTracker,
    report_rx: oneshot::Receiver<JobReport>,
}

impl JobHandle {
    /// The job's identifier
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Current progress snapshot, readable at any time
    pub fn progress(&self) -> ProgressSnapshot {
        self.tracker.snapshot()
    }

    /// Request cooperative cancellation
    ///
    /// The job observes the flag at the next batch boundary; an in-flight
    /// batch is never interrupted. Safe to call more than once.
    pub fn cancel(&self) {
        self.tracker.cancel();
    }

    /// Wait for the job's terminal report
    pub async fn report(self) -> Result<JobReport> {
        self.report_rx.await.map_err(|_| Error::ReportLost)
    }
}

/// Drive one job from planning to its terminal report
async fn run_job(
    job_id: JobId,
    spec: JobSpec,
    remote: Arc<dyn RemoteService>,
    store: Arc<dyn PayloadStore>,
    config: JobConfig,
    tracker: ProgressTracker,
) -> JobReport {
    tracing::info!(job_id = %job_id, kind = spec.kind.name(), "job started");

    let mut report = JobReport {
        job_id,
        state: JobState::Planning,
        total_batches: 0,
        succeeded_batches: 0,
        failed_batches: 0,
        not_attempted_batches: 0,
        errors: Vec::new(),
        ledger: Vec::new(),
        saved_files: Vec::new(),
        completed_at: Utc::now(),
    };

    let plan = match planner::plan(&spec, remote.as_ref()).await {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "planning failed, job aborted");
            report.state = JobState::Aborted;
            report.errors.push(BatchFailure {
                index: 0,
                message: e.to_string(),
            });
            report.completed_at = Utc::now();
            return report;
        }
    };

    let descriptors = planner::descriptors(&plan);
    tracker.set_total(plan.total_batches);
    report.total_batches = plan.total_batches;
    report.state = JobState::Running;
    tracing::info!(
        job_id = %job_id,
        total_items = plan.total_items,
        total_batches = plan.total_batches,
        batch_size = plan.batch_size,
        "plan obtained"
    );

    let executor = BatchExecutor::new(remote.as_ref(), &spec);
    let sink = ResultSink::new(store.as_ref(), job_id);
    let mut final_state: Option<JobState> = None;

    for descriptor in &descriptors {
        // Pacing applies between batches, never before the first one
        if descriptor.index > 1 && !config.pacing_delay.is_zero() {
            tokio::time::sleep(config.pacing_delay).await;
        }

        if tracker.is_cancelled() {
            tracing::info!(
                job_id = %job_id,
                next_batch = descriptor.index,
                "cancellation observed at batch boundary"
            );
            final_state = Some(JobState::Cancelled);
            break;
        }

        let outcome = execute_with_retry(&config.retry, || executor.execute(descriptor)).await;

        // An uncommitted payload counts as a batch failure, same as a
        // failed fetch
        let committed = match outcome {
            Ok(success) => sink.commit(success, &mut report).await,
            Err(e) => Err(e),
        };

        tracker.advance();

        match committed {
            Ok(()) => {
                report.succeeded_batches += 1;
                tracing::debug!(job_id = %job_id, batch = descriptor.index, "batch committed");
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    batch = descriptor.index,
                    error = %e,
                    "batch failed"
                );
                report.failed_batches += 1;
                report.errors.push(BatchFailure {
                    index: descriptor.index,
                    message: e.to_string(),
                });
                if config.on_batch_failure == FailurePolicy::Abort {
                    final_state = Some(JobState::Aborted);
                    break;
                }
            }
        }
    }

    report.not_attempted_batches =
        report.total_batches - report.succeeded_batches - report.failed_batches;
    report.state = final_state.unwrap_or(if report.failed_batches > 0 {
        JobState::PartiallyFailed
    } else {
        JobState::Completed
    });
    report.completed_at = Utc::now();
    report
}
