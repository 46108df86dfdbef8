//! Batch planning
//!
//! Turns a [`JobSpec`] into an authoritative [`BatchPlan`] and expands the
//! plan into ordered batch descriptors. Export plans come from the server's
//! info endpoint (the server owns chunking and may ignore the client's batch
//! size hint); bulk-send plans are computed locally, no remote call needed.

use crate::error::{Error, Result};
use crate::remote::RemoteService;
use crate::types::{BatchDescriptor, BatchPlan, JobKind, JobSpec};

/// Obtain the batch plan for a job
///
/// Fails with [`Error::InvalidPlan`] on a zero batch size, a failed or
/// timed-out planning call, or a contradictory server response. The one
/// remote call for exports is the only side effect.
pub async fn plan(spec: &JobSpec, remote: &dyn RemoteService) -> Result<BatchPlan> {
    match &spec.kind {
        JobKind::Export => plan_export(spec, remote).await,
        JobKind::BulkSend { recipients, .. } => plan_bulk_send(spec, recipients.len()),
    }
}

async fn plan_export(spec: &JobSpec, remote: &dyn RemoteService) -> Result<BatchPlan> {
    let info = remote.export_info(&spec.filter).await.map_err(|e| {
        Error::invalid_plan(format!("export planning call failed: {e}"))
    })?;

    let total_items = info.total_records as usize;
    let total_batches = info.num_batches as usize;
    let batch_size = info.batch_size as usize;

    // Defensive contradiction checks on the server-reported plan
    if total_items > 0 && total_batches == 0 {
        return Err(Error::invalid_plan(format!(
            "server reported {total_items} items but zero batches"
        )));
    }
    if total_items > 0 && batch_size == 0 {
        return Err(Error::invalid_plan(format!(
            "server reported {total_items} items but a zero batch size"
        )));
    }
    if total_items > 0 && total_batches != total_items.div_ceil(batch_size) {
        return Err(Error::invalid_plan(format!(
            "server plan is inconsistent: {total_items} items, batch size {batch_size}, \
             but {total_batches} batches"
        )));
    }

    tracing::debug!(
        total_items,
        total_batches,
        batch_size,
        "export plan received from server"
    );

    Ok(BatchPlan {
        total_items,
        total_batches,
        batch_size,
    })
}

fn plan_bulk_send(spec: &JobSpec, total_items: usize) -> Result<BatchPlan> {
    if spec.batch_size == 0 {
        return Err(Error::invalid_plan("batch size must be at least 1"));
    }

    Ok(BatchPlan {
        total_items,
        total_batches: total_items.div_ceil(spec.batch_size),
        batch_size: spec.batch_size,
    })
}

/// Expand a plan into ordered batch descriptors
///
/// Indices are 1-based and contiguous; only the last batch may be smaller
/// than the plan's batch size, and it is never empty. For exports the
/// server-assigned batch number equals the index (the server numbers parts
/// from 1).
pub fn descriptors(plan: &BatchPlan) -> Vec<BatchDescriptor> {
    (1..=plan.total_batches)
        .map(|index| {
            let consumed = plan.batch_size * (index - 1);
            BatchDescriptor {
                index,
                size: plan.batch_size.min(plan.total_items - consumed),
                batch_number: index,
            }
        })
        .collect()
}
