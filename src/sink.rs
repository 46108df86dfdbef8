//! Result sink
//!
//! Commits successful batch outcomes to their destination: export payloads
//! go to durable storage, per-recipient send results go to the job report's
//! ledger. A commit must be confirmed before the orchestrator advances
//! progress, so payload writes are flushed, never fire-and-forget.
//!
//! "Persist a payload" is behind the [`PayloadStore`] trait so embedders can
//! substitute a temp-file-plus-move scheme or a platform download call;
//! [`FileStore`] is the plain filesystem implementation.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::types::{BatchSuccess, JobId, JobReport};

/// Durable destination for export payloads
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Persist a payload under `name`, fully flushed before returning.
    /// Returns the location actually written.
    async fn persist(&self, name: &str, payload: &[u8]) -> Result<PathBuf>;

    /// Whether `name` is already taken at the destination
    async fn exists(&self, name: &str) -> bool;
}

/// Filesystem-backed payload store
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store payloads as files under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PayloadStore for FileStore {
    async fn persist(&self, name: &str, payload: &[u8]) -> Result<PathBuf> {
        let persist_err = |source: std::io::Error| Error::Persist {
            name: name.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(persist_err)?;
        let path = self.dir.join(name);
        let mut file = tokio::fs::File::create(&path).await.map_err(persist_err)?;
        file.write_all(payload).await.map_err(persist_err)?;
        // The write must be confirmed before progress advances
        file.sync_all().await.map_err(persist_err)?;
        Ok(path)
    }

    async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.dir.join(name))
            .await
            .unwrap_or(false)
    }
}

/// Commits batch outcomes for one job
pub struct ResultSink<'a> {
    store: &'a dyn PayloadStore,
    job_id: JobId,
}

impl<'a> ResultSink<'a> {
    /// Create a sink bound to one job's store and token
    pub fn new(store: &'a dyn PayloadStore, job_id: JobId) -> Self {
        Self { store, job_id }
    }

    /// Commit one successful outcome into durable storage and the report
    ///
    /// Download outcomes are written under their resolved name; on a name
    /// collision the job token is appended before the extension, so the
    /// disambiguated name is deterministic for a given collision state.
    /// Send outcomes are appended to the report ledger in batch order,
    /// without deduplication by address.
    pub async fn commit(&self, outcome: BatchSuccess, report: &mut JobReport) -> Result<()> {
        match outcome {
            BatchSuccess::Download { payload, name } => {
                let final_name = if self.store.exists(&name).await {
                    disambiguate(&name, self.job_id)
                } else {
                    name
                };
                let path = self.store.persist(&final_name, &payload).await?;
                tracing::debug!(job_id = %self.job_id, path = %path.display(), "payload committed");
                report.saved_files.push(path);
            }
            BatchSuccess::Sent { results } => {
                report.ledger.extend(results);
            }
        }
        Ok(())
    }
}

/// Append the job token before the extension: `name_7.xlsx`, `name_7`
fn disambiguate(name: &str, job_id: JobId) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{job_id}.{ext}"),
        _ => format!("{name}_{job_id}"),
    }
}
