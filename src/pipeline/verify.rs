//! Phase 2: verification of every candidate on a bounded worker pool

use super::candidate::{Candidate, Classification};
use super::{RunCounters, RunOptions};
use crate::cache::{copy_replace, remove_if_exists, CacheNamespace};
use crate::error::{JarsignError, JarsignResult};
use crate::identity::SigningIdentity;
use crate::pack::PackAdapter;
use crate::tools::SigningTool;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Restores cached artifacts and verifies signatures
#[derive(Clone)]
pub struct VerificationPipeline {
    namespace: CacheNamespace,
    signer: Arc<dyn SigningTool>,
    packer: PackAdapter,
    identity: SigningIdentity,
    options: Arc<RunOptions>,
    counters: Arc<RunCounters>,
}

impl VerificationPipeline {
    pub fn new(
        namespace: CacheNamespace,
        signer: Arc<dyn SigningTool>,
        packer: PackAdapter,
        identity: SigningIdentity,
        options: Arc<RunOptions>,
        counters: Arc<RunCounters>,
    ) -> Self {
        Self {
            namespace,
            signer,
            packer,
            identity,
            options,
            counters,
        }
    }

    /// Verify all candidates with at most `workers` running at once
    ///
    /// No task is started once `cancel` fires or a task has failed; tasks
    /// already running are awaited. The first error is returned.
    pub async fn run(
        &self,
        candidates: Vec<Candidate>,
        workers: usize,
        cancel: &CancellationToken,
    ) -> JarsignResult<()> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut first_error: Option<JarsignError> = None;

        for candidate in candidates {
            while let Some(result) = tasks.try_join_next() {
                record(result, &mut first_error);
            }
            if first_error.is_some() {
                break;
            }

            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    first_error = Some(JarsignError::Interrupted);
                    break;
                }
                permit = semaphore.clone().acquire_owned() => permit
                    .map_err(|e| JarsignError::Internal(format!("worker pool closed: {}", e)))?,
            };

            let pipeline = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                pipeline.verify_candidate(&candidate).await
            });
        }

        while let Some(result) = tasks.join_next().await {
            record(result, &mut first_error);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Restore (if cached) and verify one candidate
    pub async fn verify_candidate(&self, candidate: &Candidate) -> JarsignResult<()> {
        let artifact = self.artifact_path(candidate);

        match candidate.classification {
            Classification::Cached => {
                let lock = self.namespace.lock();
                let _guard = lock.lock().await;
                copy_replace(&candidate.cached_copy_path, &artifact)
                    .await
                    .map_err(|e| JarsignError::cache_io(&candidate.cached_copy_path, e))?;
                info!("Restored {} from cache", artifact.display());
            }
            Classification::New | Classification::Signed => {}
        }

        if self.delivers_packed(candidate) {
            let scratch = tempfile::Builder::new()
                .prefix("jarsign-verify")
                .tempdir()
                .map_err(|e| JarsignError::io("creating verification directory", e))?;
            let unpacked = scratch.path().join(candidate.file_name());
            self.packer.decompress(&artifact, &unpacked).await?;
            self.signer.verify(&unpacked, &self.identity, true).await?;
            scratch
                .close()
                .map_err(|e| JarsignError::io("removing verification directory", e))?;

            // Only the packed sibling is delivered
            remove_if_exists(&candidate.archive_path).await.map_err(|e| {
                JarsignError::io(format!("removing {}", candidate.archive_path.display()), e)
            })?;
        } else {
            self.signer.verify(&artifact, &self.identity, true).await?;
        }
        debug!("Verified {}", artifact.display());

        self.counters.verified.fetch_add(1, Ordering::Relaxed);
        match candidate.classification {
            Classification::New => {
                self.counters.signed.fetch_add(1, Ordering::Relaxed);
            }
            Classification::Cached => {
                self.counters.cached.fetch_add(1, Ordering::Relaxed);
            }
            Classification::Signed => {
                self.counters.already_signed.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// File the candidate's deliverable lives in after this run
    fn artifact_path(&self, candidate: &Candidate) -> PathBuf {
        if self.delivers_packed(candidate) {
            self.packer.packed_path(&candidate.archive_path)
        } else {
            candidate.archive_path.clone()
        }
    }

    /// With compression on, NEW and CACHED archives are delivered as the packed
    /// sibling and the plain archive is removed. A SIGNED archive is its own
    /// deliverable and is verified in place.
    fn delivers_packed(&self, candidate: &Candidate) -> bool {
        match candidate.classification {
            Classification::New | Classification::Cached => self.options.compress,
            Classification::Signed => false,
        }
    }
}

fn record(result: Result<JarsignResult<()>, JoinError>, first_error: &mut Option<JarsignError>) {
    let error = match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(e) => JarsignError::Internal(format!("verification task failed: {}", e)),
    };
    if first_error.is_none() {
        *first_error = Some(error);
    } else {
        debug!("Additional verification failure: {}", error);
    }
}
