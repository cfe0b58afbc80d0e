//! Phase 1: signing of NEW candidates
//!
//! Runs with the namespace lock held for the whole batch. A failure stops
//! the run; whatever was written for earlier candidates stays valid and is
//! picked up by the next run's classification.

use super::candidate::{Candidate, Classification};
use super::RunOptions;
use crate::archive;
use crate::cache::{copy_replace, remove_if_exists, CacheNamespace, ChecksumStore};
use crate::error::{JarsignError, JarsignResult};
use crate::identity::SigningIdentity;
use crate::pack::PackAdapter;
use crate::tools::SigningTool;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Signs NEW candidates and records them in the cache namespace
#[derive(Clone)]
pub struct SigningPipeline {
    namespace: CacheNamespace,
    store: ChecksumStore,
    signer: Arc<dyn SigningTool>,
    packer: PackAdapter,
    identity: SigningIdentity,
    options: Arc<RunOptions>,
}

impl SigningPipeline {
    pub fn new(
        namespace: CacheNamespace,
        store: ChecksumStore,
        signer: Arc<dyn SigningTool>,
        packer: PackAdapter,
        identity: SigningIdentity,
        options: Arc<RunOptions>,
    ) -> Self {
        Self {
            namespace,
            store,
            signer,
            packer,
            identity,
            options,
        }
    }

    /// Sign every NEW candidate in order
    ///
    /// `_held` is the guard of this namespace's lock; the caller keeps it for
    /// the whole batch. Cancellation is checked before each candidate.
    /// Returns the number of archives signed.
    pub async fn sign_all(
        &self,
        candidates: &[Candidate],
        _held: &MutexGuard<'_, ()>,
        cancel: &CancellationToken,
    ) -> JarsignResult<usize> {
        let mut signed = 0;
        for candidate in candidates {
            match candidate.classification {
                Classification::New => {
                    if cancel.is_cancelled() {
                        return Err(JarsignError::Interrupted);
                    }
                    self.sign_candidate(candidate).await?;
                    signed += 1;
                }
                Classification::Cached | Classification::Signed => {}
            }
        }
        Ok(signed)
    }

    /// Run the signing steps for one candidate
    pub async fn sign_candidate(&self, candidate: &Candidate) -> JarsignResult<()> {
        let archive_path = &candidate.archive_path;
        let mode = self.options.mode();

        // Record the input before touching it. A stale cached copy goes first,
        // so an interrupted run can never pair it with the new raw checksum.
        let raw = match &candidate.current_checksum {
            Some(checksum) if checksum.mode == mode => checksum.clone(),
            _ => self.store.digest_blocking(archive_path, mode).await?,
        };
        remove_if_exists(&candidate.cached_copy_path)
            .await
            .map_err(|e| JarsignError::cache_io(&candidate.cached_copy_path, e))?;
        self.store.write_sidecar(&candidate.raw_checksum_path, &raw)?;

        self.signer.unsign(archive_path).await?;
        self.merge_manifest(archive_path).await?;

        if self.options.repack {
            self.packer.canonicalize(archive_path).await?;
        }

        self.signer.sign(archive_path, &self.identity).await?;

        let artifact = if self.options.compress {
            self.packer.compress(archive_path).await?
        } else {
            archive_path.clone()
        };

        copy_replace(&artifact, &candidate.cached_copy_path)
            .await
            .map_err(|e| JarsignError::cache_io(&candidate.cached_copy_path, e))?;
        debug!(
            "Installed {} in cache namespace {}",
            candidate.cached_copy_path.display(),
            self.namespace.id()
        );

        let signed = self.store.digest_blocking(&artifact, mode).await?;
        self.store
            .write_sidecar(&candidate.signed_checksum_path, &signed)?;

        info!("Signed {}", archive_path.display());
        Ok(())
    }

    /// Rewrite the manifest on the blocking pool; archives can be large
    async fn merge_manifest(&self, archive_path: &Path) -> JarsignResult<()> {
        if self.options.manifest_entries.is_empty() {
            return Ok(());
        }
        let path = archive_path.to_path_buf();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || archive::merge_manifest(&path, &options.manifest_entries))
            .await
            .map_err(|e| JarsignError::Internal(format!("manifest task failed: {}", e)))?
    }
}
