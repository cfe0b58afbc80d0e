//! Two-phase signing run
//!
//! Phase 1 runs under the namespace lock: the identity check, classification
//! of every candidate and signing of the NEW ones. Phase 2 verifies every
//! candidate on a worker pool, restoring CACHED ones from the cache first.
//!
//! | classification | phase 1            | phase 2                    |
//! |----------------|--------------------|----------------------------|
//! | NEW            | sign, cache        | verify                     |
//! | CACHED         | -                  | restore from cache, verify |
//! | SIGNED         | -                  | verify                     |

mod candidate;
mod sign;
mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use candidate::{Candidate, CandidateClassifier, Classification};
pub use sign::SigningPipeline;
pub use verify::VerificationPipeline;

use crate::cache::{CacheNamespace, ChecksumStore, PackMode};
use crate::config::Config;
use crate::error::{JarsignError, JarsignResult};
use crate::identity::{self, SigningIdentity};
use crate::pack::PackAdapter;
use crate::tools::{JarSigner, Pack200Codec, SigningTool};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Settings of one signing run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Treat every candidate as NEW
    pub force_sign: bool,
    /// Canonicalize archives before signing
    pub repack: bool,
    /// Deliver and cache signed archives in packed form
    pub compress: bool,
    /// Main manifest attributes merged into every signed archive
    pub manifest_entries: BTreeMap<String, String>,
    /// Verification workers
    pub workers: usize,
}

impl RunOptions {
    /// Checksum mode implied by the repack setting
    pub fn mode(&self) -> PackMode {
        PackMode::from_repack(self.repack)
    }
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            force_sign: config.force_sign,
            repack: config.repack,
            compress: config.pack200,
            manifest_entries: config.manifest.clone(),
            workers: config.worker_count(),
        }
    }
}

/// Counters shared by verification workers
#[derive(Debug, Default)]
pub struct RunCounters {
    pub signed: AtomicUsize,
    pub verified: AtomicUsize,
    pub cached: AtomicUsize,
    pub already_signed: AtomicUsize,
}

impl RunCounters {
    fn report(&self, total: usize) -> RunReport {
        RunReport {
            total,
            signed: self.signed.load(Ordering::Relaxed),
            verified: self.verified.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            already_signed: self.already_signed.load(Ordering::Relaxed),
        }
    }
}

/// Totals of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Candidates discovered
    pub total: usize,
    /// Candidates signed in this run
    pub signed: usize,
    /// Candidates whose signature was verified
    pub verified: usize,
    /// Candidates restored from the cache
    pub cached: usize,
    /// Candidates that were already signed outputs
    pub already_signed: usize,
}

/// Counters of a run together with the error that ended it, if any
///
/// A failed run still reports what it got done before failing.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub error: Option<JarsignError>,
}

impl RunOutcome {
    /// The report of a successful run, or the run's first error
    pub fn into_result(self) -> JarsignResult<RunReport> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }
}

/// Drives classification, signing and verification for one cache namespace
pub struct Orchestrator {
    namespace: CacheNamespace,
    store: ChecksumStore,
    signer: Arc<dyn SigningTool>,
    packer: PackAdapter,
    identity: SigningIdentity,
    options: Arc<RunOptions>,
}

impl Orchestrator {
    pub fn new(
        namespace: CacheNamespace,
        store: ChecksumStore,
        signer: Arc<dyn SigningTool>,
        packer: PackAdapter,
        identity: SigningIdentity,
        options: RunOptions,
    ) -> Self {
        Self {
            namespace,
            store,
            signer,
            packer,
            identity,
            options: Arc::new(options),
        }
    }

    /// Build an orchestrator using the JDK tools named in the configuration
    pub async fn from_config(config: &Config) -> JarsignResult<Self> {
        let namespace = CacheNamespace::open(&config.cache_root(), config.cache_id()?).await?;
        let codec = Pack200Codec::new(&config.tools.pack200, &config.tools.unpack200);

        Ok(Self::new(
            namespace,
            ChecksumStore::new(config.checksum_algorithm),
            Arc::new(JarSigner::new(&config.tools.jarsigner)),
            PackAdapter::new(Arc::new(codec)),
            SigningIdentity::from(&config.identity),
            RunOptions::from(config),
        ))
    }

    /// Cache namespace this orchestrator works on
    pub fn namespace(&self) -> &CacheNamespace {
        &self.namespace
    }

    /// Run both phases over the given archives
    ///
    /// The first error wins; use [`Orchestrator::execute`] to keep the
    /// counters of a failed run.
    pub async fn run(
        &self,
        archives: Vec<PathBuf>,
        cancel: &CancellationToken,
    ) -> JarsignResult<RunReport> {
        self.execute(archives, cancel).await.into_result()
    }

    /// Run both phases and report counters whether or not the run failed
    pub async fn execute(&self, archives: Vec<PathBuf>, cancel: &CancellationToken) -> RunOutcome {
        let total = archives.len();
        info!(
            "Processing {} archive(s) in cache namespace {}",
            total,
            self.namespace.id()
        );

        let counters = Arc::new(RunCounters::default());
        let result = self.run_phases(archives, &counters, cancel).await;
        let report = counters.report(total);
        info!(
            "{} archive(s) signed, {} verified, {} restored from cache, {} already signed",
            report.signed, report.verified, report.cached, report.already_signed
        );

        RunOutcome {
            report,
            error: result.err(),
        }
    }

    async fn run_phases(
        &self,
        archives: Vec<PathBuf>,
        counters: &Arc<RunCounters>,
        cancel: &CancellationToken,
    ) -> JarsignResult<()> {
        let candidates = {
            let lock = self.namespace.lock();
            let guard = lock.lock().await;

            let identity_changed =
                identity::check_and_refresh(&self.namespace, &self.identity, &self.store).await?;
            let force = self.options.force_sign || identity_changed;
            let candidates = self.classify_all(&archives, force, cancel)?;

            let signing = SigningPipeline::new(
                self.namespace.clone(),
                self.store.clone(),
                self.signer.clone(),
                self.packer.clone(),
                self.identity.clone(),
                self.options.clone(),
            );
            signing.sign_all(&candidates, &guard, cancel).await?;
            candidates
        };

        let verification = VerificationPipeline::new(
            self.namespace.clone(),
            self.signer.clone(),
            self.packer.clone(),
            self.identity.clone(),
            self.options.clone(),
            counters.clone(),
        );
        verification
            .run(candidates, self.options.workers, cancel)
            .await
    }

    /// Classify archives without changing anything on disk
    pub async fn classify_only(&self, archives: &[PathBuf]) -> JarsignResult<Vec<Candidate>> {
        let lock = self.namespace.lock();
        let _guard = lock.lock().await;

        let force = self.options.force_sign
            || !identity::is_current(&self.namespace, &self.identity, &self.store);
        self.classify_all(archives, force, &CancellationToken::new())
    }

    fn classify_all(
        &self,
        archives: &[PathBuf],
        force: bool,
        cancel: &CancellationToken,
    ) -> JarsignResult<Vec<Candidate>> {
        let packed_extension = self
            .options
            .compress
            .then(|| self.packer.packed_extension());
        let classifier = CandidateClassifier::new(
            &self.namespace,
            &self.store,
            self.options.mode(),
            packed_extension,
        );

        archives
            .iter()
            .map(|archive| {
                if cancel.is_cancelled() {
                    return Err(JarsignError::Interrupted);
                }
                classifier.classify(archive, force)
            })
            .collect()
    }
}
