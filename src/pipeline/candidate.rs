//! Candidate classification
//!
//! Classification only reads: it digests the archive and compares against
//! the namespace's sidecars. NEW is the fallback whenever anything is
//! missing or differs.

use crate::cache::{CacheNamespace, ChecksumStore, PackMode, TaggedChecksum};
use crate::error::{JarsignError, JarsignResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What has to happen to an archive in this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Must be signed
    New,
    /// A signed copy for exactly this content is cached
    Cached,
    /// The archive already equals a previously produced signed output
    ///
    /// Trusted by checksum equality alone; the signature is not checked
    /// cryptographically at classification time.
    Signed,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Cached => write!(f, "CACHED"),
            Self::Signed => write!(f, "SIGNED"),
        }
    }
}

/// An archive queued for processing, with its cache locations
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The archive in the build output
    pub archive_path: PathBuf,
    /// Signed copy in the cache namespace
    pub cached_copy_path: PathBuf,
    /// Base path of the raw checksum sidecar
    pub raw_checksum_path: PathBuf,
    /// Base path of the signed checksum sidecar
    pub signed_checksum_path: PathBuf,
    /// Result of classification
    pub classification: Classification,
    /// Checksum computed during classification, if any
    pub(crate) current_checksum: Option<TaggedChecksum>,
}

impl Candidate {
    /// File name of the archive, used as the cache key
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.archive_path
            .file_name()
            .unwrap_or(self.archive_path.as_os_str())
    }
}

/// Classifies archives against one cache namespace
pub struct CandidateClassifier<'a> {
    namespace: &'a CacheNamespace,
    store: &'a ChecksumStore,
    mode: PackMode,
    packed_extension: Option<&'static str>,
}

impl<'a> CandidateClassifier<'a> {
    /// Create a classifier
    ///
    /// `packed_extension` is set when signed archives are cached in packed form.
    pub fn new(
        namespace: &'a CacheNamespace,
        store: &'a ChecksumStore,
        mode: PackMode,
        packed_extension: Option<&'static str>,
    ) -> Self {
        Self {
            namespace,
            store,
            mode,
            packed_extension,
        }
    }

    /// Classify one archive
    pub fn classify(&self, archive_path: &Path, force_sign: bool) -> JarsignResult<Candidate> {
        let name = archive_path.file_name().ok_or_else(|| {
            JarsignError::Internal(format!("archive path {} has no file name", archive_path.display()))
        })?;

        let mut candidate = Candidate {
            archive_path: archive_path.to_path_buf(),
            cached_copy_path: self.namespace.cached_copy_path(name, self.packed_extension),
            raw_checksum_path: self.namespace.raw_checksum_base(name),
            signed_checksum_path: self.namespace.signed_checksum_base(name),
            classification: Classification::New,
            current_checksum: None,
        };

        if force_sign || !candidate.cached_copy_path.is_file() {
            debug!("{} classified NEW (forced or not cached)", archive_path.display());
            return Ok(candidate);
        }

        let current = self.store.digest(archive_path, self.mode)?;
        candidate.classification = if self.store.sidecar_matches(&candidate.raw_checksum_path, &current) {
            Classification::Cached
        } else if self.store.sidecar_matches(&candidate.signed_checksum_path, &current) {
            Classification::Signed
        } else {
            Classification::New
        };
        candidate.current_checksum = Some(current);

        debug!(
            "{} classified {}",
            archive_path.display(),
            candidate.classification
        );
        Ok(candidate)
    }
}
