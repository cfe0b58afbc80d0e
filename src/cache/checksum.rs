//! Tagged content checksums and their sidecar files
//!
//! A checksum is always tagged with the pack mode it was computed under.
//! Repacking rewrites archive bytes deterministically, so a digest taken with
//! repack enabled is never comparable to one taken without it.

use crate::error::{JarsignError, JarsignResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Change-detection hash with hex output
///
/// Any hash works here; the digest only has to detect content changes.
pub trait Digester: Send + Sync {
    /// Lowercase algorithm name, also used as the sidecar file extension
    fn name(&self) -> &str;

    /// Hash everything the reader yields and return lowercase hex
    fn digest(&self, reader: &mut dyn Read) -> io::Result<String>;
}

/// Digester backed by a RustCrypto hash
struct RustCryptoDigester<D> {
    name: &'static str,
    _hash: PhantomData<fn() -> D>,
}

impl<D> RustCryptoDigester<D> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            _hash: PhantomData,
        }
    }
}

impl<D: Digest> Digester for RustCryptoDigester<D> {
    fn name(&self) -> &str {
        self.name
    }

    fn digest(&self, reader: &mut dyn Read) -> io::Result<String> {
        let mut hasher = D::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Built-in checksum algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Algorithm name as used in sidecar file names
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Create the digester for this algorithm
    pub fn digester(&self) -> Arc<dyn Digester> {
        match self {
            Self::Sha256 => Arc::new(RustCryptoDigester::<Sha256>::new(self.name())),
            Self::Sha512 => Arc::new(RustCryptoDigester::<Sha512>::new(self.name())),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether archives are canonicalized before signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackMode {
    Repack,
    NoRepack,
}

impl PackMode {
    /// Mode for the given repack setting
    pub fn from_repack(repack: bool) -> Self {
        if repack {
            Self::Repack
        } else {
            Self::NoRepack
        }
    }

    /// Tag written in front of the digest in sidecar files
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Repack => "REPACK",
            Self::NoRepack => "NO_REPACK",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "REPACK" => Some(Self::Repack),
            "NO_REPACK" => Some(Self::NoRepack),
            _ => None,
        }
    }
}

/// Digest of a file, tagged with the mode and algorithm it was computed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedChecksum {
    pub mode: PackMode,
    pub digest: String,
    pub algorithm: String,
}

impl TaggedChecksum {
    /// Parse sidecar content (`MODE:hexdigest`) written with `algorithm`
    pub fn parse(content: &str, algorithm: &str) -> Option<Self> {
        let (tag, digest) = content.trim().split_once(':')?;
        let mode = PackMode::from_tag(tag)?;
        if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            mode,
            digest: digest.to_ascii_lowercase(),
            algorithm: algorithm.to_string(),
        })
    }
}

impl fmt::Display for TaggedChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mode.as_tag(), self.digest)
    }
}

/// Computes checksums and reads/writes checksum sidecars
#[derive(Clone)]
pub struct ChecksumStore {
    digester: Arc<dyn Digester>,
}

impl ChecksumStore {
    /// Create a store using one of the built-in algorithms
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self::with_digester(algorithm.digester())
    }

    /// Create a store using a custom digester
    pub fn with_digester(digester: Arc<dyn Digester>) -> Self {
        Self { digester }
    }

    /// Name of the configured algorithm
    pub fn algorithm(&self) -> &str {
        self.digester.name()
    }

    /// Digest raw bytes (used for fingerprints)
    pub fn digest_bytes(&self, mut bytes: &[u8]) -> String {
        // Reading from a slice cannot fail
        self.digester.digest(&mut bytes).unwrap_or_default()
    }

    /// Compute the tagged checksum of a file
    pub fn digest(&self, path: &Path, mode: PackMode) -> JarsignResult<TaggedChecksum> {
        debug!("Calculating {} checksum for {}", self.algorithm(), path.display());

        let classification_error = |source| JarsignError::Classification {
            path: path.to_path_buf(),
            algorithm: self.algorithm().to_string(),
            source,
        };

        let mut file = File::open(path).map_err(classification_error)?;
        let digest = self
            .digester
            .digest(&mut file)
            .map_err(classification_error)?;

        Ok(TaggedChecksum {
            mode,
            digest,
            algorithm: self.algorithm().to_string(),
        })
    }

    /// Sidecar file for a base path: `<base>.<algorithm>`
    pub fn sidecar_path(&self, base: &Path) -> PathBuf {
        let mut name = OsString::from(base.as_os_str());
        name.push(".");
        name.push(self.algorithm().to_ascii_lowercase());
        PathBuf::from(name)
    }

    /// Read a sidecar, returning `None` if it is missing or unreadable
    pub fn read_sidecar(&self, base: &Path) -> Option<TaggedChecksum> {
        let path = self.sidecar_path(base);
        let content = fs::read_to_string(&path).ok()?;
        let checksum = TaggedChecksum::parse(&content, self.algorithm());
        if checksum.is_none() {
            warn!("Ignoring unparsable checksum file {}", path.display());
        }
        checksum
    }

    /// Compute the tagged checksum of a file on the blocking thread pool
    pub async fn digest_blocking(&self, path: &Path, mode: PackMode) -> JarsignResult<TaggedChecksum> {
        let store = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || store.digest(&path, mode))
            .await
            .map_err(|e| JarsignError::Internal(format!("checksum task failed: {}", e)))?
    }

    /// Write a sidecar, replacing any previous one as a whole
    pub fn write_sidecar(&self, base: &Path, checksum: &TaggedChecksum) -> JarsignResult<()> {
        self.write_plain_sidecar(base, &checksum.to_string())
    }

    /// Write untagged sidecar content (the identity fingerprint)
    pub fn write_plain_sidecar(&self, base: &Path, content: &str) -> JarsignResult<()> {
        let path = self.sidecar_path(base);
        debug!("Installing checksum to {}", path.display());

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| JarsignError::cache_io(parent, e))?;

        let mut staging =
            NamedTempFile::new_in(parent).map_err(|e| JarsignError::cache_io(&path, e))?;
        staging
            .write_all(content.as_bytes())
            .map_err(|e| JarsignError::cache_io(&path, e))?;
        staging
            .persist(&path)
            .map_err(|e| JarsignError::cache_io(&path, e.error))?;
        Ok(())
    }

    /// Whether the sidecar at `base` holds exactly `current`
    pub fn sidecar_matches(&self, base: &Path, current: &TaggedChecksum) -> bool {
        self.read_sidecar(base).as_ref() == Some(current)
    }
}

impl fmt::Debug for ChecksumStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecksumStore")
            .field("algorithm", &self.algorithm())
            .finish()
    }
}
