//! Cache namespace layout
//!
//! ```text
//! <cache_root>/<id>/<archive>[.pack.gz]          signed copy
//! <cache_root>/<id>/<archive>.<alg>              raw checksum
//! <cache_root>/<id>/<archive>.signed.<alg>       signed checksum
//! <cache_root>/<id>/_identity_fingerprint.<alg>  signing identity fingerprint
//! ```
//!
//! A changed signing identity empties the whole namespace.

use crate::cache::lock::{namespace_lock, NamespaceLock};
use crate::error::{JarsignError, JarsignResult};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Name of the cache directory next to the artifact repository
pub const CACHE_DIR_NAME: &str = "jarsign-cache";

/// File stem of the persisted identity fingerprint
pub const IDENTITY_FINGERPRINT_STEM: &str = "_identity_fingerprint";

/// Suffix appended to signed checksum base paths
const SIGNED_SUFFIX: &str = ".signed";

/// Cache root for an artifact repository: a `jarsign-cache` sibling directory
pub fn cache_root_for(repository: &Path) -> PathBuf {
    repository
        .parent()
        .unwrap_or(repository)
        .join(CACHE_DIR_NAME)
}

/// One named partition of the shared signing cache
#[derive(Debug, Clone)]
pub struct CacheNamespace {
    id: String,
    dir: PathBuf,
}

impl CacheNamespace {
    /// Open a namespace, creating its directory if needed
    pub async fn open(cache_root: &Path, id: &str) -> JarsignResult<Self> {
        let dir = cache_root.join(id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| JarsignError::cache_io(&dir, e))?;
        debug!("Using cache namespace {} at {}", id, dir.display());

        Ok(Self {
            id: id.to_string(),
            dir,
        })
    }

    /// Namespace id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Namespace directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lock serializing writers (and cached-copy readers) of this namespace
    pub fn lock(&self) -> NamespaceLock {
        namespace_lock(&self.id)
    }

    /// Location of the cached signed artifact for an archive file name
    pub fn cached_copy_path(&self, archive_name: &OsStr, packed_extension: Option<&str>) -> PathBuf {
        match packed_extension {
            Some(ext) => self.dir.join(with_suffix(archive_name, ext)),
            None => self.dir.join(archive_name),
        }
    }

    /// Base path of the raw (pre-signing) checksum sidecar
    pub fn raw_checksum_base(&self, archive_name: &OsStr) -> PathBuf {
        self.dir.join(archive_name)
    }

    /// Base path of the signed checksum sidecar
    pub fn signed_checksum_base(&self, archive_name: &OsStr) -> PathBuf {
        self.dir.join(with_suffix(archive_name, SIGNED_SUFFIX))
    }

    /// Base path of the identity fingerprint sidecar
    pub fn identity_fingerprint_base(&self) -> PathBuf {
        self.dir.join(IDENTITY_FINGERPRINT_STEM)
    }

    /// Remove every cached copy and sidecar, including the fingerprint
    ///
    /// Callers hold the namespace lock. Returns the number of entries removed.
    pub async fn invalidate(&self) -> JarsignResult<usize> {
        let cache_io = |e| JarsignError::cache_io(&self.dir, e);
        let mut entries = fs::read_dir(&self.dir).await.map_err(cache_io)?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await.map_err(cache_io)? {
            let path = entry.path();
            let result = match entry.file_type().await {
                Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path).await,
                Ok(_) => remove_if_exists(&path).await,
                Err(e) => Err(e),
            };
            result.map_err(|e| JarsignError::cache_io(&path, e))?;
            removed += 1;
        }

        debug!("Removed {} entries from cache namespace {}", removed, self.id);
        Ok(removed)
    }
}

fn with_suffix(name: &OsStr, suffix: &str) -> OsString {
    let mut name = name.to_os_string();
    name.push(suffix);
    name
}

/// Delete a file, treating a missing file as success
pub async fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Copy `src` over `dst` without exposing a half-written `dst`
///
/// The copy lands in a hidden sibling first and is renamed into place.
pub async fn copy_replace(src: &Path, dst: &Path) -> io::Result<()> {
    let file_name = dst
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"))?;
    let mut staging_name = OsString::from(".");
    staging_name.push(file_name);
    staging_name.push(".partial");
    let staging = dst.with_file_name(staging_name);

    fs::copy(src, &staging).await?;
    if let Err(e) = fs::rename(&staging, dst).await {
        let _ = fs::remove_file(&staging).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cache_root_is_repository_sibling() {
        assert_eq!(
            cache_root_for(Path::new("/home/dev/.m2/repository")),
            PathBuf::from("/home/dev/.m2/jarsign-cache")
        );
    }

    #[tokio::test]
    async fn open_creates_directory_idempotently() {
        let temp = TempDir::new().unwrap();
        let first = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let second = CacheNamespace::open(temp.path(), "rel").await.unwrap();

        assert!(first.dir().is_dir());
        assert_eq!(first.dir(), second.dir());
        assert_eq!(first.id(), "rel");
    }

    #[tokio::test]
    async fn layout_paths() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let name = OsStr::new("A.jar");

        assert_eq!(ns.cached_copy_path(name, None), ns.dir().join("A.jar"));
        assert_eq!(
            ns.cached_copy_path(name, Some(".pack.gz")),
            ns.dir().join("A.jar.pack.gz")
        );
        assert_eq!(ns.raw_checksum_base(name), ns.dir().join("A.jar"));
        assert_eq!(ns.signed_checksum_base(name), ns.dir().join("A.jar.signed"));
        assert_eq!(
            ns.identity_fingerprint_base(),
            ns.dir().join("_identity_fingerprint")
        );
    }

    #[tokio::test]
    async fn copy_replace_overwrites_and_leaves_no_staging() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.jar");
        let dst = temp.path().join("dst.jar");
        std::fs::write(&src, b"new").unwrap();
        std::fs::write(&dst, b"old").unwrap();

        copy_replace(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), b"new");
        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn invalidate_empties_namespace() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let other = CacheNamespace::open(temp.path(), "other").await.unwrap();
        for name in ["A.jar", "A.jar.sha256", "A.jar.signed.sha256", "_identity_fingerprint.sha256"] {
            std::fs::write(ns.dir().join(name), b"x").unwrap();
        }
        std::fs::create_dir(ns.dir().join(".jarsign-pack1")).unwrap();
        std::fs::write(other.dir().join("B.jar"), b"x").unwrap();

        assert_eq!(ns.invalidate().await.unwrap(), 5);
        assert!(ns.dir().is_dir());
        assert_eq!(std::fs::read_dir(ns.dir()).unwrap().count(), 0);
        assert!(other.dir().join("B.jar").is_file());
        assert_eq!(ns.invalidate().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_if_exists_ignores_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.jar");
        remove_if_exists(&path).await.unwrap();

        std::fs::write(&path, b"x").unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }
}
