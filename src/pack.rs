//! Canonicalization and compression of archives
//!
//! Wraps an [`ArchiveCodec`] with the three operations the pipelines need.
//! Every result is produced in a temporary location and moved into place.

use crate::error::{JarsignError, JarsignResult};
use crate::tools::ArchiveCodec;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;
use tracing::debug;

/// Pack-based archive transformations
#[derive(Clone)]
pub struct PackAdapter {
    codec: Arc<dyn ArchiveCodec>,
}

impl PackAdapter {
    /// Create an adapter around a codec
    pub fn new(codec: Arc<dyn ArchiveCodec>) -> Self {
        Self { codec }
    }

    /// Suffix of packed archives
    pub fn packed_extension(&self) -> &'static str {
        self.codec.packed_extension()
    }

    /// Packed sibling of an archive: `<archive><packed_extension>`
    pub fn packed_path(&self, archive: &Path) -> PathBuf {
        let mut name = OsString::from(archive.as_os_str());
        name.push(self.packed_extension());
        PathBuf::from(name)
    }

    /// Pack and immediately unpack an archive over itself
    ///
    /// Normalizes the byte layout so checksums taken afterwards do not depend
    /// on how the build happened to write the archive.
    pub async fn canonicalize(&self, archive: &Path) -> JarsignResult<()> {
        debug!("Repacking {}", archive.display());
        let scratch = scratch_dir(archive)?;
        let file_name = archive_file_name(archive)?;
        let packed = self.packed_path(&scratch.path().join(file_name));
        let unpacked = scratch.path().join(file_name);

        self.codec.pack(archive, &packed).await?;
        self.codec.unpack(&packed, &unpacked).await?;
        fs::rename(&unpacked, archive)
            .await
            .map_err(|e| JarsignError::io(format!("replacing {}", archive.display()), e))?;
        Ok(())
    }

    /// Pack an archive into its packed sibling and return the sibling's path
    pub async fn compress(&self, archive: &Path) -> JarsignResult<PathBuf> {
        let target = self.packed_path(archive);
        debug!("Packing {} to {}", archive.display(), target.display());
        let scratch = scratch_dir(archive)?;
        let staging = scratch.path().join(
            target
                .file_name()
                .ok_or_else(|| JarsignError::Internal("packed path has no file name".into()))?,
        );

        self.codec.pack(archive, &staging).await?;
        fs::rename(&staging, &target)
            .await
            .map_err(|e| JarsignError::io(format!("replacing {}", target.display()), e))?;
        Ok(target)
    }

    /// Unpack a packed archive to `target`
    pub async fn decompress(&self, packed: &Path, target: &Path) -> JarsignResult<()> {
        debug!("Unpacking {} to {}", packed.display(), target.display());
        self.codec.unpack(packed, target).await
    }
}

/// Temporary directory next to the archive, so renames stay on one filesystem
fn scratch_dir(archive: &Path) -> JarsignResult<TempDir> {
    let parent = archive
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tempfile::Builder::new()
        .prefix(".jarsign-pack")
        .tempdir_in(parent)
        .map_err(|e| JarsignError::io(format!("creating scratch directory in {}", parent.display()), e))
}

fn archive_file_name(archive: &Path) -> JarsignResult<&std::ffi::OsStr> {
    archive.file_name().ok_or_else(|| {
        JarsignError::Internal(format!("archive path {} has no file name", archive.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeCodec;

    fn adapter() -> PackAdapter {
        PackAdapter::new(Arc::new(FakeCodec::default()))
    }

    #[test]
    fn packed_path_is_sibling() {
        assert_eq!(
            adapter().packed_path(Path::new("/libs/a.jar")),
            PathBuf::from("/libs/a.jar.pack.gz")
        );
    }

    #[tokio::test]
    async fn compress_then_decompress() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("a.jar");
        std::fs::write(&archive, b"jar bytes").unwrap();
        let adapter = adapter();

        let packed = adapter.compress(&archive).await.unwrap();
        assert_eq!(packed, dir.path().join("a.jar.pack.gz"));
        assert_ne!(std::fs::read(&packed).unwrap(), b"jar bytes");

        let restored = dir.path().join("restored.jar");
        adapter.decompress(&packed, &restored).await.unwrap();
        assert_eq!(std::fs::read(&restored).unwrap(), b"jar bytes");
    }

    #[tokio::test]
    async fn canonicalize_replaces_in_place_without_leftovers() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("a.jar");
        std::fs::write(&archive, b"jar bytes").unwrap();

        adapter().canonicalize(&archive).await.unwrap();

        assert_eq!(std::fs::read(&archive).unwrap(), b"jar bytes");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
