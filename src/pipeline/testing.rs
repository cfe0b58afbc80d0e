//! In-process fakes for the external tools

use crate::archive;
use crate::error::{JarsignError, JarsignResult};
use crate::identity::SigningIdentity;
use crate::tools::{ArchiveCodec, SigningTool, PACKED_EXTENSION};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Entry the fake signer adds to mark an archive as signed
pub(crate) const FAKE_SIGNATURE: &str = "META-INF/FAKE.SF";

/// Signer that appends a marker entry instead of running `jarsigner`
#[derive(Default)]
pub(crate) struct FakeSigner {
    signed: Mutex<Vec<PathBuf>>,
    verified: Mutex<Vec<PathBuf>>,
    fail_sign_on: Option<String>,
    fail_verify_on: Option<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSigner {
    /// Fail when signing the archive with this file name
    pub(crate) fn failing_sign(name: &str) -> Self {
        Self {
            fail_sign_on: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Fail when verifying the archive with this file name
    pub(crate) fn failing_verify(name: &str) -> Self {
        Self {
            fail_verify_on: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn signed(&self) -> Vec<PathBuf> {
        self.signed.lock().clone()
    }

    pub(crate) fn verified(&self) -> Vec<PathBuf> {
        self.verified.lock().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn failure(&self, archive_path: &Path, reason: &str) -> JarsignError {
        JarsignError::ToolFailed {
            tool: self.tool_name().to_string(),
            archive: archive_path.to_path_buf(),
            code: 1,
            output: reason.to_string(),
        }
    }
}

fn is_named(path: &Path, name: &Option<String>) -> bool {
    match name {
        Some(name) => path.file_name().is_some_and(|f| f == name.as_str()),
        None => false,
    }
}

#[async_trait]
impl SigningTool for FakeSigner {
    async fn sign(&self, archive_path: &Path, identity: &SigningIdentity) -> JarsignResult<()> {
        if is_named(archive_path, &self.fail_sign_on) {
            return Err(self.failure(archive_path, "keystore was tampered with"));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(archive_path)
            .map_err(|e| JarsignError::archive(archive_path, e))?;
        let mut writer = ZipWriter::new_append(file).map_err(|e| JarsignError::archive(archive_path, e))?;
        writer
            .start_file(FAKE_SIGNATURE, SimpleFileOptions::default())
            .map_err(|e| JarsignError::archive(archive_path, e))?;
        writer
            .write_all(identity.alias.as_deref().unwrap_or("").as_bytes())
            .map_err(|e| JarsignError::archive(archive_path, e))?;
        writer
            .finish()
            .map_err(|e| JarsignError::archive(archive_path, e))?;

        self.signed.lock().push(archive_path.to_path_buf());
        Ok(())
    }

    async fn verify(
        &self,
        archive_path: &Path,
        _identity: &SigningIdentity,
        strict: bool,
    ) -> JarsignResult<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if !strict {
            return Err(self.failure(archive_path, "expected strict verification"));
        }
        if is_named(archive_path, &self.fail_verify_on) {
            return Err(self.failure(archive_path, "jar is unsigned"));
        }
        if archive::read_entry(archive_path, FAKE_SIGNATURE)?.is_none() {
            return Err(self.failure(archive_path, "jar is unsigned"));
        }

        self.verified.lock().push(archive_path.to_path_buf());
        Ok(())
    }

    fn tool_name(&self) -> &'static str {
        "fake-signer"
    }
}

/// Codec whose packed form is the archive bytes behind a marker prefix
#[derive(Default)]
pub(crate) struct FakeCodec;

const PACK_MAGIC: &[u8] = b"PACK";

#[async_trait]
impl ArchiveCodec for FakeCodec {
    async fn pack(&self, source: &Path, target: &Path) -> JarsignResult<()> {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| JarsignError::io(format!("reading {}", source.display()), e))?;
        let mut packed = PACK_MAGIC.to_vec();
        packed.extend_from_slice(&bytes);
        tokio::fs::write(target, packed)
            .await
            .map_err(|e| JarsignError::io(format!("writing {}", target.display()), e))
    }

    async fn unpack(&self, packed: &Path, target: &Path) -> JarsignResult<()> {
        let bytes = tokio::fs::read(packed)
            .await
            .map_err(|e| JarsignError::io(format!("reading {}", packed.display()), e))?;
        let Some(inner) = bytes.strip_prefix(PACK_MAGIC) else {
            return Err(JarsignError::ToolFailed {
                tool: "fake-unpack".to_string(),
                archive: packed.to_path_buf(),
                code: 1,
                output: "not a packed archive".to_string(),
            });
        };
        tokio::fs::write(target, inner)
            .await
            .map_err(|e| JarsignError::io(format!("writing {}", target.display()), e))
    }

    fn packed_extension(&self) -> &'static str {
        PACKED_EXTENSION
    }
}
