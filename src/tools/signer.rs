//! Signing tool abstraction

use crate::archive;
use crate::error::JarsignResult;
use crate::identity::SigningIdentity;
use async_trait::async_trait;
use std::path::Path;

/// Signs, unsigns and verifies archives
///
/// Implementations report launch problems and non-zero exits as tool
/// failures; callers abort the run on any error.
#[async_trait]
pub trait SigningTool: Send + Sync {
    /// Remove any existing signature from the archive in place
    async fn unsign(&self, archive_path: &Path) -> JarsignResult<()> {
        archive::strip_signatures(archive_path)
    }

    /// Sign the archive in place with the given identity
    async fn sign(&self, archive_path: &Path, identity: &SigningIdentity) -> JarsignResult<()>;

    /// Verify the archive's signature
    async fn verify(
        &self,
        archive_path: &Path,
        identity: &SigningIdentity,
        strict: bool,
    ) -> JarsignResult<()>;

    /// Human-readable tool name for logs
    fn tool_name(&self) -> &'static str;
}
