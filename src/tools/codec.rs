//! Pack/unpack codec abstraction

use crate::error::JarsignResult;
use async_trait::async_trait;
use std::path::Path;

/// Converts archives to and from their packed form
#[async_trait]
pub trait ArchiveCodec: Send + Sync {
    /// Pack `source` into `target`
    async fn pack(&self, source: &Path, target: &Path) -> JarsignResult<()>;

    /// Unpack `packed` into `target`
    async fn unpack(&self, packed: &Path, target: &Path) -> JarsignResult<()>;

    /// File name suffix of packed archives
    fn packed_extension(&self) -> &'static str;
}
