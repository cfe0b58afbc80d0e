//! `pack200`/`unpack200` backed archive codec

use crate::error::JarsignResult;
use crate::tools::{run_tool, ArchiveCodec};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Suffix of packed archives
pub const PACKED_EXTENSION: &str = ".pack.gz";

/// Packer settings
///
/// The defaults trade packing time for compression and produce stable output:
/// maximal effort, a single segment, reordered files, one smeared timestamp,
/// stored (not deflated) entries, and an error on unknown class attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackProfile {
    /// Compression effort, 0-9
    pub effort: u8,
    /// Segment size limit in bytes, -1 for one segment
    pub segment_limit: i64,
    /// Keep the original file order
    pub keep_file_order: bool,
    /// Replace all modification times with the latest one
    pub smear_modification_time: bool,
    /// Keep per-entry deflate requests
    pub deflate_hint: bool,
    /// Fail on unknown class file attributes instead of passing them through
    pub strict_unknown_attributes: bool,
}

impl Default for PackProfile {
    fn default() -> Self {
        Self {
            effort: 7,
            segment_limit: -1,
            keep_file_order: false,
            smear_modification_time: true,
            deflate_hint: false,
            strict_unknown_attributes: true,
        }
    }
}

impl PackProfile {
    /// Packer options for this profile
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--effort={}", self.effort),
            format!("--segment-limit={}", self.segment_limit),
        ];
        args.push(if self.keep_file_order {
            "--keep-file-order".to_string()
        } else {
            "--no-keep-file-order".to_string()
        });
        if self.smear_modification_time {
            args.push("--modification-time=latest".to_string());
        }
        args.push(format!("--deflate-hint={}", self.deflate_hint));
        if self.strict_unknown_attributes {
            args.push("--unknown-attribute=error".to_string());
        }
        args
    }
}

/// Codec running the JDK's `pack200` and `unpack200`
pub struct Pack200Codec {
    pack200: PathBuf,
    unpack200: PathBuf,
    profile: PackProfile,
}

impl Pack200Codec {
    /// Create a codec with the default profile
    pub fn new(pack200: impl Into<PathBuf>, unpack200: impl Into<PathBuf>) -> Self {
        Self {
            pack200: pack200.into(),
            unpack200: unpack200.into(),
            profile: PackProfile::default(),
        }
    }

    /// Use a different packing profile
    pub fn with_profile(mut self, profile: PackProfile) -> Self {
        self.profile = profile;
        self
    }

    fn pack_args(&self, source: &Path, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.profile.args().into_iter().map(OsString::from).collect();
        args.push(target.as_os_str().to_os_string());
        args.push(source.as_os_str().to_os_string());
        args
    }
}

impl Default for Pack200Codec {
    fn default() -> Self {
        Self::new("pack200", "unpack200")
    }
}

#[async_trait]
impl ArchiveCodec for Pack200Codec {
    async fn pack(&self, source: &Path, target: &Path) -> JarsignResult<()> {
        let mut command = Command::new(&self.pack200);
        command.args(self.pack_args(source, target));
        run_tool("pack200", command, source).await?;
        Ok(())
    }

    async fn unpack(&self, packed: &Path, target: &Path) -> JarsignResult<()> {
        let mut command = Command::new(&self.unpack200);
        command.arg(packed).arg(target);
        run_tool("unpack200", command, packed).await?;
        Ok(())
    }

    fn packed_extension(&self) -> &'static str {
        PACKED_EXTENSION
    }
}
