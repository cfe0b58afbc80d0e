//! Configuration schema for jarsign-cache
//!
//! Configuration is read from `./jarsign.toml` unless overridden.

use crate::cache::ChecksumAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache namespace id; archives are shared between all builds with the same id
    pub id: Option<String>,

    /// Directory scanned for archives to sign
    pub jar_directory: Option<PathBuf>,

    /// Comma separated archive extensions
    pub types: String,

    /// Sign every archive, ignoring cached results
    pub force_sign: bool,

    /// Canonicalize archives with a pack/unpack round trip before signing
    pub repack: bool,

    /// Store signed archives in packed form
    pub pack200: bool,

    /// Digest used for checksum sidecars
    pub checksum_algorithm: ChecksumAlgorithm,

    /// Local artifact repository; the cache lives in a sibling `jarsign-cache` directory
    pub repository: Option<PathBuf>,

    /// Verification workers (0 = host parallelism)
    pub workers: usize,

    /// Signing identity
    pub identity: IdentityConfig,

    /// Extra main attributes merged into every manifest
    pub manifest: BTreeMap<String, String>,

    /// External tool locations
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: None,
            jar_directory: None,
            types: "jar".to_string(),
            force_sign: false,
            repack: false,
            pack200: false,
            checksum_algorithm: ChecksumAlgorithm::default(),
            repository: None,
            workers: 0,
            identity: IdentityConfig::default(),
            manifest: BTreeMap::new(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Signing identity settings, passed through to jarsigner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Key alias
    pub alias: Option<String>,

    /// Keystore location
    pub keystore: Option<String>,

    /// Keystore password
    pub storepass: Option<String>,

    /// Private key password
    pub keypass: Option<String>,

    /// Timestamp authority URL
    pub tsa: Option<String>,
}

/// External tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path or name of the jarsigner executable
    pub jarsigner: PathBuf,

    /// Path or name of the pack200 executable
    pub pack200: PathBuf,

    /// Path or name of the unpack200 executable
    pub unpack200: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            jarsigner: PathBuf::from("jarsigner"),
            pack200: PathBuf::from("pack200"),
            unpack200: PathBuf::from("unpack200"),
        }
    }
}
