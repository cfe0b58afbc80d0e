//! CLI argument definitions using clap derive

use crate::cache::ChecksumAlgorithm;
use crate::config::Config;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// jarsign-cache - cached jar signing
///
/// Signs the archives under a build directory, reusing signed copies from a
/// shared cache when the input has not changed.
#[derive(Parser, Debug)]
#[command(name = "jarsign-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "JARSIGN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign and verify every archive in the jar directory
    Sign(SignArgs),

    /// Show configuration
    Config(ConfigArgs),

    /// Inspect the signing cache
    Cache(CacheArgs),
}

/// Options that override the configuration file for one run
#[derive(Args, Debug, Default, Clone)]
pub struct RunOverrides {
    /// Cache namespace id
    #[arg(long, env = "JARSIGN_CACHE_ID")]
    pub id: Option<String>,

    /// Directory scanned for archives
    #[arg(short = 'd', long)]
    pub jar_directory: Option<PathBuf>,

    /// Comma separated archive extensions (default: jar)
    #[arg(long)]
    pub types: Option<String>,

    /// Sign every archive even if a cached copy matches
    #[arg(long)]
    pub force_sign: bool,

    /// Canonicalize archives before signing
    #[arg(long)]
    pub repack: bool,

    /// Deliver signed archives in packed form
    #[arg(long)]
    pub pack200: bool,

    /// Key alias
    #[arg(long, env = "JARSIGN_ALIAS")]
    pub alias: Option<String>,

    /// Keystore path
    #[arg(long, env = "JARSIGN_KEYSTORE")]
    pub keystore: Option<String>,

    /// Keystore password
    #[arg(long, env = "JARSIGN_STOREPASS", hide_env_values = true)]
    pub storepass: Option<String>,

    /// Private key password
    #[arg(long, env = "JARSIGN_KEYPASS", hide_env_values = true)]
    pub keypass: Option<String>,

    /// Timestamp authority URL
    #[arg(long)]
    pub tsa: Option<String>,

    /// Local artifact repository (the cache is its `jarsign-cache` sibling)
    #[arg(long)]
    pub repository: Option<PathBuf>,

    /// Checksum algorithm for cache sidecars
    #[arg(long)]
    pub checksum_algorithm: Option<ChecksumAlgorithm>,

    /// Verification workers (0 = host parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Extra manifest attribute (KEY=VALUE), repeatable
    #[arg(short = 'm', long = "manifest-entry", value_parser = parse_manifest_entry)]
    pub manifest_entries: Vec<(String, String)>,
}

impl RunOverrides {
    /// Apply the given options on top of a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(id) = &self.id {
            config.id = Some(id.clone());
        }
        if let Some(dir) = &self.jar_directory {
            config.jar_directory = Some(dir.clone());
        }
        if let Some(types) = &self.types {
            config.types = types.clone();
        }
        config.force_sign |= self.force_sign;
        config.repack |= self.repack;
        config.pack200 |= self.pack200;

        let identity = &mut config.identity;
        for (value, target) in [
            (&self.alias, &mut identity.alias),
            (&self.keystore, &mut identity.keystore),
            (&self.storepass, &mut identity.storepass),
            (&self.keypass, &mut identity.keypass),
            (&self.tsa, &mut identity.tsa),
        ] {
            if value.is_some() {
                *target = value.clone();
            }
        }

        if let Some(repository) = &self.repository {
            config.repository = Some(repository.clone());
        }
        if let Some(algorithm) = self.checksum_algorithm {
            config.checksum_algorithm = algorithm;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        for (key, value) in &self.manifest_entries {
            config.manifest.insert(key.clone(), value.clone());
        }
    }
}

/// Arguments for the sign command
#[derive(Parser, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (passwords redacted)
    Show,

    /// Show configuration file path
    Path,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the cache root and namespace directory
    Path {
        /// Cache namespace id
        #[arg(long, env = "JARSIGN_CACHE_ID")]
        id: Option<String>,

        /// Local artifact repository
        #[arg(long)]
        repository: Option<PathBuf>,
    },

    /// Classify archives without signing anything
    Status {
        #[command(flatten)]
        overrides: RunOverrides,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl clap::ValueEnum for ChecksumAlgorithm {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Sha256, Self::Sha512]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.name()))
    }
}

/// Parse a manifest attribute in KEY=VALUE format
fn parse_manifest_entry(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE format: no '=' found in '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE format: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_manifest_entry_valid() {
        let (k, v) = parse_manifest_entry("Built-By=ci").unwrap();
        assert_eq!(k, "Built-By");
        assert_eq!(v, "ci");
    }

    #[test]
    fn parse_manifest_entry_with_equals() {
        let (k, v) = parse_manifest_entry("Permissions=a=b").unwrap();
        assert_eq!(k, "Permissions");
        assert_eq!(v, "a=b");
    }

    #[test]
    fn parse_manifest_entry_invalid() {
        assert!(parse_manifest_entry("Built-By").is_err());
        assert!(parse_manifest_entry("=ci").is_err());
    }

    #[test]
    fn cli_parses_sign() {
        let cli = Cli::parse_from([
            "jarsign-cache",
            "sign",
            "--id",
            "release",
            "-d",
            "target",
            "--repack",
            "-m",
            "Built-By=ci",
            "--checksum-algorithm",
            "sha512",
        ]);
        match cli.command {
            Commands::Sign(args) => {
                assert_eq!(args.overrides.id.as_deref(), Some("release"));
                assert_eq!(args.overrides.jar_directory, Some(PathBuf::from("target")));
                assert!(args.overrides.repack);
                assert!(!args.overrides.pack200);
                assert_eq!(
                    args.overrides.checksum_algorithm,
                    Some(ChecksumAlgorithm::Sha512)
                );
                assert_eq!(args.format, OutputFormat::Text);
            }
            _ => panic!("expected Sign command"),
        }
    }

    #[test]
    fn cli_parses_cache_status_json() {
        let cli = Cli::parse_from(["jarsign-cache", "cache", "status", "--format", "json"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Status { format, .. },
            }) => assert_eq!(format, OutputFormat::Json),
            _ => panic!("expected cache status"),
        }
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["jarsign-cache", "config"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["jarsign-cache", "-v", "config"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["jarsign-cache", "-vv", "config", "path"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = Config {
            id: Some("file".to_string()),
            types: "jar".to_string(),
            ..Config::default()
        };
        config.identity.alias = Some("file-alias".to_string());
        config
            .manifest
            .insert("Built-By".to_string(), "file".to_string());

        let overrides = RunOverrides {
            id: Some("cli".to_string()),
            types: Some("jar,war".to_string()),
            alias: Some("cli-alias".to_string()),
            force_sign: true,
            manifest_entries: vec![("Built-By".to_string(), "cli".to_string())],
            ..RunOverrides::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.id.as_deref(), Some("cli"));
        assert_eq!(config.types, "jar,war");
        assert_eq!(config.identity.alias.as_deref(), Some("cli-alias"));
        assert!(config.force_sign);
        assert_eq!(config.manifest["Built-By"], "cli");
    }

    #[test]
    fn unset_overrides_keep_file_values() {
        let mut config = Config::default();
        config.identity.keystore = Some("~/release.jks".to_string());
        config.repack = true;

        RunOverrides::default().apply(&mut config);

        assert_eq!(config.identity.keystore.as_deref(), Some("~/release.jks"));
        assert!(config.repack);
    }
}
