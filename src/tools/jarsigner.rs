//! `jarsigner` backed signing tool
//!
//! Passwords are handed over through the child environment
//! (`-storepass:env`, `-keypass:env`) so they never show up in argv.

use crate::error::{JarsignError, JarsignResult};
use crate::identity::SigningIdentity;
use crate::tools::{run_tool, SigningTool};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

const STOREPASS_ENV: &str = "JARSIGN_CACHE_STOREPASS";
const KEYPASS_ENV: &str = "JARSIGN_CACHE_KEYPASS";

/// Signing tool running the JDK's `jarsigner`
pub struct JarSigner {
    program: PathBuf,
}

impl JarSigner {
    /// Create a signer running the given executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments shared by sign and verify: keystore and store password
    fn keystore_args(identity: &SigningIdentity, args: &mut Vec<OsString>) {
        if let Some(keystore) = identity.keystore_path() {
            args.push("-keystore".into());
            args.push(keystore.into_os_string());
        }
        if identity.storepass.is_some() {
            args.push("-storepass:env".into());
            args.push(STOREPASS_ENV.into());
        }
    }

    /// Build the argument list for signing
    pub fn sign_args(identity: &SigningIdentity, archive: &Path) -> JarsignResult<Vec<OsString>> {
        let alias = identity
            .alias
            .as_ref()
            .ok_or(JarsignError::ConfigMissing("identity.alias"))?;

        let mut args = Vec::new();
        Self::keystore_args(identity, &mut args);
        if identity.keypass.is_some() {
            args.push("-keypass:env".into());
            args.push(KEYPASS_ENV.into());
        }
        if let Some(tsa) = &identity.tsa {
            args.push("-tsa".into());
            args.push(tsa.into());
        }
        args.push(archive.as_os_str().to_os_string());
        args.push(alias.into());
        Ok(args)
    }

    /// Build the argument list for verification
    pub fn verify_args(identity: &SigningIdentity, archive: &Path, strict: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-verify".into()];
        if strict {
            args.push("-strict".into());
        }
        args.push("-verbose:summary".into());
        Self::keystore_args(identity, &mut args);
        args.push(archive.as_os_str().to_os_string());
        if let Some(alias) = &identity.alias {
            args.push(alias.into());
        }
        args
    }

    fn command(&self, identity: &SigningIdentity, args: Vec<OsString>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(storepass) = &identity.storepass {
            command.env(STOREPASS_ENV, storepass);
        }
        if let Some(keypass) = &identity.keypass {
            command.env(KEYPASS_ENV, keypass);
        }
        command
    }
}

impl Default for JarSigner {
    fn default() -> Self {
        Self::new("jarsigner")
    }
}

#[async_trait]
impl SigningTool for JarSigner {
    async fn sign(&self, archive_path: &Path, identity: &SigningIdentity) -> JarsignResult<()> {
        let args = Self::sign_args(identity, archive_path)?;
        info!("Signing {}", archive_path.display());
        run_tool(
            self.tool_name(),
            self.command(identity, args),
            archive_path,
        )
        .await?;
        Ok(())
    }

    async fn verify(
        &self,
        archive_path: &Path,
        identity: &SigningIdentity,
        strict: bool,
    ) -> JarsignResult<()> {
        let args = Self::verify_args(identity, archive_path, strict);
        let output = run_tool(
            self.tool_name(),
            self.command(identity, args),
            archive_path,
        )
        .await?;
        debug!("Verified {}: {}", archive_path.display(), output.trim());
        Ok(())
    }

    fn tool_name(&self) -> &'static str {
        "jarsigner"
    }
}
