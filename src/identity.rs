//! Signing identity and credential rotation detection
//!
//! The fingerprint of the active identity is stored in every cache namespace.
//! When it changes (or was never recorded) the namespace is emptied and every
//! archive is signed again, because cached copies carry the old key.

use crate::cache::{CacheNamespace, ChecksumStore};
use crate::config::expand_home;
use crate::config::schema::IdentityConfig;
use crate::error::JarsignResult;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Credentials handed to the signing tool
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SigningIdentity {
    /// Keystore location (a path, or a token like `NONE` for hardware stores)
    pub keystore: Option<String>,
    /// Key alias
    pub alias: Option<String>,
    /// Keystore password
    pub storepass: Option<String>,
    /// Private key password
    pub keypass: Option<String>,
    /// Timestamp authority URL (not part of the fingerprint)
    pub tsa: Option<String>,
}

impl SigningIdentity {
    /// Keystore reference as a local path, with `~/` expanded
    pub fn keystore_path(&self) -> Option<PathBuf> {
        self.keystore.as_deref().map(expand_home)
    }

    /// Bytes the fingerprint is computed over
    ///
    /// Each credential is length-prefixed so that shifting characters between
    /// fields changes the result. When the keystore is a readable file its
    /// content is appended, which catches keys replaced in place.
    fn fingerprint_material(&self) -> Vec<u8> {
        let mut material = Vec::new();
        for field in [&self.keystore, &self.alias, &self.storepass, &self.keypass] {
            match field {
                Some(value) => {
                    material.push(1);
                    material.extend_from_slice(&(value.len() as u64).to_le_bytes());
                    material.extend_from_slice(value.as_bytes());
                }
                None => material.push(0),
            }
        }

        if let Some(path) = self.keystore_path() {
            match fs::read(&path) {
                Ok(bytes) => material.extend_from_slice(&bytes),
                Err(e) => debug!("Keystore {} not readable for fingerprint: {}", path.display(), e),
            }
        }
        material
    }

    /// Hex fingerprint of this identity
    pub fn fingerprint(&self, store: &ChecksumStore) -> String {
        store.digest_bytes(&self.fingerprint_material())
    }
}

impl From<&IdentityConfig> for SigningIdentity {
    fn from(config: &IdentityConfig) -> Self {
        Self {
            keystore: config.keystore.clone(),
            alias: config.alias.clone(),
            storepass: config.storepass.clone(),
            keypass: config.keypass.clone(),
            tsa: config.tsa.clone(),
        }
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("SigningIdentity")
            .field("keystore", &self.keystore)
            .field("alias", &self.alias)
            .field("storepass", &redact(&self.storepass))
            .field("keypass", &redact(&self.keypass))
            .field("tsa", &self.tsa)
            .finish()
    }
}

/// Compare the identity against the namespace's recorded fingerprint
///
/// Returns `true` when the fingerprint is new or changed; the caller must then
/// treat every candidate as NEW. In that case the namespace is emptied before
/// the new fingerprint is stored, so no entry signed with the old key survives
/// for archives outside this run. Callers hold the namespace lock.
pub async fn check_and_refresh(
    namespace: &CacheNamespace,
    identity: &SigningIdentity,
    store: &ChecksumStore,
) -> JarsignResult<bool> {
    let current = identity.fingerprint(store);
    if is_current_fingerprint(namespace, &current, store) {
        debug!("Signing identity unchanged for namespace {}", namespace.id());
        return Ok(false);
    }

    let removed = namespace.invalidate().await?;
    store.write_plain_sidecar(&namespace.identity_fingerprint_base(), &current)?;
    info!(
        "Signing identity changed for namespace {}, {} cache entries dropped",
        namespace.id(),
        removed
    );
    Ok(true)
}

/// Whether the namespace recorded this identity, without updating anything
pub fn is_current(namespace: &CacheNamespace, identity: &SigningIdentity, store: &ChecksumStore) -> bool {
    is_current_fingerprint(namespace, &identity.fingerprint(store), store)
}

fn is_current_fingerprint(namespace: &CacheNamespace, current: &str, store: &ChecksumStore) -> bool {
    let path = store.sidecar_path(&namespace.identity_fingerprint_base());
    fs::read_to_string(path)
        .map(|stored| stored.trim() == current)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ChecksumAlgorithm;
    use tempfile::TempDir;

    fn identity(alias: &str, keystore: &str) -> SigningIdentity {
        SigningIdentity {
            keystore: Some(keystore.to_string()),
            alias: Some(alias.to_string()),
            storepass: Some("changeit".to_string()),
            keypass: None,
            tsa: None,
        }
    }

    #[tokio::test]
    async fn first_check_forces_then_settles() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);
        let id = identity("release", "/nonexistent/keys.jks");

        assert!(check_and_refresh(&ns, &id, &store).await.unwrap());
        assert!(!check_and_refresh(&ns, &id, &store).await.unwrap());
        assert!(ns.dir().join("_identity_fingerprint.sha256").is_file());
    }

    #[tokio::test]
    async fn alias_or_keystore_change_forces() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);

        check_and_refresh(&ns, &identity("release", "/k/a.jks"), &store).await.unwrap();
        assert!(check_and_refresh(&ns, &identity("other", "/k/a.jks"), &store).await.unwrap());
        assert!(check_and_refresh(&ns, &identity("other", "/k/b.jks"), &store).await.unwrap());
        assert!(!check_and_refresh(&ns, &identity("other", "/k/b.jks"), &store).await.unwrap());
    }

    #[tokio::test]
    async fn keystore_content_change_forces() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);
        let keystore = temp.path().join("keys.jks");
        std::fs::write(&keystore, b"key one").unwrap();
        let id = identity("release", keystore.to_str().unwrap());

        check_and_refresh(&ns, &id, &store).await.unwrap();
        std::fs::write(&keystore, b"key two").unwrap();
        assert!(check_and_refresh(&ns, &id, &store).await.unwrap());
    }

    #[tokio::test]
    async fn rotation_empties_namespace() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);
        check_and_refresh(&ns, &identity("old", "/k/a.jks"), &store).await.unwrap();
        for name in ["A.jar", "A.jar.sha256", "A.jar.signed.sha256"] {
            std::fs::write(ns.dir().join(name), b"x").unwrap();
        }

        let new = identity("new", "/k/a.jks");
        assert!(check_and_refresh(&ns, &new, &store).await.unwrap());

        let names: Vec<_> = std::fs::read_dir(ns.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["_identity_fingerprint.sha256"]);
        let stored = std::fs::read_to_string(ns.dir().join("_identity_fingerprint.sha256")).unwrap();
        assert_eq!(stored, new.fingerprint(&store));
    }

    #[tokio::test]
    async fn unchanged_identity_keeps_entries() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);
        let id = identity("release", "/k/a.jks");
        check_and_refresh(&ns, &id, &store).await.unwrap();
        std::fs::write(ns.dir().join("A.jar"), b"x").unwrap();

        assert!(!check_and_refresh(&ns, &id, &store).await.unwrap());
        assert!(ns.dir().join("A.jar").is_file());
    }

    #[tokio::test]
    async fn is_current_does_not_write() {
        let temp = TempDir::new().unwrap();
        let ns = CacheNamespace::open(temp.path(), "rel").await.unwrap();
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);
        let id = identity("release", "/k/a.jks");

        assert!(!is_current(&ns, &id, &store));
        assert!(!ns.dir().join("_identity_fingerprint.sha256").exists());
    }

    #[test]
    fn fields_are_not_ambiguous() {
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);
        let a = SigningIdentity {
            alias: Some("ab".into()),
            storepass: Some("c".into()),
            ..Default::default()
        };
        let b = SigningIdentity {
            alias: Some("a".into()),
            storepass: Some("bc".into()),
            ..Default::default()
        };
        assert_ne!(a.fingerprint(&store), b.fingerprint(&store));
    }

    #[test]
    fn tsa_is_not_part_of_fingerprint() {
        let store = ChecksumStore::new(ChecksumAlgorithm::Sha256);
        let a = identity("release", "/k/a.jks");
        let b = SigningIdentity {
            tsa: Some("http://tsa.example".into()),
            ..a.clone()
        };
        assert_eq!(a.fingerprint(&store), b.fingerprint(&store));
    }

    #[test]
    fn debug_redacts_passwords() {
        let printed = format!("{:?}", identity("release", "/k/a.jks"));
        assert!(!printed.contains("changeit"));
        assert!(printed.contains("release"));
    }
}
