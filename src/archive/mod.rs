//! In-place archive mutation before signing
//!
//! Archives are rewritten into a temporary sibling and renamed over the
//! original, so a reader never sees a partially written archive. Unchanged
//! entries are copied raw without recompression.

pub mod manifest;

pub use manifest::{Manifest, MANIFEST_PATH};

use crate::error::{JarsignError, JarsignResult};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const SIGNATURE_EXTENSIONS: [&str; 4] = [".SF", ".RSA", ".DSA", ".EC"];

/// Whether an entry is part of a jar signature
///
/// Signature files live directly in `META-INF/` and end in `.SF`, `.RSA`,
/// `.DSA`, `.EC`, or start with `SIG-`.
pub fn is_signature_entry(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let Some(file) = upper.strip_prefix("META-INF/") else {
        return false;
    };
    if file.is_empty() || file.contains('/') {
        return false;
    }
    file.starts_with("SIG-") || SIGNATURE_EXTENSIONS.iter().any(|ext| file.ends_with(ext))
}

/// Read one entry from an archive, `None` if it does not exist
pub fn read_entry(path: &Path, name: &str) -> JarsignResult<Option<Vec<u8>>> {
    let mut archive = open_archive(path)?;
    let Some(index) = find_entry(&mut archive, name) else {
        return Ok(None);
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|e| JarsignError::archive(path, e))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| JarsignError::archive(path, e))?;
    Ok(Some(bytes))
}

/// Entry names of an archive, in stored order
pub fn entry_names(path: &Path) -> JarsignResult<Vec<String>> {
    let mut archive = open_archive(path)?;
    (0..archive.len())
        .map(|index| {
            archive
                .by_index_raw(index)
                .map(|entry| entry.name().to_string())
                .map_err(|e| JarsignError::archive(path, e))
        })
        .collect()
}

/// Remove existing signatures from an archive in place
///
/// Drops signature files and the per-entry digests they refer to. The
/// archive is left untouched when it carries no signature.
pub fn strip_signatures(path: &Path) -> JarsignResult<()> {
    let names = entry_names(path)?;
    let signature_entries = names.iter().filter(|n| is_signature_entry(n)).count();

    let mut manifest = read_entry(path, MANIFEST_PATH)?.map(|bytes| Manifest::parse(&bytes));
    let manifest_changed = manifest
        .as_mut()
        .is_some_and(|m| m.strip_entry_digests());

    if signature_entries == 0 && !manifest_changed {
        debug!("No signature found in {}", path.display());
        return Ok(());
    }

    let replacement = if manifest_changed { manifest.as_ref() } else { None };
    rewrite(path, replacement, is_signature_entry)?;
    debug!(
        "Removed {} signature entries from {}",
        signature_entries,
        path.display()
    );
    Ok(())
}

/// Merge attributes into the archive's main manifest section
///
/// Configured entries override existing ones; other attributes are kept.
/// A manifest is created when the archive has none.
pub fn merge_manifest(path: &Path, entries: &BTreeMap<String, String>) -> JarsignResult<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut manifest = read_entry(path, MANIFEST_PATH)?
        .map(|bytes| Manifest::parse(&bytes))
        .unwrap_or_default();
    for (name, value) in entries {
        manifest.set_main_attribute(name, value);
    }

    rewrite(path, Some(&manifest), |_| false)?;
    info!("Updated manifest for {}", path.display());
    Ok(())
}

fn open_archive(path: &Path) -> JarsignResult<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| JarsignError::archive(path, e))?;
    ZipArchive::new(file).map_err(|e| JarsignError::archive(path, e))
}

fn find_entry(archive: &mut ZipArchive<File>, name: &str) -> Option<usize> {
    (0..archive.len()).find(|&index| {
        archive
            .by_index_raw(index)
            .is_ok_and(|entry| entry.name().eq_ignore_ascii_case(name))
    })
}

/// Rewrite an archive, optionally replacing the manifest and dropping entries
fn rewrite(
    path: &Path,
    manifest: Option<&Manifest>,
    drop_entry: impl Fn(&str) -> bool,
) -> JarsignResult<()> {
    let mut archive = open_archive(path)?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staging = NamedTempFile::new_in(parent).map_err(|e| JarsignError::archive(path, e))?;

    {
        let mut writer = ZipWriter::new(staging.as_file_mut());

        // The manifest goes first so stream readers find it
        if let Some(manifest) = manifest {
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer
                .start_file(MANIFEST_PATH, options)
                .map_err(|e| JarsignError::archive(path, e))?;
            writer
                .write_all(&manifest.to_bytes())
                .map_err(|e| JarsignError::archive(path, e))?;
        }

        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| JarsignError::archive(path, e))?;
            let name = entry.name().to_string();
            if drop_entry(&name) || (manifest.is_some() && name.eq_ignore_ascii_case(MANIFEST_PATH))
            {
                continue;
            }
            writer
                .raw_copy_file(entry)
                .map_err(|e| JarsignError::archive(path, e))?;
        }

        writer
            .finish()
            .map_err(|e| JarsignError::archive(path, e))?;
    }

    staging
        .persist(path)
        .map_err(|e| JarsignError::archive(path, e.error))?;
    Ok(())
}
