//! Discovery of candidate archives under the jar directory

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Split a comma-separated type list into `.ext` suffixes
///
/// Entries are trimmed and a leading dot is optional; empty entries are
/// ignored.
pub fn parse_types(types: &str) -> Vec<String> {
    types
        .split(',')
        .map(str::trim)
        .map(|t| t.trim_start_matches('.'))
        .filter(|t| !t.is_empty())
        .map(|t| format!(".{}", t))
        .collect()
}

/// Collect every file under `root` whose name ends in one of the suffixes
///
/// A missing root yields no candidates. The result is sorted.
pub fn discover_archives(root: &Path, suffixes: &[String]) -> Vec<PathBuf> {
    if !root.is_dir() {
        debug!("Jar directory {} does not exist", root.display());
        return Vec::new();
    }

    let mut archives: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
        })
        .map(|entry| entry.into_path())
        .collect();
    archives.sort();

    debug!("Found {} archive(s) under {}", archives.len(), root.display());
    archives
}
