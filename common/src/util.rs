use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use walkdir::WalkDir;

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Recursively finds result files under `dir` with one of `extensions`.
///
/// Symlinks are followed, files reachable through more than one path are only
/// returned once. The result is sorted so that runs are reproducible.
pub fn find_result_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!("Results directory {} does not exist", dir.display());
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut files = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(|e| e.into_path())
        .filter(|path| {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            seen.insert(canonical)
        })
        .collect::<Vec<_>>();
    files.sort();
    debug!("Found {} result files in {}", files.len(), dir.display());
    files
}
