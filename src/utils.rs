use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const SYSTEM_VOLUME_INFO: &str = "System Volume Information";

/// Compiles a pattern that is part of the crate's own tables.
///
/// Only used for literal patterns, which are covered by the table tests.
pub(crate) fn static_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => panic!("invalid built-in pattern {pattern}: {e}"),
    }
}

/// Checks if a directory entry is hidden or belongs to the OS rather than the camera.
fn is_ignored(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.') || s == SYSTEM_VOLUME_INFO)
}

/// Recursively lists all files below `dir`, skipping hidden and system entries.
pub fn list_files_walkdir_filtered(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e))
        .filter_map(|entry_result| match entry_result {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect()
}

/// Lists the direct sub-directories of `dir` whose name matches `pattern`, sorted by name.
pub fn matching_folders(dir: &Path, pattern: &Regex) -> std::io::Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && pattern.is_match(&entry.file_name().to_string_lossy()) {
            folders.push(entry.path());
        }
    }
    folders.sort();
    Ok(folders)
}

/// File name of a path as an owned string, empty when there is none.
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
