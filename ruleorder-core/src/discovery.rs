//! Filter file discovery
//!
//! Finds the directory the game keeps its loot filters in and lists the
//! candidate files a picker should offer.

use crate::config::EditorConfig;
use crate::error::{Result, RuleOrderError};
use std::fs;
use std::path::{Path, PathBuf};

/// Filters folder relative to the user profile
const FILTERS_SUBPATH: [&str; 5] = [
    "AppData",
    "LocalLow",
    "Eleventh Hour Games",
    "Last Epoch",
    "Filters",
];

/// The configured directory, else the game's per-user Filters folder
pub fn default_filters_dir(config: &EditorConfig) -> Option<PathBuf> {
    if let Some(dir) = &config.filters_dir {
        return Some(dir.clone());
    }

    // USERPROFILE on Windows, $HOME elsewhere (Proton prefixes mirror the layout)
    let home = dirs::home_dir()?;
    Some(FILTERS_SUBPATH.iter().fold(home, |path, part| path.join(part)))
}

/// Files in `dir` whose extension matches (case-insensitively), sorted by name
pub fn list_filter_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| RuleOrderError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| RuleOrderError::io(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
