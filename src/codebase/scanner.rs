use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::structural::discovery::is_denied_dir;

/// Extensions picked up for semantic indexing.
pub const INDEXED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

pub fn scan_directory(root: &Path) -> crate::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(crate::AppError::InvalidPath(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_some_and(|t| t.is_dir())
                    && is_denied_dir(entry.file_name()))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_some_and(|t| t.is_file()) && is_code_file(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

pub fn is_code_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    INDEXED_EXTENSIONS.contains(&ext)
}
