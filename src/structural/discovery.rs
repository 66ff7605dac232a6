//! Workspace scan for project configuration files.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::types::Language;

pub const CONFIG_FILE_NAME: &str = "tsconfig.json";

/// Directory names pruned from discovery, membership and watching.
pub const DENYLIST: &[&str] = &["node_modules", ".git", "dist", "build", "coverage"];

pub const TYPESCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];
pub const JAVASCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

pub fn is_denied_dir(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| DENYLIST.contains(&n))
}

/// True if any component of `path` below `root` is a denylisted directory.
pub fn is_ignored_path(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .parent()
        .is_some_and(|dir| dir.components().any(|c| is_denied_dir(c.as_os_str())))
}

pub fn detect_language(path: &Path) -> Language {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Language::Unknown;
    };

    match ext.to_lowercase().as_str() {
        "ts" | "mts" | "cts" => Language::TypeScript,
        "tsx" => Language::Tsx,
        "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
        _ => Language::Unknown,
    }
}

pub fn has_source_extension(path: &Path, allow_js: bool) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    TYPESCRIPT_EXTENSIONS.contains(&ext.as_str())
        || (allow_js && JAVASCRIPT_EXTENSIONS.contains(&ext.as_str()))
}

/// Depth-first scan of `root` for `tsconfig.json` files.
///
/// Denylisted directories are pruned with their whole subtree. Directories
/// that hold a config are still descended into, so nested projects are
/// returned too. Unreadable entries are skipped. The result is sorted.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_some_and(|t| t.is_dir())
                    && is_denied_dir(entry.file_name()))
        })
        .build();

    let mut configs = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry during discovery: {}", e);
                continue;
            }
        };
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        if is_file && entry.file_name() == CONFIG_FILE_NAME {
            configs.push(entry.into_path());
        }
    }

    if configs.is_empty() {
        warn!(root = %root.display(), "No {} found in workspace", CONFIG_FILE_NAME);
    }

    configs.sort();
    configs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_discover_finds_nested_projects() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("tsconfig.json"));
        touch(&root.join("sub/tsconfig.json"));
        touch(&root.join("packages/a/tsconfig.json"));

        let found = discover(root);
        assert_eq!(
            found,
            vec![
                root.join("packages/a/tsconfig.json"),
                root.join("sub/tsconfig.json"),
                root.join("tsconfig.json"),
            ]
        );
    }

    #[test]
    fn test_discover_prunes_denylisted_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("app/tsconfig.json"));
        touch(&root.join("node_modules/lib/tsconfig.json"));
        touch(&root.join("app/dist/tsconfig.json"));
        touch(&root.join(".git/tsconfig.json"));
        touch(&root.join("coverage/deep/er/tsconfig.json"));

        assert_eq!(discover(root), vec![root.join("app/tsconfig.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_survives_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/tsconfig.json"));
        touch(&root.join("locked/inner/tsconfig.json"));
        touch(&root.join("z/tsconfig.json"));

        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let found = discover(root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(found.contains(&root.join("a/tsconfig.json")));
        assert!(found.contains(&root.join("z/tsconfig.json")));
    }

    #[test]
    fn test_discover_missing_root_is_empty() {
        assert!(discover(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_is_ignored_path() {
        let root = Path::new("/ws");
        assert!(is_ignored_path(root, Path::new("/ws/node_modules/x/a.ts")));
        assert!(is_ignored_path(root, Path::new("/ws/src/dist/a.ts")));
        assert!(!is_ignored_path(root, Path::new("/ws/src/a.ts")));
        assert!(!is_ignored_path(root, Path::new("/ws/src/build.ts")));
    }

    #[test]
    fn test_source_extensions() {
        assert!(has_source_extension(Path::new("a.ts"), false));
        assert!(has_source_extension(Path::new("a.d.ts"), false));
        assert!(!has_source_extension(Path::new("a.js"), false));
        assert!(has_source_extension(Path::new("a.jsx"), true));
        assert!(!has_source_extension(Path::new("a.json"), true));
    }
}
