use std::path::{Component, Path, PathBuf};

/// Project roots ordered longest first, so the first match is the most
/// specific owner of a path.
#[derive(Debug, Clone)]
pub struct RootIndex<T> {
    entries: Vec<(PathBuf, T)>,
}

impl<T> Default for RootIndex<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> RootIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a root, replacing an existing entry for the same root.
    pub fn insert(&mut self, root: PathBuf, value: T) {
        self.entries.retain(|(r, _)| r != &root);
        self.entries.push((root, value));
        self.entries.sort_by(|(a, _), (b, _)| {
            b.as_os_str()
                .len()
                .cmp(&a.as_os_str().len())
                .then_with(|| a.cmp(b))
        });
    }

    /// First root that owns `path` on a path-segment boundary.
    pub fn route(&self, path: &Path) -> Option<&T> {
        self.entries
            .iter()
            .find(|(root, _)| path.starts_with(root))
            .map(|(_, value)| value)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(root, _)| root.as_path())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lexically resolves `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(roots: &[&str]) -> RootIndex<String> {
        let mut index = RootIndex::new();
        for root in roots {
            index.insert(PathBuf::from(root), root.to_string());
        }
        index
    }

    #[test]
    fn test_nested_root_wins() {
        let index = index(&["/proj", "/proj/sub"]);
        assert_eq!(
            index.route(Path::new("/proj/a.txt")).map(String::as_str),
            Some("/proj")
        );
        assert_eq!(
            index.route(Path::new("/proj/sub/b.txt")).map(String::as_str),
            Some("/proj/sub")
        );
    }

    #[test]
    fn test_segment_boundary() {
        let index = index(&["/foo/bar"]);
        assert!(index.route(Path::new("/foo/bar2/x.ts")).is_none());
        assert!(index.route(Path::new("/foo/bar/x.ts")).is_some());
    }

    #[test]
    fn test_no_owner() {
        let index = index(&["/a"]);
        assert!(index.route(Path::new("/b/c.ts")).is_none());
        assert!(RootIndex::<()>::new().route(Path::new("/a")).is_none());
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let index = index(&["/w/a/b/c", "/w", "/w/a"]);
        let roots: Vec<&Path> = index.roots().collect();
        assert_eq!(
            roots,
            vec![Path::new("/w/a/b/c"), Path::new("/w/a"), Path::new("/w")]
        );
        assert_eq!(
            index.route(Path::new("/w/a/b/x.ts")).map(String::as_str),
            Some("/w/a")
        );
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }
}
