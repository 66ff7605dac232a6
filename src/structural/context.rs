//! Per-project analysis context: tracked file versions plus a version-keyed
//! snapshot cache.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

use lru::LruCache;
use tracing::{debug, trace};

use super::analysis::{AnalysisEngine, SourceHost};
use super::project::{CompilerOptions, Project};
use super::snapshot::SourceSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackedFile {
    version: u64,
    /// False after a delete; the counter is kept so a re-created file keeps
    /// counting up.
    available: bool,
}

pub struct AnalysisContext {
    project: Project,
    engine: Arc<dyn AnalysisEngine>,
    files: RwLock<HashMap<PathBuf, TrackedFile>>,
    snapshots: Mutex<LruCache<PathBuf, Arc<SourceSnapshot>>>,
}

impl std::fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

impl AnalysisContext {
    pub fn new(project: Project, engine: Arc<dyn AnalysisEngine>, snapshot_capacity: usize) -> Self {
        let members = project.member_files();
        debug!(
            project = %project.root.display(),
            files = members.len(),
            "Creating analysis context"
        );

        let files = members
            .into_iter()
            .map(|path| {
                (
                    path,
                    TrackedFile {
                        version: 0,
                        available: true,
                    },
                )
            })
            .collect();
        let capacity = NonZeroUsize::new(snapshot_capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            project,
            engine,
            files: RwLock::new(files),
            snapshots: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.project.root
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn engine(&self) -> &dyn AnalysisEngine {
        self.engine.as_ref()
    }

    /// Create-or-increment. Returns the new version.
    pub fn bump_version(&self, path: &Path) -> u64 {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        let version = match files.get_mut(path) {
            Some(file) => {
                file.version += 1;
                file.available = true;
                file.version
            }
            None => {
                files.insert(
                    path.to_path_buf(),
                    TrackedFile {
                        version: 1,
                        available: true,
                    },
                );
                1
            }
        };
        self.evict(path);
        trace!(file = %path.display(), version, "Bumped file version");
        version
    }

    /// Marks a file unavailable. Returns false if it was not tracked.
    pub fn remove_file(&self, path: &Path) -> bool {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        let removed = match files.get_mut(path) {
            Some(file) if file.available => {
                file.available = false;
                true
            }
            _ => false,
        };
        self.evict(path);
        removed
    }

    /// True for files known to the context, including deleted ones.
    pub fn is_known(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn version(&self, path: &Path) -> Option<u64> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .filter(|f| f.available)
            .map(|f| f.version)
    }

    pub fn file_count(&self) -> usize {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|f| f.available)
            .count()
    }

    /// Read view used for a whole query. Version bumps wait until the view is
    /// dropped, so a query never sees a context mid-mutation.
    pub fn view(&self) -> ContextView<'_> {
        ContextView {
            context: self,
            files: self.files.read().unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn evict(&self, path: &Path) {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(path);
    }

    fn load_snapshot(&self, path: &Path, version: u64) -> Option<Arc<SourceSnapshot>> {
        {
            let mut cache = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(path) {
                if hit.version == version {
                    return Some(hit.clone());
                }
            }
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Tracked file is unreadable");
                return None;
            }
        };
        let snapshot = Arc::new(SourceSnapshot::new(path, version, text));
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(path.to_path_buf(), snapshot.clone());
        Some(snapshot)
    }
}

pub struct ContextView<'a> {
    context: &'a AnalysisContext,
    files: RwLockReadGuard<'a, HashMap<PathBuf, TrackedFile>>,
}

impl ContextView<'_> {
    pub fn engine(&self) -> &dyn AnalysisEngine {
        self.context.engine()
    }
}

impl SourceHost for ContextView<'_> {
    fn root(&self) -> &Path {
        self.context.root()
    }

    fn options(&self) -> &CompilerOptions {
        &self.context.project.options
    }

    fn file_names(&self) -> Vec<PathBuf> {
        let mut names: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(_, f)| f.available)
            .map(|(p, _)| p.clone())
            .collect();
        names.sort();
        names
    }

    fn version(&self, path: &Path) -> Option<u64> {
        self.files
            .get(path)
            .filter(|f| f.available)
            .map(|f| f.version)
    }

    fn snapshot(&self, path: &Path) -> Option<Arc<SourceSnapshot>> {
        let version = self.version(path)?;
        self.context.load_snapshot(path, version)
    }
}
