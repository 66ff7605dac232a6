use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;
use tracing::{info, warn};

use super::analysis::AnalysisEngine;
use super::context::AnalysisContext;
use super::project::Project;
use super::router::RootIndex;
use crate::types::{AppError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub loaded: usize,
    pub skipped: Vec<PathBuf>,
}

/// Owns every analysis context, keyed by project root.
pub struct ContextPool {
    engine: Arc<dyn AnalysisEngine>,
    snapshot_capacity: usize,
    index: RwLock<RootIndex<Arc<AnalysisContext>>>,
}

impl ContextPool {
    pub fn new(engine: Arc<dyn AnalysisEngine>, snapshot_capacity: usize) -> Self {
        Self {
            engine,
            snapshot_capacity,
            index: RwLock::new(RootIndex::new()),
        }
    }

    /// Builds contexts for every config in parallel. A config that fails to
    /// parse is logged and skipped.
    pub fn populate(&self, configs: &[PathBuf]) -> PoolReport {
        let built: Vec<(PathBuf, Result<AnalysisContext>)> = configs
            .par_iter()
            .map(|config| (config.clone(), self.build(config)))
            .collect();

        let mut report = PoolReport::default();
        for (config, result) in built {
            match result {
                Ok(context) => {
                    self.register(Arc::new(context));
                    report.loaded += 1;
                }
                Err(e) => {
                    warn!(config = %config.display(), error = %e, "Skipping project");
                    report.skipped.push(config);
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "Analysis contexts ready"
        );
        report
    }

    pub fn create_context(&self, config: &Path) -> Result<Arc<AnalysisContext>> {
        let context = Arc::new(self.build(config)?);
        self.register(context.clone());
        Ok(context)
    }

    fn build(&self, config: &Path) -> Result<AnalysisContext> {
        let project = Project::load(config)?;
        Ok(AnalysisContext::new(
            project,
            self.engine.clone(),
            self.snapshot_capacity,
        ))
    }

    fn register(&self, context: Arc<AnalysisContext>) {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        index.insert(context.root().to_path_buf(), context);
    }

    pub fn route(&self, path: &Path) -> Result<Arc<AnalysisContext>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .route(path)
            .cloned()
            .ok_or_else(|| AppError::ProjectNotFound(path.to_path_buf()))
    }

    /// Contexts ordered longest root first.
    pub fn contexts(&self) -> Vec<Arc<AnalysisContext>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structural::analysis::TreeSitterAnalysis;
    use crate::test_utils::fixture_workspace;

    fn pool() -> ContextPool {
        ContextPool::new(Arc::new(TreeSitterAnalysis::new()), 16)
    }

    #[test]
    fn test_bad_config_does_not_block_others() {
        let ws = fixture_workspace(&[
            ("good/tsconfig.json", "{}"),
            ("good/a.ts", ""),
            ("bad/tsconfig.json", "{ nope"),
        ]);
        let root = ws.path();
        let pool = pool();
        let report = pool.populate(&[
            root.join("bad/tsconfig.json"),
            root.join("good/tsconfig.json"),
        ]);

        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped, vec![root.join("bad/tsconfig.json")]);
        assert!(pool.route(&root.join("good/a.ts")).is_ok());
    }

    #[test]
    fn test_nested_project_routing() {
        let ws = fixture_workspace(&[
            ("tsconfig.json", "{}"),
            ("a.ts", ""),
            ("sub/tsconfig.json", "{}"),
            ("sub/b.ts", ""),
        ]);
        let root = ws.path();
        let pool = pool();
        pool.populate(&[root.join("tsconfig.json"), root.join("sub/tsconfig.json")]);

        assert_eq!(pool.route(&root.join("a.ts")).unwrap().root(), root);
        assert_eq!(
            pool.route(&root.join("sub/b.ts")).unwrap().root(),
            root.join("sub")
        );
    }

    #[test]
    fn test_route_outside_workspace() {
        let ws = fixture_workspace(&[("tsconfig.json", "{}")]);
        let pool = pool();
        pool.create_context(&ws.path().join("tsconfig.json")).unwrap();

        let err = pool.route(Path::new("/elsewhere/a.ts")).unwrap_err();
        assert_eq!(err.code(), "project_not_found");
        assert_eq!(pool.len(), 1);
    }
}
