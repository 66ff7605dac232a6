//! Query facade over the context pool: routing, coordinate translation and
//! watcher lifecycle for a whole workspace.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::analysis::{AnalysisEngine, OutlineEntry, SourceHost, TreeSitterAnalysis};
use super::context::{AnalysisContext, ContextView};
use super::discovery::discover;
use super::pool::ContextPool;
use super::position::{to_line_char, to_offset};
use super::router::normalize_path;
use super::watcher::{ProjectWatcher, WatchBudget};
use crate::types::{
    AppError, DefinitionLocation, OutlineNode, ReferenceLocation, Result,
};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub snapshot_cache_size: usize,
    pub max_watched_projects: usize,
    pub watch: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            snapshot_cache_size: 512,
            max_watched_projects: 64,
            watch: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InitReport {
    pub projects: usize,
    pub skipped: usize,
    pub tracked_files: usize,
    pub watched: usize,
    pub unwatched: usize,
}

pub struct StructuralEngine {
    workspace: PathBuf,
    options: EngineOptions,
    pool: Arc<ContextPool>,
    budget: WatchBudget,
    watchers: Mutex<Vec<ProjectWatcher>>,
    init: OnceCell<InitReport>,
}

impl StructuralEngine {
    pub fn new(workspace: &Path, options: EngineOptions) -> Self {
        Self::with_engine(workspace, options, Arc::new(TreeSitterAnalysis::new()))
    }

    pub fn with_engine(
        workspace: &Path,
        options: EngineOptions,
        engine: Arc<dyn AnalysisEngine>,
    ) -> Self {
        let workspace = std::fs::canonicalize(workspace).unwrap_or_else(|_| normalize_path(workspace));
        Self {
            pool: Arc::new(ContextPool::new(engine, options.snapshot_cache_size)),
            budget: WatchBudget::new(options.max_watched_projects),
            workspace,
            options,
            watchers: Mutex::new(Vec::new()),
            init: OnceCell::new(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// Discovery, context construction and watcher startup. Safe to call
    /// more than once; later calls return the first report.
    pub async fn initialize(&self) -> Result<InitReport> {
        self.init
            .get_or_try_init(|| self.initialize_inner())
            .await
            .cloned()
    }

    async fn initialize_inner(&self) -> Result<InitReport> {
        let workspace = self.workspace.clone();
        let pool = self.pool.clone();
        info!(workspace = %workspace.display(), "Initializing structural engine");

        let pool_report = tokio::task::spawn_blocking(move || {
            let configs = discover(&workspace);
            pool.populate(&configs)
        })
        .await?;

        let contexts = self.pool.contexts();
        let mut report = InitReport {
            projects: pool_report.loaded,
            skipped: pool_report.skipped.len(),
            tracked_files: contexts.iter().map(|c| c.file_count()).sum(),
            ..InitReport::default()
        };

        if self.options.watch {
            for context in contexts {
                if self.start_watcher(context) {
                    report.watched += 1;
                } else {
                    report.unwatched += 1;
                }
            }
        } else {
            report.unwatched = report.projects;
        }

        info!(
            projects = report.projects,
            skipped = report.skipped,
            files = report.tracked_files,
            watched = report.watched,
            "Structural engine ready"
        );
        Ok(report)
    }

    /// Starts a watcher unless the budget is exhausted or setup fails; either
    /// way the project stays queryable.
    fn start_watcher(&self, context: Arc<AnalysisContext>) -> bool {
        let root = context.root().to_path_buf();
        if !self.budget.try_acquire() {
            warn!(project = %root.display(), "Watch limit reached, project will not receive updates");
            return false;
        }
        match ProjectWatcher::start(context) {
            Ok(watcher) => {
                self.watchers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(watcher);
                true
            }
            Err(e) => {
                self.budget.release();
                warn!(project = %root.display(), error = %e, "Watcher setup failed, project will not receive updates");
                false
            }
        }
    }

    pub fn shutdown(&self) {
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        for watcher in watchers.iter_mut() {
            watcher.stop();
            self.budget.release();
        }
        watchers.clear();
    }

    /// Absolute, normalized form of a caller-supplied path. Relative paths
    /// are taken from the workspace root.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let raw = Path::new(path);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.workspace.join(raw)
        };
        std::fs::canonicalize(&joined).unwrap_or_else(|_| normalize_path(&joined))
    }

    fn tracked(&self, path: &str) -> Result<(PathBuf, Arc<AnalysisContext>)> {
        let path = self.resolve_path(path);
        let context = self.pool.route(&path)?;
        Ok((path, context))
    }

    pub fn get_definition(
        &self,
        path: &str,
        line: u32,
        character: u32,
    ) -> Result<Vec<DefinitionLocation>> {
        let (path, context) = self.tracked(path)?;
        let view = context.view();
        ensure_tracked(&view, &path)?;

        let offset = to_offset(&view, &path, line, character)?;
        let entries = view
            .engine()
            .resolve_definition(&view, &path, offset)
            .map_err(engine_failure)?;

        entries
            .into_iter()
            .map(|entry| {
                let (line, character) = to_line_char(&view, &entry.path, entry.offset)?;
                Ok(DefinitionLocation {
                    file_name: entry.path.display().to_string(),
                    line,
                    character,
                    kind: entry.kind,
                    name: entry.name,
                    container_name: entry.container_name,
                })
            })
            .collect()
    }

    pub fn get_references(
        &self,
        path: &str,
        line: u32,
        character: u32,
    ) -> Result<Vec<ReferenceLocation>> {
        let (path, context) = self.tracked(path)?;
        let view = context.view();
        ensure_tracked(&view, &path)?;

        let offset = to_offset(&view, &path, line, character)?;
        let entries = view
            .engine()
            .find_references(&view, &path, offset)
            .map_err(engine_failure)?;

        entries
            .into_iter()
            .map(|entry| {
                let (line, character) = to_line_char(&view, &entry.path, entry.offset)?;
                Ok(ReferenceLocation {
                    file_name: entry.path.display().to_string(),
                    line,
                    character,
                    is_write_access: entry.is_write,
                    is_definition: entry.is_declaration,
                })
            })
            .collect()
    }

    pub fn get_file_structure(&self, path: &str) -> Result<Vec<OutlineNode>> {
        let (path, context) = self.tracked(path)?;
        let view = context.view();
        ensure_tracked(&view, &path)?;

        let entries = view.engine().outline(&view, &path).map_err(engine_failure)?;
        outline_nodes(&view, &path, entries)
    }
}

impl Drop for StructuralEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ensure_tracked(view: &ContextView<'_>, path: &Path) -> Result<()> {
    match view.version(path) {
        Some(_) => Ok(()),
        None => Err(AppError::FileNotTracked(path.to_path_buf())),
    }
}

/// Typed errors pass through; anything else the engine raises is a query failure.
fn engine_failure(e: AppError) -> AppError {
    match e {
        AppError::FileNotTracked(_) | AppError::PositionOutOfRange { .. } => e,
        AppError::EngineQuery(_) => e,
        other => AppError::EngineQuery(other.to_string()),
    }
}

fn outline_nodes(
    view: &ContextView<'_>,
    path: &Path,
    entries: Vec<OutlineEntry>,
) -> Result<Vec<OutlineNode>> {
    entries
        .into_iter()
        .map(|entry| {
            let (line, character) = to_line_char(view, path, entry.span_start)?;
            Ok(OutlineNode {
                text: entry.name,
                kind: entry.kind,
                line,
                character,
                children: outline_nodes(view, path, entry.children)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixture_workspace;
    use crate::types::SymbolKind;
    use std::fs;
    use std::time::Duration;

    fn options() -> EngineOptions {
        EngineOptions {
            watch: false,
            ..EngineOptions::default()
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let ws = fixture_workspace(&[
            ("tsconfig.json", "{}"),
            ("a.ts", ""),
            ("sub/tsconfig.json", "{}"),
            ("sub/b.ts", ""),
            ("node_modules/dep/tsconfig.json", "{}"),
        ]);
        let engine = StructuralEngine::new(ws.path(), options());

        let first = engine.initialize().await.unwrap();
        let second = engine.initialize().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.projects, 2);
        assert_eq!(engine.pool().len(), 2);
    }

    #[tokio::test]
    async fn test_outline_two_top_level_one_nested() {
        let ws = fixture_workspace(&[
            ("tsconfig.json", "{}"),
            (
                "src/shapes.ts",
                "export class Circle {\n  area(): number { return 1; }\n}\n\nexport function unit() {}\n",
            ),
        ]);
        let engine = StructuralEngine::new(ws.path(), options());
        engine.initialize().await.unwrap();

        let outline = engine.get_file_structure("src/shapes.ts").unwrap();
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].text, "Circle");
        assert_eq!((outline[0].line, outline[0].character), (1, 1));
        assert_eq!(outline[0].children.len(), 1);
        assert_eq!(outline[0].children[0].text, "area");
        assert_eq!(outline[0].children[0].kind, SymbolKind::Method);
        assert_eq!(
            (outline[1].text.as_str(), outline[1].line, outline[1].character),
            ("unit", 5, 1)
        );
        assert!(outline[1].children.is_empty());
    }

    #[tokio::test]
    async fn test_definition_and_references() {
        let ws = fixture_workspace(&[
            ("tsconfig.json", "{}"),
            ("lib.ts", "export function add(a: number, b: number) {\n  return a + b;\n}\n"),
            ("main.ts", "import { add } from './lib';\nconst total = add(1, 2);\n"),
        ]);
        let engine = StructuralEngine::new(ws.path(), options());
        engine.initialize().await.unwrap();

        let main = ws.path().join("main.ts").display().to_string();
        let defs = engine.get_definition(&main, 2, 15).unwrap();
        assert_eq!(defs.len(), 1);
        assert!(defs[0].file_name.ends_with("lib.ts"));
        assert_eq!((defs[0].line, defs[0].character), (1, 17));
        assert_eq!(defs[0].kind, SymbolKind::Function);

        let refs = engine.get_references("lib.ts", 1, 17).unwrap();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs.iter().filter(|r| r.is_definition).count(), 1);
        assert!(refs[0].file_name.ends_with("lib.ts"));
    }

    #[tokio::test]
    async fn test_query_errors_are_typed() {
        let ws = fixture_workspace(&[("app/tsconfig.json", "{}"), ("app/a.ts", "let x = 1;\n")]);
        let engine = StructuralEngine::new(ws.path(), options());
        engine.initialize().await.unwrap();

        let outside = engine.get_file_structure("elsewhere/z.ts").unwrap_err();
        assert_eq!(outside.code(), "project_not_found");

        let untracked = engine.get_file_structure("app/missing.ts").unwrap_err();
        assert_eq!(untracked.code(), "file_not_tracked");

        let out_of_range = engine.get_definition("app/a.ts", 9, 1).unwrap_err();
        assert_eq!(out_of_range.code(), "position_out_of_range");

        assert!(engine.get_definition("app/a.ts", 1, 11).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_file_is_not_tracked() {
        let ws = fixture_workspace(&[("tsconfig.json", "{}"), ("a.ts", "function f() {}\n")]);
        let engine = StructuralEngine::new(ws.path(), options());
        engine.initialize().await.unwrap();
        assert_eq!(engine.get_file_structure("a.ts").unwrap().len(), 1);

        let path = engine.resolve_path("a.ts");
        let context = engine.pool().route(&path).unwrap();
        fs::remove_file(&path).unwrap();
        context.remove_file(&path);

        let err = engine.get_file_structure("a.ts").unwrap_err();
        assert_eq!(err.code(), "file_not_tracked");
    }

    #[tokio::test]
    async fn test_watched_edit_is_visible() {
        let ws = fixture_workspace(&[("tsconfig.json", "{}"), ("a.ts", "function f() {}\n")]);
        let engine = StructuralEngine::new(ws.path(), EngineOptions::default());
        let report = engine.initialize().await.unwrap();
        assert_eq!(report.watched, 1);
        assert_eq!(engine.get_file_structure("a.ts").unwrap()[0].text, "f");

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(ws.path().join("a.ts"), "function g() {}\n").unwrap();

        let mut latest = String::new();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            latest = engine.get_file_structure("a.ts").unwrap()[0].text.clone();
            if latest == "g" {
                break;
            }
        }
        assert_eq!(latest, "g");
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_watch_budget_degrades_to_unwatched() {
        let ws = fixture_workspace(&[
            ("a/tsconfig.json", "{}"),
            ("b/tsconfig.json", "{}"),
        ]);
        let engine = StructuralEngine::new(
            ws.path(),
            EngineOptions {
                max_watched_projects: 1,
                ..EngineOptions::default()
            },
        );
        let report = engine.initialize().await.unwrap();
        assert_eq!(report.projects, 2);
        assert_eq!(report.watched, 1);
        assert_eq!(report.unwatched, 1);
    }
}
