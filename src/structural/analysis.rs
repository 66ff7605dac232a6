//! Analysis engine seam and the built-in tree-sitter implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::parser::{Declaration, LocalResolution, OutlineTree};
use super::project::CompilerOptions;
use super::snapshot::SourceSnapshot;
use crate::types::{AppError, Result, SymbolKind};

/// What an analysis engine sees of a project: its options, its current file
/// set and a version-consistent snapshot of each file.
pub trait SourceHost {
    fn root(&self) -> &Path;
    fn options(&self) -> &CompilerOptions;
    /// Files currently available, sorted.
    fn file_names(&self) -> Vec<PathBuf>;
    fn version(&self, path: &Path) -> Option<u64>;
    fn snapshot(&self, path: &Path) -> Option<Arc<SourceSnapshot>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionEntry {
    pub path: PathBuf,
    pub offset: usize,
    pub kind: SymbolKind,
    pub name: String,
    pub container_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub path: PathBuf,
    pub offset: usize,
    pub is_write: bool,
    pub is_declaration: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub span_start: usize,
    pub children: Vec<OutlineEntry>,
}

/// Symbol resolution over a project. Results carry byte offsets; turning
/// them into line/character pairs is the caller's job.
pub trait AnalysisEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve_definition(
        &self,
        host: &dyn SourceHost,
        path: &Path,
        offset: usize,
    ) -> Result<Vec<DefinitionEntry>>;

    fn find_references(
        &self,
        host: &dyn SourceHost,
        path: &Path,
        offset: usize,
    ) -> Result<Vec<ReferenceEntry>>;

    fn outline(&self, host: &dyn SourceHost, path: &Path) -> Result<Vec<OutlineEntry>>;
}

/// A resolved declaration: which file and which declaration index in it.
#[derive(Clone)]
struct Target {
    snapshot: Arc<SourceSnapshot>,
    index: usize,
}

impl Target {
    fn key(&self) -> (PathBuf, usize) {
        (self.snapshot.path.clone(), self.index)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterAnalysis;

impl TreeSitterAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn snapshot(host: &dyn SourceHost, path: &Path) -> Result<Arc<SourceSnapshot>> {
        host.snapshot(path)
            .ok_or_else(|| AppError::FileNotTracked(path.to_path_buf()))
    }

    fn resolve_at(
        &self,
        host: &dyn SourceHost,
        snapshot: &Arc<SourceSnapshot>,
        offset: usize,
    ) -> Vec<Target> {
        let symbols = snapshot.symbols();
        let Some(occurrence) = symbols.occurrence_at(offset) else {
            return Vec::new();
        };
        self.resolve(host, snapshot, symbols.resolve_local(occurrence))
    }

    fn resolve(
        &self,
        host: &dyn SourceHost,
        snapshot: &Arc<SourceSnapshot>,
        resolution: LocalResolution,
    ) -> Vec<Target> {
        match resolution {
            LocalResolution::Declared(index) => {
                let decl = &snapshot.symbols().declarations[index];
                let local = Target {
                    snapshot: snapshot.clone(),
                    index,
                };
                if decl.kind != SymbolKind::Import {
                    return vec![local];
                }
                match decl.imported_name.as_deref() {
                    Some(name) if name != "default" && name != "*" => {
                        let found = ranked(host, &snapshot.path, |s| {
                            s.symbols().top_level_named(name).collect()
                        });
                        if found.is_empty() {
                            vec![local]
                        } else {
                            found
                        }
                    }
                    _ => vec![local],
                }
            }
            LocalResolution::Member(name) => ranked(host, &snapshot.path, |s| {
                s.symbols().members_named(&name).collect()
            }),
            LocalResolution::Unresolved(name) => ranked(host, &snapshot.path, |s| {
                s.symbols().top_level_named(&name).collect()
            }),
        }
    }
}

/// Collects matches across the project and keeps only the closest group:
/// same file, then same directory, then anywhere.
fn ranked<F>(host: &dyn SourceHost, origin: &Path, find: F) -> Vec<Target>
where
    F: Fn(&SourceSnapshot) -> Vec<usize>,
{
    let origin_dir = origin.parent();
    let mut best = 0u8;
    let mut out: Vec<(u8, Target)> = Vec::new();

    for path in host.file_names() {
        let Some(snapshot) = host.snapshot(&path) else {
            continue;
        };
        let score = if path == origin {
            2
        } else if path.parent() == origin_dir {
            1
        } else {
            0
        };
        if score < best {
            continue;
        }
        for index in find(snapshot.as_ref()) {
            best = best.max(score);
            out.push((
                score,
                Target {
                    snapshot: snapshot.clone(),
                    index,
                },
            ));
        }
    }

    out.into_iter()
        .filter(|(score, _)| *score == best)
        .map(|(_, target)| target)
        .collect()
}

impl AnalysisEngine for TreeSitterAnalysis {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn resolve_definition(
        &self,
        host: &dyn SourceHost,
        path: &Path,
        offset: usize,
    ) -> Result<Vec<DefinitionEntry>> {
        let snapshot = Self::snapshot(host, path)?;
        let targets = self.resolve_at(host, &snapshot, offset);

        Ok(targets
            .into_iter()
            .map(|t| {
                let symbols = t.snapshot.symbols();
                let decl = &symbols.declarations[t.index];
                DefinitionEntry {
                    path: t.snapshot.path.clone(),
                    offset: decl.name_range.start,
                    kind: decl.kind,
                    name: decl.name.clone(),
                    container_name: symbols.container_name(t.index),
                }
            })
            .collect())
    }

    fn find_references(
        &self,
        host: &dyn SourceHost,
        path: &Path,
        offset: usize,
    ) -> Result<Vec<ReferenceEntry>> {
        let snapshot = Self::snapshot(host, path)?;
        let targets = self.resolve_at(host, &snapshot, offset);
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let target_keys: HashSet<(PathBuf, usize)> = targets.iter().map(Target::key).collect();
        let names: HashSet<String> = targets
            .iter()
            .map(|t| t.snapshot.symbols().declarations[t.index].name.clone())
            .collect();

        let mut refs = Vec::new();
        for file in host.file_names() {
            let Some(candidate) = host.snapshot(&file) else {
                continue;
            };
            let symbols = candidate.symbols();

            // Local aliases of the names we look for (`import { a as b }`).
            let mut local_names = names.clone();
            local_names.extend(
                symbols
                    .declarations
                    .iter()
                    .filter(|d| {
                        d.kind == SymbolKind::Import
                            && d.imported_name.as_ref().is_some_and(|n| names.contains(n))
                    })
                    .map(|d| d.name.clone()),
            );

            for occurrence in &symbols.occurrences {
                if !local_names.contains(&occurrence.name) {
                    continue;
                }
                let resolved = self.resolve(host, &candidate, symbols.resolve_local(occurrence));
                if !resolved.iter().any(|t| target_keys.contains(&t.key())) {
                    continue;
                }
                let is_declaration = occurrence
                    .declaration
                    .is_some_and(|idx| target_keys.contains(&(file.clone(), idx)));
                refs.push(ReferenceEntry {
                    path: file.clone(),
                    offset: occurrence.range.start,
                    is_write: occurrence.is_write,
                    is_declaration,
                });
            }
        }

        refs.sort_by(|a, b| (&a.path, a.offset).cmp(&(&b.path, b.offset)));
        refs.dedup_by(|a, b| a.path == b.path && a.offset == b.offset);
        Ok(refs)
    }

    fn outline(&self, host: &dyn SourceHost, path: &Path) -> Result<Vec<OutlineEntry>> {
        let snapshot = Self::snapshot(host, path)?;
        let symbols = snapshot.symbols();

        fn convert(tree: &[OutlineTree], decls: &[Declaration]) -> Vec<OutlineEntry> {
            tree.iter()
                .map(|node| {
                    let decl = &decls[node.index];
                    OutlineEntry {
                        name: decl.name.clone(),
                        kind: decl.kind,
                        span_start: decl.start,
                        children: convert(&node.children, decls),
                    }
                })
                .collect()
        }

        Ok(convert(&symbols.outline(), &symbols.declarations))
    }
}
