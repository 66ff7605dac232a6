use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::context::AnalysisContext;
use super::discovery::is_ignored_path;
use crate::types::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
        }
    }
}

/// Splits a raw notify event into per-path events. Renames become a removal
/// of the old path and a creation of the new one.
pub fn classify(event: &Event) -> Vec<WatchEvent> {
    match &event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(WatchEvent::Created).collect(),
        EventKind::Remove(_) => event.paths.iter().cloned().map(WatchEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                if p.exists() {
                    WatchEvent::Created(p.clone())
                } else {
                    WatchEvent::Removed(p.clone())
                }
            })
            .collect(),
        EventKind::Modify(_) => event.paths.iter().cloned().map(WatchEvent::Modified).collect(),
        _ => Vec::new(),
    }
}

/// Applies one event to the owning context. Returns true if the context changed.
pub fn apply_event(context: &AnalysisContext, event: &WatchEvent) -> bool {
    let path = event.path();
    if is_ignored_path(context.root(), path) {
        return false;
    }

    match event {
        WatchEvent::Created(_) | WatchEvent::Modified(_) => {
            if path.is_dir() {
                return false;
            }
            if !(context.is_known(path) || context.project().accepts(path)) {
                return false;
            }
            let version = context.bump_version(path);
            debug!(file = %path.display(), version, "File changed");
            true
        }
        WatchEvent::Removed(_) => {
            let removed = context.remove_file(path);
            if removed {
                debug!(file = %path.display(), "File removed");
            }
            removed
        }
    }
}

/// Caps the number of projects that get a live watcher.
#[derive(Debug)]
pub struct WatchBudget {
    limit: usize,
    used: AtomicUsize,
}

impl WatchBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn release(&self) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| used.checked_sub(1));
    }

    pub fn in_use(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }
}

/// Recursive watch over one project root. Events are applied in arrival
/// order by a single task, so version bumps for a file never interleave.
/// Each batch is applied on the blocking pool and awaited before the next.
pub struct ProjectWatcher {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    cancel_tx: Option<mpsc::Sender<()>>,
}

impl ProjectWatcher {
    /// Must be called from within a tokio runtime.
    pub fn start(context: Arc<AnalysisContext>) -> Result<Self> {
        let root = context.root().to_path_buf();
        let (tx, mut rx) = mpsc::channel::<Event>(1024);
        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);

        let setup_error = |e: notify::Error| AppError::WatchSetup {
            root: root.clone(),
            message: e.to_string(),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })
        .map_err(setup_error)?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(setup_error)?;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = rx.recv() => {
                        let Some(event) = received else { break };
                        let changes = classify(&event);
                        if changes.is_empty() {
                            continue;
                        }
                        // Bumps take the files write lock, which waits for running queries.
                        let target = context.clone();
                        let applied = tokio::task::spawn_blocking(move || {
                            for change in &changes {
                                apply_event(&target, change);
                            }
                        })
                        .await;
                        if let Err(e) = applied {
                            warn!(project = %context.root().display(), error = %e, "Failed to apply file events");
                        }
                    }
                    _ = cancel_rx.recv() => break,
                }
            }
            debug!(project = %context.root().display(), "Watcher task finished");
        });

        info!(project = %root.display(), "Watching project");
        Ok(Self {
            root,
            watcher: Some(watcher),
            cancel_tx: Some(cancel_tx),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stop(&mut self) {
        self.watcher = None;
        if let Some(cancel) = self.cancel_tx.take() {
            let _ = cancel.try_send(());
        }
        debug!(project = %self.root.display(), "Stopped watcher");
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        if self.watcher.is_some() {
            self.stop();
        }
    }
}
