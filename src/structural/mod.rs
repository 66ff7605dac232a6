//! Structural code intelligence: per-project analysis contexts kept current
//! by filesystem watchers, with definition, reference and outline queries.

pub mod analysis;
pub mod context;
pub mod discovery;
pub mod engine;
pub mod parser;
pub mod pool;
pub mod position;
pub mod project;
pub mod router;
pub mod snapshot;
pub mod watcher;

pub use analysis::{AnalysisEngine, SourceHost, TreeSitterAnalysis};
pub use context::AnalysisContext;
pub use discovery::discover;
pub use engine::{EngineOptions, InitReport, StructuralEngine};
pub use pool::ContextPool;
pub use project::Project;
pub use router::RootIndex;
