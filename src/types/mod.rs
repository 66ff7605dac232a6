pub mod code;
pub mod error;
pub mod symbol;

pub use code::{CodeChunk, Language, ScoredCodeChunk};
pub use error::{AppError, Result};
pub use symbol::{DefinitionLocation, OutlineNode, ReferenceLocation, SymbolKind};
