mod chroma;
mod memory;
mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use chroma::{ChromaStore, DEFAULT_DATABASE, DEFAULT_TENANT};
pub use memory::{cosine_distance, InMemoryVectorStore};
pub use traits::{UpsertBatch, VectorStore};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    Chroma,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "chroma" => Ok(Self::Chroma),
            _ => Err(format!("Unknown vector store: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Chroma => write!(f, "chroma"),
        }
    }
}

/// Where a Chroma collection lives.
#[derive(Debug, Clone, Copy)]
pub struct ChromaTarget<'a> {
    pub url: &'a str,
    pub tenant: &'a str,
    pub database: &'a str,
    pub collection: &'a str,
}

pub fn build_store(
    kind: StoreKind,
    chroma: ChromaTarget<'_>,
    timeout: Duration,
) -> Result<Arc<dyn VectorStore>> {
    Ok(match kind {
        StoreKind::Memory => Arc::new(InMemoryVectorStore::new()),
        StoreKind::Chroma => Arc::new(
            ChromaStore::new(chroma.url, chroma.collection, timeout)?
                .with_database(chroma.tenant, chroma.database),
        ),
    })
}
