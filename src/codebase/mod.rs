pub mod chunker;
pub mod indexer;
pub mod scanner;

pub use chunker::chunk_file;
pub use indexer::{DirectoryIndexReport, FileIndexReport, SemanticIndexer};
pub use scanner::{is_code_file, scan_directory};
