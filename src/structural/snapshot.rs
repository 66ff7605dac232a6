use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::discovery::detect_language;
use super::parser::{CodeParser, FileSymbols};
use super::position::LineIndex;
use crate::types::Language;

/// Immutable view of one file at one version. Parsing is deferred until a
/// query needs the symbols.
#[derive(Debug)]
pub struct SourceSnapshot {
    pub path: PathBuf,
    pub version: u64,
    pub text: String,
    pub line_index: LineIndex,
    pub language: Language,
    symbols: OnceLock<FileSymbols>,
}

impl SourceSnapshot {
    pub fn new(path: &Path, version: u64, text: String) -> Self {
        Self {
            path: path.to_path_buf(),
            version,
            line_index: LineIndex::new(&text),
            language: detect_language(path),
            text,
            symbols: OnceLock::new(),
        }
    }

    pub fn symbols(&self) -> &FileSymbols {
        self.symbols
            .get_or_init(|| CodeParser::parse_file(&self.path, &self.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_are_parsed_once() {
        let snapshot = SourceSnapshot::new(Path::new("/p/a.ts"), 3, "function f() {}".into());
        assert_eq!(snapshot.language, Language::TypeScript);
        let first = snapshot.symbols() as *const FileSymbols;
        let second = snapshot.symbols() as *const FileSymbols;
        assert_eq!(first, second);
        assert_eq!(snapshot.symbols().declarations[0].name, "f");
    }
}
