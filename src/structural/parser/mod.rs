pub mod extractor;
pub mod languages;

use std::path::Path;

use crate::structural::discovery::detect_language;

pub use extractor::{ByteRange, Declaration, FileSymbols, LocalResolution, Occurrence, OutlineTree};

use extractor::Extractor;

pub struct CodeParser;

impl CodeParser {
    pub fn parse_file(path: &Path, content: &str) -> FileSymbols {
        let language = detect_language(path);
        let Some(mut extractor) = Extractor::new(language) else {
            return FileSymbols::default();
        };

        extractor.parse(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parser_handles_each_dialect() {
        for (file, src) in [
            ("a.ts", "export function run(): void {}"),
            ("a.tsx", "export function View() { return <div />; }"),
            ("a.js", "function run() {}"),
        ] {
            let symbols = CodeParser::parse_file(&PathBuf::from(file), src);
            assert_eq!(symbols.outline().len(), 1, "{file}");
        }
    }

    #[test]
    fn test_unknown_extension_yields_nothing() {
        let symbols = CodeParser::parse_file(&PathBuf::from("notes.md"), "# hi");
        assert!(symbols.declarations.is_empty());
    }
}
