use std::path::Path;

use crate::types::CodeChunk;

pub const CHUNK_LINES: usize = 50;

/// Splits a file into consecutive `CHUNK_LINES`-line windows. Ids are
/// `"{path}#chunk{n}"` so re-indexing a file overwrites its old chunks.
pub fn chunk_file(path: &Path, content: &str) -> Vec<CodeChunk> {
    let source = path.to_string_lossy().to_string();
    let lines: Vec<&str> = content.split('\n').collect();

    lines
        .chunks(CHUNK_LINES)
        .enumerate()
        .map(|(index, window)| {
            let start = index * CHUNK_LINES;
            CodeChunk {
                id: format!("{}#chunk{}", source, index),
                source: source.clone(),
                chunk_index: index,
                content: window.join("\n"),
                start_line: (start + 1) as u32,
                end_line: (start + window.len()) as u32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_boundaries() {
        let content: Vec<String> = (1..=120).map(|i| format!("line {i}")).collect();
        let chunks = chunk_file(Path::new("/p/a.ts"), &content.join("\n"));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "/p/a.ts#chunk0");
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (51, 100));
        assert_eq!(chunks[2].content.lines().count(), 20);
        assert!(chunks[2].content.starts_with("line 101"));
        assert_eq!(chunks[2].metadata()["chunkIndex"], 2);
    }

    #[test]
    fn test_empty_file_is_one_chunk() {
        let chunks = chunk_file(Path::new("/p/empty.ts"), "");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "");
    }
}
