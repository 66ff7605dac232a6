//! Offset <-> (line, character) translation.
//!
//! Public coordinates are 1-indexed; everything inside the engine works on
//! UTF-8 byte offsets and 0-indexed lines. The conversion happens only here.

use std::path::Path;

use super::analysis::SourceHost;
use crate::types::{AppError, Result};

/// Byte offset of the first character of every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Content of a 0-indexed line without its terminator.
    fn line<'t>(&self, text: &'t str, line: usize) -> (usize, &'t str) {
        let start = self.line_starts[line];
        let end = self.line_starts.get(line + 1).copied().unwrap_or(self.len);
        let content = &text[start..end];
        let content = content.strip_suffix('\n').unwrap_or(content);
        let content = content.strip_suffix('\r').unwrap_or(content);
        (start, content)
    }

    pub fn offset(&self, text: &str, line: u32, character: u32) -> Result<usize> {
        if line == 0 || character == 0 {
            return Err(AppError::out_of_range(
                line,
                character,
                "line and character are 1-indexed",
            ));
        }
        let line0 = (line - 1) as usize;
        if line0 >= self.line_count() {
            return Err(AppError::out_of_range(
                line,
                character,
                format!("file has {} lines", self.line_count()),
            ));
        }

        let (start, content) = self.line(text, line0);
        let char0 = (character - 1) as usize;
        let width = content.chars().count();
        if char0 > width {
            return Err(AppError::out_of_range(
                line,
                character,
                format!("line {line} has {width} characters"),
            ));
        }

        let within = content
            .char_indices()
            .nth(char0)
            .map(|(i, _)| i)
            .unwrap_or(content.len());
        Ok(start + within)
    }

    pub fn line_char(&self, text: &str, offset: usize) -> Result<(u32, u32)> {
        if offset > self.len || !text.is_char_boundary(offset) {
            return Err(AppError::out_of_range(
                0,
                0,
                format!("offset {offset} is not a character boundary in a {}-byte file", self.len),
            ));
        }

        let line0 = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let start = self.line_starts[line0];
        let char0 = text[start..offset].chars().count();
        Ok((line0 as u32 + 1, char0 as u32 + 1))
    }
}

pub fn to_offset(
    host: &dyn SourceHost,
    path: &Path,
    line: u32,
    character: u32,
) -> Result<usize> {
    let snapshot = host
        .snapshot(path)
        .ok_or_else(|| AppError::FileNotTracked(path.to_path_buf()))?;
    snapshot.line_index.offset(&snapshot.text, line, character)
}

pub fn to_line_char(host: &dyn SourceHost, path: &Path, offset: usize) -> Result<(u32, u32)> {
    let snapshot = host
        .snapshot(path)
        .ok_or_else(|| AppError::FileNotTracked(path.to_path_buf()))?;
    snapshot.line_index.line_char(&snapshot.text, offset)
}
