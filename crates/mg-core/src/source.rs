use crate::span::{FileId, Pos, Span};
use std::path::PathBuf;
use std::sync::Arc;

/// A single source file with a precomputed line index.
///
/// Owned by the per-file compilation context. No process-wide file
/// registry exists; concurrent per-file compilations share nothing.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: Arc<str>,
    line_starts: Arc<Vec<usize>>,
}

impl SourceFile {
    pub fn new(id: FileId, path: impl Into<PathBuf>, source: &str) -> SourceFile {
        SourceFile {
            id,
            path: path.into(),
            source: Arc::from(source),
            line_starts: Arc::new(compute_line_starts(source)),
        }
    }

    pub fn line_col(&self, offset: u32) -> Pos {
        let offset = offset as usize;
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(idx).copied().unwrap_or(0);
        Pos {
            line: (idx + 1) as u32,
            column: (offset.saturating_sub(line_start) + 1) as u32,
        }
    }

    pub fn span_pos(&self, span: Span) -> Pos {
        self.line_col(span.lo)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }
        let idx = line - 1;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or_else(|| self.source.len());
        self.source
            .get(start..end)
            .map(|s| s.trim_end_matches('\n'))
    }

    pub fn offset_for_pos(&self, pos: Pos) -> Option<u32> {
        if pos.line == 0 || pos.column == 0 {
            return None;
        }
        let start = *self.line_starts.get(pos.line as usize - 1)?;
        let offset = start.saturating_add(pos.column as usize - 1);
        if offset > self.source.len() {
            return None;
        }
        Some(offset as u32)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_col_round_trip() {
        let file = SourceFile::new(1, "a.mgo", "alpha\nbeta\n\ngamma");
        assert_eq!(file.line_col(0), Pos::new(1, 1));
        assert_eq!(file.line_col(6), Pos::new(2, 1));
        assert_eq!(file.line_col(8), Pos::new(2, 3));
        assert_eq!(file.line_col(11), Pos::new(3, 1));
        assert_eq!(file.line_col(12), Pos::new(4, 1));

        assert_eq!(file.offset_for_pos(Pos::new(2, 3)), Some(8));
        assert_eq!(file.offset_for_pos(Pos::new(0, 1)), None);
    }

    #[test]
    fn line_text_trims_newline() {
        let file = SourceFile::new(1, "a.mgo", "alpha\nbeta\n");
        assert_eq!(file.line_text(1), Some("alpha"));
        assert_eq!(file.line_text(2), Some("beta"));
        assert_eq!(file.line_text(0), None);
        assert_eq!(file.line_count(), 3);
    }
}
