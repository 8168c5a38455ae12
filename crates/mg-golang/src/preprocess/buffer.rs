//! Line-oriented edit buffer the text passes share.
//!
//! Each line remembers the original source position it came from, so a pass
//! running after earlier rewrites can still report and map positions against
//! the user's file. Every edit keeps the mapping table in sync.

use mg_core::mappings::MappingTable;
use mg_core::span::Pos;

#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    /// Position of this line's first column in the original file; `None`
    /// for synthesized lines.
    pub origin: Option<Pos>,
}

impl Line {
    pub fn original(text: impl Into<String>, line: u32) -> Line {
        Line {
            text: text.into(),
            origin: Some(Pos::new(line, 1)),
        }
    }

    pub fn synthesized(text: impl Into<String>) -> Line {
        Line {
            text: text.into(),
            origin: None,
        }
    }
}

#[derive(Debug)]
pub struct SourceBuffer {
    lines: Vec<Line>,
}

impl SourceBuffer {
    pub fn from_source(source: &str) -> SourceBuffer {
        let lines = source
            .lines()
            .enumerate()
            .map(|(idx, text)| Line::original(text, idx as u32 + 1))
            .collect();
        SourceBuffer { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, idx: usize) -> &Line {
        &self.lines[idx]
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }

    /// Replace `removed` lines starting at index `start` with `replacement`,
    /// dropping mappings into the removed range and shifting later ones.
    pub fn splice(
        &mut self,
        start: usize,
        removed: usize,
        replacement: Vec<Line>,
        mappings: &mut MappingTable,
    ) {
        let added = replacement.len();
        mappings.adjust_for_splice(start as u32 + 1, removed as u32, added as u32);
        self.lines.splice(start..start + removed, replacement);
    }

    /// Insert lines before index `at`, shifting mappings at or after it.
    pub fn insert(&mut self, at: usize, inserted: Vec<Line>, mappings: &mut MappingTable) {
        mappings.adjust_for_insertion(at as u32 + 1, inserted.len() as u32);
        self.lines.splice(at..at, inserted);
    }

    /// Index of the line carrying the brace that closes the first block
    /// opened on line `start`. `None` when unbalanced.
    pub fn block_end(&self, start: usize) -> Option<usize> {
        let mut text = String::new();
        let mut line_starts = Vec::new();
        for line in &self.lines[start..] {
            line_starts.push(text.len());
            text.push_str(&line.text);
            text.push('\n');
        }
        let mask = crate::preprocess::scan::CodeMask::compute(&text);
        let open = text.find('{')?;
        let close = crate::preprocess::scan::find_matching(&text, &mask, open)?;
        let line_offset = match line_starts.binary_search(&close) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        Some(start + line_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splice_rewrites_lines_and_mappings() {
        let mut buffer = SourceBuffer::from_source("a\nb\nc\n");
        let mut mappings = MappingTable::new();
        mappings.record(Pos::new(2, 1), Pos::new(2, 1), 1, None);
        mappings.record(Pos::new(3, 1), Pos::new(3, 1), 1, None);

        buffer.splice(
            1,
            1,
            vec![Line::synthesized("x"), Line::synthesized("y")],
            &mut mappings,
        );

        assert_eq!(buffer.text(), "a\nx\ny\nc\n");
        // The mapping into the replaced line is gone; the later one shifted.
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings.entries()[0].generated, Pos::new(4, 1));
        assert_eq!(buffer.line(3).origin, Some(Pos::new(3, 1)));
    }
}
