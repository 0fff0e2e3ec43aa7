//! In-memory text buffers.
//!
//! A [`Document`] is addressable both by byte offset and by LSP
//! (line, character) positions, where characters count Unicode scalar
//! values. The line index is maintained incrementally: an edit only rescans
//! from the first affected line.

use tower_lsp::lsp_types::{Position, Range};

/// A mutable text buffer with a line index.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

/// A slice of a document under the cursor: a shape-id token or a
/// JSON-pointer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId {
    /// Byte span of the token.
    pub span: std::ops::Range<usize>,
    pub text: String,
}

fn is_shape_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '#' | '$')
}

impl Document {
    #[must_use]
    pub fn of(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        push_line_starts(&mut line_starts, &text, 0);
        Self { text, line_starts }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn copy_text(&self) -> String {
        self.text.clone()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Apply an edit. A `None` range replaces the entire buffer.
    pub fn apply_edit(&mut self, range: Option<Range>, new_text: &str) {
        let Some(range) = range else {
            self.text = new_text.to_string();
            self.line_starts = vec![0];
            push_line_starts(&mut self.line_starts, new_text, 0);
            return;
        };
        let Some(start) = self.index_of_position(range.start) else {
            return;
        };
        let Some(end) = self.index_of_position(range.end) else {
            return;
        };
        if start > end {
            return;
        }

        self.text.replace_range(start..end, new_text);

        // Lines before the edit are untouched; rebuild the index from the
        // line containing the edit start.
        let first_dirty = self.line_of_offset(start);
        let line_start = self.line_starts[first_dirty];
        self.line_starts.truncate(first_dirty + 1);
        push_line_starts(&mut self.line_starts, &self.text[line_start..], line_start);
    }

    /// Byte offset of an LSP position, or `None` when out of bounds. A
    /// position one past the last character of a line (or the document) is
    /// in bounds.
    #[must_use]
    pub fn index_of_position(&self, position: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line as usize)?;
        let line = self.line_slice(position.line as usize);
        if position.character == 0 {
            return Some(line_start);
        }
        let mut remaining = position.character as usize;
        for (idx, c) in line.char_indices() {
            if c == '\n' {
                break;
            }
            remaining -= 1;
            if remaining == 0 {
                return Some(line_start + idx + c.len_utf8());
            }
        }
        (remaining == 0).then_some(line_start + line.len())
    }

    /// The LSP position of a byte offset, or `None` when out of bounds.
    #[must_use]
    pub fn position_of_index(&self, offset: usize) -> Option<Position> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return None;
        }
        let line = self.line_of_offset(offset);
        let character = self.text[self.line_starts[line]..offset].chars().count();
        Some(Position::new(line as u32, character as u32))
    }

    /// The character offset of the end of `line`, excluding its terminator.
    #[must_use]
    pub fn line_end(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize)?;
        let slice = self.line_slice(line as usize);
        let content = slice.strip_suffix('\n').unwrap_or(slice);
        let content = content.strip_suffix('\r').unwrap_or(content);
        Some(content.chars().count() as u32)
    }

    /// The position one past the last character of the document.
    #[must_use]
    pub fn end(&self) -> Position {
        let last_line = self.line_starts.len() - 1;
        let character = self.text[self.line_starts[last_line]..].chars().count();
        Position::new(last_line as u32, character as u32)
    }

    /// The shape-id token under `position`, when there is one.
    #[must_use]
    pub fn copy_document_id(&self, position: Position) -> Option<DocumentId> {
        let offset = self.index_of_position(position)?;

        let mut start = offset;
        for (idx, c) in self.text[..offset].char_indices().rev() {
            if !is_shape_id_char(c) {
                break;
            }
            start = idx;
        }
        let mut end = offset;
        for (idx, c) in self.text[offset..].char_indices() {
            if !is_shape_id_char(c) {
                break;
            }
            end = offset + idx + c.len_utf8();
        }

        if start == end {
            return None;
        }
        Some(DocumentId {
            span: start..end,
            text: self.text[start..end].to_string(),
        })
    }

    fn line_of_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        }
    }

    fn line_slice(&self, line: usize) -> &str {
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len());
        &self.text[start..end]
    }
}

fn push_line_starts(starts: &mut Vec<usize>, text: &str, base: usize) {
    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(base + idx + 1);
        }
    }
}
