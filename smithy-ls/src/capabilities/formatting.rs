//! Formatting: whitespace normalisation.
//!
//! Strips trailing whitespace from every line and collapses trailing blank
//! lines to a single newline. Edits are minimal so the client preserves
//! cursor state.

use tower_lsp::lsp_types::{Position, Range, TextEdit};

use crate::document::Document;

#[must_use]
pub fn format(document: &Document) -> Vec<TextEdit> {
    let text = document.text();
    let mut edits = Vec::new();

    for (line_number, line) in text.lines().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.len() < line.len() {
            edits.push(TextEdit {
                range: Range::new(
                    Position::new(line_number as u32, trimmed.chars().count() as u32),
                    Position::new(line_number as u32, line.chars().count() as u32),
                ),
                new_text: String::new(),
            });
        }
    }

    // One trailing newline, no more, no fewer.
    let body_end = text.trim_end_matches(['\n', '\r']).len();
    if body_end == text.len() {
        if !text.is_empty() {
            let end = document.end();
            edits.push(TextEdit {
                range: Range::new(end, end),
                new_text: "\n".to_string(),
            });
        }
    } else {
        let newline_run = &text[body_end..];
        if newline_run != "\n" && newline_run != "\r\n" {
            let keep = if newline_run.starts_with("\r\n") { 2 } else { 1 };
            if let Some(start) = document.position_of_index(body_end + keep) {
                edits.push(TextEdit {
                    range: Range::new(start, document.end()),
                    new_text: String::new(),
                });
            }
        }
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(text: &str) -> String {
        let document = Document::of(text);
        let mut edits = format(&document);
        // Apply back-to-front so earlier ranges stay valid.
        edits.sort_by_key(|edit| std::cmp::Reverse((edit.range.start.line, edit.range.start.character)));
        let mut document = document;
        for edit in edits {
            document.apply_edit(Some(edit.range), &edit.new_text);
        }
        document.copy_text()
    }

    #[test]
    fn strips_trailing_whitespace() {
        assert_eq!(apply("string Foo  \nstring Bar\t\n"), "string Foo\nstring Bar\n");
    }

    #[test]
    fn normalizes_trailing_newlines() {
        assert_eq!(apply("string Foo\n\n\n"), "string Foo\n");
        assert_eq!(apply("string Foo"), "string Foo\n");
    }

    #[test]
    fn clean_text_needs_no_edits() {
        let document = Document::of("namespace com.foo\nstring Foo\n");
        assert!(format(&document).is_empty());
    }
}
