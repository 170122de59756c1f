//! The source document: raw Markdown plus cursor/selection state.
//!
//! Offsets are byte offsets into the UTF-8 text. Every incoming offset is
//! clamped to the text length and moved down to a character boundary, so
//! callers can pass positions from any editing surface without panicking.

/// A selection range `[start, end)` in byte offsets. `start == end` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// A collapsed selection (caret) at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Whether the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The mutable text buffer behind the editor.
///
/// `revision` increases on every mutation; the preview records the revision
/// it was rendered from so staleness is observable.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    text: String,
    selection: Selection,
    revision: u64,
}

impl SourceDocument {
    /// Create a document with the caret at the end of `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            text,
            selection: Selection::caret(end),
            revision: 0,
        }
    }

    /// The raw Markdown text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current selection.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The selected text (empty for a caret).
    pub fn selected_text(&self) -> &str {
        &self.text[self.selection.start..self.selection.end]
    }

    /// Replace the whole text. The caret moves to the end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.selection = Selection::caret(self.text.len());
        self.bump();
    }

    /// Move the selection. Does not count as a mutation.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let a = floor_char_boundary(&self.text, start);
        let b = floor_char_boundary(&self.text, end);
        self.selection = Selection {
            start: a.min(b),
            end: a.max(b),
        };
    }

    /// Wrap the selection in `before`/`after`.
    ///
    /// With a caret, the caret lands between the two inserted parts. With a
    /// selection, the whole wrapped text stays selected.
    pub fn insert_at_cursor(&mut self, before: &str, after: &str) {
        let Selection { start, end } = self.selection;
        let selected = self.text[start..end].to_string();
        let replacement = format!("{before}{selected}{after}");
        self.text.replace_range(start..end, &replacement);

        self.selection = if selected.is_empty() {
            Selection::caret(start + before.len())
        } else {
            Selection {
                start,
                end: start + replacement.len(),
            }
        };
        self.bump();
    }

    /// Replace the byte range `[start, end)` with `replacement`, leaving the
    /// caret after the inserted text.
    pub fn replace_range(&mut self, start: usize, end: usize, replacement: &str) {
        let a = floor_char_boundary(&self.text, start);
        let b = floor_char_boundary(&self.text, end).max(a);
        self.text.replace_range(a..b, replacement);
        self.selection = Selection::caret(a + replacement.len());
        self.bump();
    }

    /// Overwrite a single ASCII byte in place, keeping the selection.
    ///
    /// Used for task-marker write-back, where the selection must not jump.
    pub(crate) fn overwrite_ascii(&mut self, offset: usize, ch: char) -> bool {
        if !ch.is_ascii() || offset >= self.text.len() || !self.text.is_char_boundary(offset) {
            return false;
        }
        let current_len = self.text[offset..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0);
        if current_len != 1 {
            return false;
        }
        let mut buf = [0u8; 1];
        self.text
            .replace_range(offset..offset + 1, ch.encode_utf8(&mut buf));
        self.bump();
        true
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

/// Largest char boundary `<= index`, clamped to the text length.
pub(crate) fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_places_caret_at_end() {
        let doc = SourceDocument::new("hello");
        assert_eq!(doc.selection(), Selection::caret(5));
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_set_text_bumps_revision() {
        let mut doc = SourceDocument::new("a");
        doc.set_text("b");
        doc.set_text("c");
        assert_eq!(doc.text(), "c");
        assert_eq!(doc.revision(), 2);
    }

    #[test]
    fn test_insert_at_caret_places_cursor_between() {
        let mut doc = SourceDocument::new("Hello world");
        doc.set_selection(6, 6);
        doc.insert_at_cursor("**", "**");
        assert_eq!(doc.text(), "Hello ****world");
        assert_eq!(doc.selection(), Selection::caret(8));
    }

    #[test]
    fn test_insert_wraps_selection() {
        let mut doc = SourceDocument::new("Hello world");
        doc.set_selection(0, 5);
        doc.insert_at_cursor("*", "*");
        assert_eq!(doc.text(), "*Hello* world");
        assert_eq!(doc.selected_text(), "*Hello*");
    }

    #[test]
    fn test_selection_is_clamped_and_ordered() {
        let mut doc = SourceDocument::new("på");
        // byte 2 is inside 'å'
        doc.set_selection(99, 2);
        assert_eq!(doc.selection(), Selection { start: 1, end: 3 });
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_replace_range() {
        let mut doc = SourceDocument::new("one two three");
        doc.replace_range(4, 7, "2");
        assert_eq!(doc.text(), "one 2 three");
        assert_eq!(doc.selection(), Selection::caret(5));
    }

    #[test]
    fn test_overwrite_ascii_keeps_selection() {
        let mut doc = SourceDocument::new("- [ ] a");
        doc.set_selection(1, 2);
        assert!(doc.overwrite_ascii(3, 'x'));
        assert_eq!(doc.text(), "- [x] a");
        assert_eq!(doc.selection(), Selection { start: 1, end: 2 });
        assert!(!doc.overwrite_ascii(100, 'x'));
    }

    #[test]
    fn test_overwrite_refuses_multibyte() {
        let mut doc = SourceDocument::new("å");
        assert!(!doc.overwrite_ascii(0, 'x'));
        assert_eq!(doc.text(), "å");
    }
}
