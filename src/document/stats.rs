//! Text statistics for the word/character counter.

// ─────────────────────────────────────────────────────────────────────────────
// TextStats
// ─────────────────────────────────────────────────────────────────────────────

/// Counts shown next to the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    /// Number of characters including whitespace
    pub characters: usize,
    /// Number of words (runs of non-whitespace characters)
    pub words: usize,
    /// Number of lines (an empty document has one)
    pub lines: usize,
}

impl TextStats {
    /// Calculate statistics in a single pass over `text`.
    pub fn from_text(text: &str) -> Self {
        let mut stats = Self {
            lines: 1,
            ..Self::default()
        };
        let mut in_word = false;

        for ch in text.chars() {
            stats.characters += 1;
            if ch == '\n' {
                stats.lines += 1;
            }
            if ch.is_whitespace() {
                in_word = false;
            } else if !in_word {
                in_word = true;
                stats.words += 1;
            }
        }

        stats
    }

    /// Counter label, e.g. `"12 characters, 3 words"`.
    pub fn format_counter(&self) -> String {
        format!("{} characters, {} words", self.characters, self.words)
    }
}
