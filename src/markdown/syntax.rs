//! Syntax Highlighting Module
//!
//! This module integrates syntect for fenced code blocks. Highlighting emits
//! class-based HTML (`<span class="hl-...">`), so the markup does not depend
//! on the current theme; the matching stylesheet comes from [`theme_css`].

use super::services::{CodeHighlighter, ExtensionError};
use crate::config::Theme;
use log::{debug, warn};
use std::sync::{Arc, OnceLock};
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Default dark theme name from syntect's built-in themes
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";

/// Default light theme name from syntect's built-in themes
pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";

/// Class style shared by the generated markup and the stylesheet.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

// ─────────────────────────────────────────────────────────────────────────────
// Syntax Highlighter
// ─────────────────────────────────────────────────────────────────────────────

/// Syntax highlighter that caches syntect sets for performance.
///
/// Loading the sets is expensive; use [`SyntectHighlighter::shared`] rather
/// than constructing a new one per document.
pub struct SyntectHighlighter {
    /// Loaded syntax definitions
    syntax_set: SyntaxSet,
    /// Loaded color themes (only used for stylesheets)
    theme_set: ThemeSet,
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

static HIGHLIGHTER: OnceLock<Arc<SyntectHighlighter>> = OnceLock::new();

impl SyntectHighlighter {
    /// Create a new syntax highlighter with default syntax and theme sets.
    pub fn new() -> Self {
        debug!("Loading syntect syntax and theme sets");
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        debug!(
            "Loaded {} syntaxes and {} themes",
            syntax_set.syntaxes().len(),
            theme_set.themes.len()
        );
        Self {
            syntax_set,
            theme_set,
        }
    }

    /// The process-wide highlighter, loaded on first use.
    pub fn shared() -> Arc<SyntectHighlighter> {
        HIGHLIGHTER
            .get_or_init(|| Arc::new(SyntectHighlighter::new()))
            .clone()
    }

    /// Stylesheet for the highlight classes in the given theme.
    pub fn theme_css(&self, theme: Theme) -> String {
        let name = if theme.is_dark() {
            DEFAULT_DARK_THEME
        } else {
            DEFAULT_LIGHT_THEME
        };
        let Some(syntect_theme) = self.theme_set.themes.get(name) else {
            warn!("Syntax theme {} is not bundled", name);
            return String::new();
        };
        match css_for_theme_with_class_style(syntect_theme, CLASS_STYLE) {
            Ok(css) => css,
            Err(e) => {
                warn!("Failed to generate syntax CSS for {}: {}", name, e);
                String::new()
            }
        }
    }

    /// Find syntax definition for a language identifier.
    ///
    /// Tries multiple strategies:
    /// 1. By extension (e.g., "rs" -> Rust)
    /// 2. By name (e.g., "Rust" -> Rust)
    /// 3. Case-insensitive name
    fn find_syntax_for_language(&self, language: &str) -> Option<&SyntaxReference> {
        if language.is_empty() {
            return None;
        }

        let lang_lower = language.to_lowercase();

        // Map common language aliases to extensions
        let extension = match lang_lower.as_str() {
            "rust" | "rs" => "rs",
            "python" | "py" => "py",
            "javascript" | "js" | "node" => "js",
            "typescript" | "ts" => "ts",
            "c" | "h" => "c",
            "cpp" | "c++" | "cxx" => "cpp",
            "csharp" | "c#" | "cs" => "cs",
            "java" => "java",
            "go" | "golang" => "go",
            "ruby" | "rb" => "rb",
            "php" => "php",
            "scala" => "scala",
            "html" | "htm" => "html",
            "css" => "css",
            "json" => "json",
            "yaml" | "yml" => "yaml",
            "xml" | "svg" => "xml",
            "markdown" | "md" => "md",
            "sql" => "sql",
            "shell" | "sh" | "bash" | "zsh" => "sh",
            "makefile" | "make" => "Makefile",
            "lua" => "lua",
            "perl" | "pl" => "pl",
            "r" => "r",
            "haskell" | "hs" => "hs",
            "erlang" | "erl" => "erl",
            "clojure" | "clj" => "clj",
            "diff" | "patch" => "diff",
            other => other,
        };

        if let Some(syntax) = self.syntax_set.find_syntax_by_extension(extension) {
            return Some(syntax);
        }

        if let Some(syntax) = self.syntax_set.find_syntax_by_name(language) {
            return Some(syntax);
        }

        self.syntax_set
            .syntaxes()
            .iter()
            .find(|syntax| syntax.name.to_lowercase() == lang_lower)
    }
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight(&self, source: &str, language: &str) -> Result<Option<String>, ExtensionError> {
        let Some(syntax) = self.find_syntax_for_language(language) else {
            debug!("No syntax found for language: {}", language);
            return Ok(None);
        };

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, CLASS_STYLE);
        for line in LinesWithEndings::from(source) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| ExtensionError::Highlight(e.to_string()))?;
        }
        Ok(Some(generator.finalize()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust_code() {
        let highlighter = SyntectHighlighter::shared();
        let html = highlighter
            .highlight("fn main() {}\n", "rust")
            .unwrap()
            .unwrap();
        assert!(html.contains("<span class=\"hl-"));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_highlight_escapes_markup() {
        let highlighter = SyntectHighlighter::shared();
        let html = highlighter
            .highlight("let s = \"<script>\";\n", "js")
            .unwrap()
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_highlight_unknown_language() {
        let highlighter = SyntectHighlighter::shared();
        assert_eq!(highlighter.highlight("x", "unknownlang123").unwrap(), None);
        assert_eq!(highlighter.highlight("x", "").unwrap(), None);
    }

    #[test]
    fn test_language_aliases() {
        let highlighter = SyntectHighlighter::shared();
        let aliases = vec![("rs", "rust"), ("py", "python"), ("js", "javascript")];

        for (alias, canonical) in aliases {
            let syntax1 = highlighter.find_syntax_for_language(alias);
            let syntax2 = highlighter.find_syntax_for_language(canonical);
            if let (Some(a), Some(b)) = (syntax1, syntax2) {
                assert_eq!(a.name, b.name, "Alias {} should map to {}", alias, canonical);
            }
        }
    }

    #[test]
    fn test_theme_css_uses_prefixed_classes() {
        let highlighter = SyntectHighlighter::shared();
        let light = highlighter.theme_css(Theme::Light);
        let dark = highlighter.theme_css(Theme::Dark);
        assert!(light.contains(".hl-"));
        assert_ne!(light, dark);
    }

    #[test]
    fn test_shared_is_single_instance() {
        let a = SyntectHighlighter::shared();
        let b = SyntectHighlighter::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
