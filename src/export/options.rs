//! Export formats and options.

use crate::config::Theme;

// ─────────────────────────────────────────────────────────────────────────────
// Export Format
// ─────────────────────────────────────────────────────────────────────────────

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// The raw Markdown source
    Markdown,
    /// A standalone HTML file with embedded styles
    #[default]
    Html,
    /// A print-styled HTML document, the route to PDF through the
    /// platform's print dialog
    Print,
}

impl ExportFormat {
    /// Display label for this format.
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Html => "HTML File",
            ExportFormat::Print => "Print / PDF",
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html | ExportFormat::Print => "html",
        }
    }

    /// File name used when the user does not pick one.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown.md",
            ExportFormat::Html => "preview.html",
            ExportFormat::Print => "print.html",
        }
    }

    /// Parse a CLI-style format name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "html" => Some(ExportFormat::Html),
            "print" | "pdf" => Some(ExportFormat::Print),
            _ => None,
        }
    }

    /// All formats.
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Markdown, ExportFormat::Html, ExportFormat::Print]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options for the HTML-based exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Document title
    pub title: String,
    /// Color theme of the standalone document
    pub theme: Theme,
    /// Whether to embed the syntax highlighting stylesheet
    pub include_syntax_css: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: "Markdown Export".to_string(),
            theme: Theme::Light,
            include_syntax_css: true,
        }
    }
}

impl ExportOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(ExportFormat::from_name("md"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::from_name("HTML"), Some(ExportFormat::Html));
        assert_eq!(ExportFormat::from_name("pdf"), Some(ExportFormat::Print));
        assert_eq!(ExportFormat::from_name("docx"), None);
    }

    #[test]
    fn test_format_files() {
        assert_eq!(ExportFormat::Markdown.default_file_name(), "markdown.md");
        assert_eq!(ExportFormat::Html.default_file_name(), "preview.html");
        assert_eq!(ExportFormat::Print.extension(), "html");
        assert_eq!(ExportFormat::all().len(), 3);
    }

    #[test]
    fn test_options_builder() {
        let options = ExportOptions::default()
            .with_title("Notes")
            .with_theme(Theme::Dark);
        assert_eq!(options.title, "Notes");
        assert_eq!(options.theme, Theme::Dark);
        assert!(options.include_syntax_css);
    }
}
