//! HTML Export Generation
//!
//! Wraps the rendered document in a complete HTML page: a standalone themed
//! document for saving, or a print-styled document for the platform's print
//! (and save-as-PDF) flow.

use super::options::ExportOptions;
use crate::config::Theme;
use crate::markdown::{html_escape, SyntectHighlighter};

// ─────────────────────────────────────────────────────────────────────────────
// HTML Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Generate a complete, standalone HTML document around `body_html`.
pub fn generate_html_document(body_html: &str, options: &ExportOptions) -> String {
    let syntax_css = if options.include_syntax_css {
        SyntectHighlighter::shared().theme_css(options.theme)
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="marklive">
    <title>{title}</title>
    <style>
{base_css}

{theme_css}

{syntax_css}
    </style>
</head>
<body>
    <article class="markdown-body">
{body}
    </article>
</body>
</html>"#,
        title = html_escape(&options.title),
        base_css = BASE_CSS,
        theme_css = generate_theme_css(options.theme),
        syntax_css = syntax_css,
        body = body_html,
    )
}

/// Generate the detached print document.
///
/// Diagrams stay vector SVG, which print engines handle directly.
pub fn generate_print_document(body_html: &str, title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
{print_css}
    </style>
</head>
<body>
{body}
</body>
</html>"#,
        title = html_escape(title),
        print_css = PRINT_CSS,
        body = body_html,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// CSS Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Base CSS for markdown rendering (layout, typography).
const BASE_CSS: &str = r#"
*, *::before, *::after {
    box-sizing: border-box;
}

body {
    margin: 0;
    padding: 0;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
    font-size: 16px;
    line-height: 1.6;
}

.markdown-body {
    max-width: 900px;
    margin: 0 auto;
    padding: 32px 24px;
}

.markdown-body h1,
.markdown-body h2,
.markdown-body h3,
.markdown-body h4,
.markdown-body h5,
.markdown-body h6 {
    margin-top: 24px;
    margin-bottom: 16px;
    font-weight: 600;
    line-height: 1.25;
}

.markdown-body h1 { font-size: 2em; border-bottom: 1px solid; padding-bottom: 0.3em; }
.markdown-body h2 { font-size: 1.5em; border-bottom: 1px solid; padding-bottom: 0.3em; }
.markdown-body h3 { font-size: 1.25em; }

.markdown-body ul,
.markdown-body ol {
    padding-left: 2em;
}

.markdown-body blockquote {
    margin: 0 0 16px 0;
    padding: 0 1em;
    border-left: 4px solid;
}

.markdown-body code {
    font-family: 'JetBrains Mono', 'Fira Code', 'Consolas', 'Monaco', monospace;
    font-size: 0.9em;
    padding: 0.2em 0.4em;
    border-radius: 4px;
}

.markdown-body pre {
    padding: 16px;
    overflow: auto;
    border-radius: 6px;
    line-height: 1.45;
}

.markdown-body pre code {
    padding: 0;
    background: transparent;
}

.markdown-body table {
    border-collapse: collapse;
    margin-bottom: 16px;
}

.markdown-body th,
.markdown-body td {
    padding: 8px 12px;
    border: 1px solid;
}

.markdown-body img {
    max-width: 100%;
    height: auto;
}

.markdown-body .math-block {
    overflow-x: auto;
    margin: 16px 0;
    text-align: center;
}

.markdown-body .mermaid {
    margin: 16px 0;
    text-align: center;
}

.markdown-body .math-error,
.markdown-body .mermaid-error {
    padding: 8px 12px;
    border-left: 4px solid #d73a49;
    color: #d73a49;
    font-family: monospace;
}
"#;

/// Print CSS for the detached print document.
const PRINT_CSS: &str = r#"
body { font-family: system-ui, sans-serif; line-height: 1.6; padding: 2cm; }
pre { background: #f5f5f5; padding: 1em; border-radius: 4px; overflow-x: auto; }
code { background: #f5f5f5; padding: 0.2em 0.4em; border-radius: 3px; }
img, svg { max-width: 100%; }
.math-error, .mermaid-error { color: #d73a49; }
@media print { @page { margin: 2cm; } }
"#;

/// Preview colors for one theme.
struct Palette {
    background: &'static str,
    text: &'static str,
    border: &'static str,
    link: &'static str,
    code_bg: &'static str,
    blockquote: &'static str,
}

const LIGHT: Palette = Palette {
    background: "#ffffff",
    text: "#24292e",
    border: "#e1e4e8",
    link: "#0366d6",
    code_bg: "#f6f8fa",
    blockquote: "#6a737d",
};

const DARK: Palette = Palette {
    background: "#1e1e1e",
    text: "#d4d4d4",
    border: "#3c3c3c",
    link: "#4fc1ff",
    code_bg: "#2d2d2d",
    blockquote: "#9e9e9e",
};

/// Theme-specific CSS.
fn generate_theme_css(theme: Theme) -> String {
    let colors = if theme.is_dark() { &DARK } else { &LIGHT };

    format!(
        r#"
:root {{
    color-scheme: {color_scheme};
}}

body {{
    background-color: {bg};
    color: {text};
}}

.markdown-body h1,
.markdown-body h2,
.markdown-body th,
.markdown-body td {{
    border-color: {border};
}}

.markdown-body a {{
    color: {link};
}}

.markdown-body blockquote {{
    color: {blockquote};
    border-left-color: {border};
}}

.markdown-body code,
.markdown-body pre {{
    background-color: {code_bg};
}}
"#,
        color_scheme = theme.name(),
        bg = colors.background,
        text = colors.text,
        border = colors.border,
        link = colors.link,
        blockquote = colors.blockquote,
        code_bg = colors.code_bg,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
