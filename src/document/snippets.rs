//! Programmatic insertion operations on the source document.
//!
//! Each snippet wraps the current selection (or inserts a template at the
//! caret) and places the caret where the author is expected to type next.

use super::source::SourceDocument;

/// Marker inserted by [`Snippet::TableOfContents`].
pub const TOC_MARKER: &str = "## Table of Contents\n\n[TOC]\n\n";

const TABLE_TEMPLATE: &str = "| Header 1 | Header 2 | Header 3 |\n\
| --- | --- | --- |\n\
| Row 1, Col 1 | Row 1, Col 2 | Row 1, Col 3 |\n\
| Row 2, Col 1 | Row 2, Col 2 | Row 2, Col 3 |";

const DIAGRAM_TEMPLATE: &str = "```mermaid\ngraph TD\n    A[Start] --> B[End]\n```";

/// Insertion templates offered to the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snippet {
    Bold,
    Italic,
    Strikethrough,
    Heading,
    Link,
    Image,
    InlineCode,
    CodeBlock,
    BulletList,
    NumberedList,
    Task,
    Quote,
    Rule,
    Table,
    Math,
    Diagram,
    TableOfContents,
}

impl Snippet {
    /// Parse the action names used by toolbars and shortcuts.
    pub fn from_action(action: &str) -> Option<Self> {
        let snippet = match action {
            "bold" => Snippet::Bold,
            "italic" => Snippet::Italic,
            "strikethrough" => Snippet::Strikethrough,
            "heading" => Snippet::Heading,
            "link" => Snippet::Link,
            "image" => Snippet::Image,
            "code" => Snippet::InlineCode,
            "codeblock" => Snippet::CodeBlock,
            "list" => Snippet::BulletList,
            "numbered-list" => Snippet::NumberedList,
            "task" => Snippet::Task,
            "quote" => Snippet::Quote,
            "hr" => Snippet::Rule,
            "table" => Snippet::Table,
            "math" => Snippet::Math,
            "diagram" => Snippet::Diagram,
            "toc" => Snippet::TableOfContents,
            _ => return None,
        };
        Some(snippet)
    }

    /// Text to insert before and after the selection.
    fn parts(&self, doc: &SourceDocument) -> (String, &'static str) {
        let has_selection = !doc.selection().is_empty();
        match self {
            Snippet::Bold => ("**".into(), "**"),
            Snippet::Italic => ("*".into(), "*"),
            Snippet::Strikethrough => ("~~".into(), "~~"),
            Snippet::Heading => {
                let start = doc.selection().start;
                let at_line_start = start == 0 || doc.text()[..start].ends_with('\n');
                if at_line_start {
                    ("## ".into(), "")
                } else {
                    ("\n## ".into(), "")
                }
            }
            Snippet::Link if has_selection => ("[".into(), "](url)"),
            Snippet::Link => ("[link text](url)".into(), ""),
            Snippet::Image => ("![alt text](image-url)".into(), ""),
            Snippet::InlineCode => ("`".into(), "`"),
            Snippet::CodeBlock => ("```\n".into(), "\n```"),
            Snippet::BulletList => ("- ".into(), ""),
            Snippet::NumberedList => ("1. ".into(), ""),
            Snippet::Task => ("- [ ] ".into(), ""),
            Snippet::Quote => ("> ".into(), ""),
            Snippet::Rule => ("\n---\n".into(), ""),
            Snippet::Table => (TABLE_TEMPLATE.into(), ""),
            Snippet::Math => ("```math\n".into(), "\n```"),
            Snippet::Diagram => (DIAGRAM_TEMPLATE.into(), ""),
            Snippet::TableOfContents => (TOC_MARKER.into(), ""),
        }
    }

    /// Apply the snippet to `doc`.
    ///
    /// With a selection the selection is wrapped and the caret lands after the
    /// wrapped text; with a caret the template is inserted and the caret lands
    /// right after the opening part. The table-of-contents marker is inserted
    /// at the selection start and never replaces selected text.
    pub fn apply(&self, doc: &mut SourceDocument) {
        let selection = doc.selection();

        if *self == Snippet::TableOfContents {
            doc.replace_range(selection.start, selection.start, TOC_MARKER);
            let caret = selection.start + TOC_MARKER.len();
            doc.set_selection(caret, caret);
            return;
        }

        let (before, after) = self.parts(doc);
        let selected = doc.selected_text().to_string();
        let replacement = format!("{before}{selected}{after}");
        doc.replace_range(selection.start, selection.end, &replacement);

        let caret = if selected.is_empty() {
            selection.start + before.len()
        } else {
            selection.end + before.len() + after.len()
        };
        doc.set_selection(caret, caret);
    }
}
