//! Outline Builder
//!
//! Derives the table of contents from the headings of a [`RenderedDocument`].
//! The tree follows strict heading-level nesting: a heading opens a level
//! under the nearest preceding heading with a lower level, however many
//! levels it skips.

use super::dom::{NodeId, RenderedDocument};
use super::enrich::heading_level;
use crate::markdown::html_escape;

/// Shown instead of an outline when the document has no headings.
pub const EMPTY_OUTLINE_HTML: &str = "<p>No headings found in document</p>";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// A heading as found in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    /// Heading level (1-6 for H1-H6)
    pub level: u8,
    /// Element id, the link target
    pub id: String,
    /// Visible heading text
    pub label: String,
}

/// One entry of the outline tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub level: u8,
    pub id: String,
    pub label: String,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn new(heading: &HeadingEntry) -> Self {
        Self {
            level: heading.level,
            id: heading.id.clone(),
            label: heading.label.clone(),
            children: Vec::new(),
        }
    }

    /// Number of entries in this subtree, this one included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::count).sum::<usize>()
    }
}

/// A built outline. An empty document gets an explicit marker, not an
/// empty tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outline {
    Empty,
    Tree(Vec<OutlineNode>),
}

impl Outline {
    pub fn is_empty(&self) -> bool {
        matches!(self, Outline::Empty)
    }

    /// Top-level entries (none for `Empty`).
    pub fn roots(&self) -> &[OutlineNode] {
        match self {
            Outline::Empty => &[],
            Outline::Tree(roots) => roots,
        }
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.roots().iter().map(OutlineNode::count).sum()
    }

    /// Nested-list HTML. Each entry links to its heading by id.
    pub fn to_html(&self) -> String {
        match self {
            Outline::Empty => EMPTY_OUTLINE_HTML.to_string(),
            Outline::Tree(roots) => {
                let mut out = String::new();
                write_list(roots, &mut out);
                out
            }
        }
    }

    /// Indented plain-text rendering, one entry per line.
    pub fn to_text(&self) -> String {
        fn walk(nodes: &[OutlineNode], depth: usize, out: &mut String) {
            for node in nodes {
                out.push_str(&"  ".repeat(depth));
                out.push_str(&format!("- {} (#{})\n", node.label, node.id));
                walk(&node.children, depth + 1, out);
            }
        }

        match self {
            Outline::Empty => "No headings found in document\n".to_string(),
            Outline::Tree(roots) => {
                let mut out = String::new();
                walk(roots, 0, &mut out);
                out
            }
        }
    }
}

fn write_list(nodes: &[OutlineNode], out: &mut String) {
    out.push_str("<ul>");
    for node in nodes {
        out.push_str(&format!(
            "<li><a href=\"#{}\" class=\"h{}\">{}</a>",
            html_escape(&node.id),
            node.level,
            html_escape(&node.label)
        ));
        if !node.children.is_empty() {
            write_list(&node.children, out);
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}

// ─────────────────────────────────────────────────────────────────────────────
// Building
// ─────────────────────────────────────────────────────────────────────────────

/// The headings of `doc` in document order.
pub fn headings(doc: &RenderedDocument) -> Vec<HeadingEntry> {
    doc.descendants(doc.root())
        .into_iter()
        .filter_map(|id| {
            let level = heading_level(doc, id)?;
            Some(HeadingEntry {
                level,
                id: doc.attr(id, "id").unwrap_or_default().to_string(),
                label: doc.text_content(id).trim().to_string(),
            })
        })
        .collect()
}

/// Build the outline tree from headings in document order.
pub fn build(headings: &[HeadingEntry]) -> Outline {
    if headings.is_empty() {
        return Outline::Empty;
    }

    let mut roots = Vec::new();
    // Open entries, outermost first. Invariant: levels strictly increase.
    let mut open: Vec<OutlineNode> = Vec::new();

    for heading in headings {
        while open.last().is_some_and(|top| top.level >= heading.level) {
            close_top(&mut open, &mut roots);
        }
        open.push(OutlineNode::new(heading));
    }
    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    Outline::Tree(roots)
}

fn close_top(open: &mut Vec<OutlineNode>, roots: &mut Vec<OutlineNode>) {
    if let Some(node) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Build the outline of a rendered document.
pub fn build_from_document(doc: &RenderedDocument) -> Outline {
    build(&headings(doc))
}

/// The heading an outline link points at. Read-only: navigating never
/// touches the source.
pub fn navigate(doc: &RenderedDocument, id: &str) -> Option<NodeId> {
    let target = id.strip_prefix('#').unwrap_or(id);
    doc.find(doc.root(), |d, node| {
        heading_level(d, node).is_some() && d.attr(node, "id") == Some(target)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: u8, id: &str) -> HeadingEntry {
        HeadingEntry {
            level,
            id: id.to_string(),
            label: id.to_uppercase(),
        }
    }

    fn shape(nodes: &[OutlineNode]) -> Vec<(String, Vec<String>)> {
        nodes
            .iter()
            .map(|n| (n.id.clone(), n.children.iter().map(|c| c.id.clone()).collect()))
            .collect()
    }

    #[test]
    fn test_empty_input_gives_empty_marker() {
        let outline = build(&[]);
        assert_eq!(outline, Outline::Empty);
        assert_eq!(outline.to_html(), EMPTY_OUTLINE_HTML);
        assert_eq!(outline.len(), 0);
    }

    #[test]
    fn test_skipped_levels_nest_one_deep() {
        let outline = build(&[entry(1, "a"), entry(3, "b"), entry(2, "c"), entry(1, "d")]);
        let roots = outline.roots();
        assert_eq!(
            shape(roots),
            vec![
                ("a".to_string(), vec!["b".to_string(), "c".to_string()]),
                ("d".to_string(), vec![]),
            ]
        );
        assert!(roots[0].children[0].children.is_empty());
        assert_eq!(outline.len(), 4);
    }

    #[test]
    fn test_deeper_levels_nest_under_previous() {
        let outline = build(&[entry(1, "a"), entry(2, "b"), entry(3, "c"), entry(2, "d")]);
        let roots = outline.roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 2);
        assert_eq!(roots[0].children[0].children[0].id, "c");
    }

    #[test]
    fn test_document_starting_below_h1() {
        let outline = build(&[entry(3, "a"), entry(2, "b"), entry(3, "c")]);
        assert_eq!(
            shape(outline.roots()),
            vec![
                ("a".to_string(), vec![]),
                ("b".to_string(), vec!["c".to_string()]),
            ]
        );
    }

    #[test]
    fn test_outline_html() {
        let outline = build(&[entry(1, "a"), entry(2, "b&c")]);
        assert_eq!(
            outline.to_html(),
            "<ul><li><a href=\"#a\" class=\"h1\">A</a><ul><li><a href=\"#b&amp;c\" class=\"h2\">B&amp;C</a></li></ul></li></ul>"
        );
    }

    #[test]
    fn test_headings_from_document() {
        let doc = RenderedDocument::parse(
            "<h1 id=\"heading-intro\">Intro <em>here</em></h1><p>x</p><h2 id=\"heading-sub\">Sub</h2>",
        );
        let found = headings(&doc);
        assert_eq!(
            found,
            vec![
                HeadingEntry {
                    level: 1,
                    id: "heading-intro".to_string(),
                    label: "Intro here".to_string()
                },
                HeadingEntry {
                    level: 2,
                    id: "heading-sub".to_string(),
                    label: "Sub".to_string()
                },
            ]
        );
        assert_eq!(build_from_document(&doc).len(), 2);
    }

    #[test]
    fn test_navigate_is_read_only_lookup() {
        let doc = RenderedDocument::parse("<p id=\"x\">p</p><h2 id=\"heading-b\">B</h2>");
        let before = doc.to_html();
        let target = navigate(&doc, "#heading-b").unwrap();
        assert!(doc.is_element(target, "h2"));
        assert!(navigate(&doc, "x").is_none());
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_to_text() {
        let outline = build(&[entry(1, "a"), entry(2, "b")]);
        assert_eq!(outline.to_text(), "- A (#a)\n  - B (#b)\n");
    }
}
