//! Rendered Document tree
//!
//! An arena-allocated HTML tree that the Post-Render Pass walks and mutates in
//! place. Nodes are never freed: detaching a node only unlinks it, which keeps
//! every `NodeId` valid for the lifetime of the document.
//!
//! The tree is built by html5ever through [`DocumentSink`](super::sink) and
//! serialized back with its own small serializer, so parse → serialize →
//! parse is stable.

use super::sink::DocumentSink;
use html5ever::driver::{parse_document, ParseOpts};
use html5ever::tendril::TendrilSink;
use html5ever::{ns, LocalName, QualName};

/// Index of a node in a [`RenderedDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    fn local(&self) -> &str {
        &self.name.local
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// HTML elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is serialized verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes"];

/// The live, enriched output tree.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    nodes: Vec<Node>,
    /// The content root (the `body` element for parsed documents).
    root: NodeId,
}

impl Default for RenderedDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RenderedDocument {
    fn eq(&self, other: &Self) -> bool {
        self.to_html() == other.to_html()
    }
}

impl RenderedDocument {
    /// An empty document: a document node holding an empty `body`.
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let body = doc.create_element("body", &[]);
        doc.append(NodeId(0), body);
        doc.root = body;
        doc
    }

    /// A document with only the document node; the sink fills in the rest.
    pub(super) fn bare() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
        }
    }

    /// Parse an HTML fragment. The fragment becomes the content of `body`.
    pub fn parse(html: &str) -> Self {
        let sink = DocumentSink::new();
        let mut doc = parse_document(sink, ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes())
            .into_document();

        match doc.find(doc.document(), |d, id| d.is_element(id, "body")) {
            Some(body) => doc.root = body,
            None => {
                let body = doc.create_element("body", &[]);
                let document = doc.document();
                doc.append(document, body);
                doc.root = body;
            }
        }
        doc
    }

    /// The document node.
    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// The content root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).next().is_none()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node access
    // ─────────────────────────────────────────────────────────────────────────

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next_sibling
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.nodes[id.0].first_child,
        }
    }

    /// All descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children: Vec<NodeId> = self.children(node).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// First descendant of `scope` matching `predicate`.
    pub fn find<F>(&self, scope: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Self, NodeId) -> bool,
    {
        self.descendants(scope)
            .into_iter()
            .find(|&id| predicate(self, id))
    }

    /// Local name of an element, `None` for other nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        }
    }

    /// Whether `id` is an element with local name `tag`.
    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attributes
    // ─────────────────────────────────────────────────────────────────────────

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.local() == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute, replacing any existing value. No-op on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs.iter_mut().find(|a| a.local() == name) {
                Some(attr) => attr.value = value.to_string(),
                None => attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(name)),
                    value: value.to_string(),
                }),
            }
        }
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            let before = attrs.len();
            attrs.retain(|a| a.local() != name);
            return attrs.len() != before;
        }
        false
    }

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Elements under the content root with local name `tag`, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.is_element(id, tag))
            .collect()
    }

    /// Elements under the content root carrying `class`, in document order.
    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.has_class(id, class))
            .collect()
    }

    /// First element under the content root whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find(self.root, |doc, node| doc.attr(node, "id") == Some(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction and mutation
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached HTML element.
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: value.to_string(),
            })
            .collect();
        self.push(NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(tag)),
            attrs,
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = last;
        }
        match last {
            Some(last) => self.nodes[last.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Append text to `parent`, merging with a trailing text node.
    pub(super) fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(last) = self.nodes[parent.0].last_child {
            if let NodeData::Text(existing) = &mut self.nodes[last.0].data {
                existing.push_str(text);
                return;
            }
        }
        let node = self.create_text(text);
        self.append(parent, node);
    }

    /// Insert `new_node` right before `sibling`, detaching it first.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let Some(parent) = self.nodes[sibling.0].parent else {
            return;
        };
        self.detach(new_node);
        let prev = self.nodes[sibling.0].prev_sibling;
        {
            let node = &mut self.nodes[new_node.0];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(sibling);
        }
        self.nodes[sibling.0].prev_sibling = Some(new_node);
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(new_node),
            None => self.nodes[parent.0].first_child = Some(new_node),
        }
    }

    /// Insert text before `sibling`, merging with a preceding text node.
    pub(super) fn insert_text_before(&mut self, sibling: NodeId, text: &str) {
        if let Some(prev) = self.nodes[sibling.0].prev_sibling {
            if let NodeData::Text(existing) = &mut self.nodes[prev.0].data {
                existing.push_str(text);
                return;
            }
        }
        let node = self.create_text(text);
        self.insert_before(sibling, node);
    }

    /// Unlink `id` from its parent. The node and its subtree stay allocated.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = next,
            None => self.nodes[parent.0].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.0].prev_sibling = prev,
            None => self.nodes[parent.0].last_child = prev,
        }

        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Put `new_node` where `old` was and detach `old`.
    pub fn replace(&mut self, old: NodeId, new_node: NodeId) {
        if self.parent(old).is_none() {
            return;
        }
        self.insert_before(old, new_node);
        self.detach(old);
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.detach(child);
        }
    }

    /// Deep-copy `node` (and its subtree) from `other` into this document.
    /// The copy is returned detached.
    pub fn import(&mut self, other: &RenderedDocument, node: NodeId) -> NodeId {
        let copy = self.push(other.data(node).clone());
        for child in other.children(node) {
            let child_copy = self.import(other, child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Replace the children of `parent` with the content of an HTML fragment.
    ///
    /// The fragment is inserted as-is; sanitize it first if it is untrusted.
    pub fn set_inner_html(&mut self, parent: NodeId, html: &str) {
        self.clear_children(parent);
        let fragment = RenderedDocument::parse(html);
        self.append_fragment(parent, &fragment);
    }

    /// Append copies of the content of `fragment` under `parent`.
    pub fn append_fragment(&mut self, parent: NodeId, fragment: &RenderedDocument) {
        for child in fragment.children(fragment.root()) {
            let copy = self.import(fragment, child);
            self.append(parent, copy);
        }
    }

    /// Insert copies of the content of `fragment` before `sibling`.
    pub fn insert_fragment_before(&mut self, sibling: NodeId, fragment: &RenderedDocument) {
        for child in fragment.children(fragment.root()) {
            let copy = self.import(fragment, child);
            self.insert_before(sibling, copy);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────

    /// Serialize the content root's children.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root)
    }

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag(id).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
        for child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    /// Serialize `id` itself, including its tags.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match &self.nodes[id.0].data {
            NodeData::Document => {
                for child in self.children(id) {
                    self.write_node(child, false, out);
                }
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element { name, attrs } => {
                let tag: &str = &name.local;
                out.push('<');
                out.push_str(tag);
                for attr in attrs {
                    out.push(' ');
                    if let Some(prefix) = &attr.name.prefix {
                        out.push_str(prefix);
                        out.push(':');
                    }
                    out.push_str(attr.local());
                    out.push_str("=\"");
                    escape_attr(&attr.value, out);
                    out.push('"');
                }
                out.push('>');

                let html_ns = name.ns == ns!(html);
                if html_ns && VOID_ELEMENTS.contains(&tag) {
                    return;
                }

                // The parser drops one newline right after these start tags.
                if html_ns && matches!(tag, "pre" | "textarea") {
                    let leading_newline = self.nodes[id.0]
                        .first_child
                        .and_then(|c| self.text(c))
                        .is_some_and(|t| t.starts_with('\n'));
                    if leading_newline {
                        out.push('\n');
                    }
                }

                let raw = html_ns && RAW_TEXT_ELEMENTS.contains(&tag);
                for child in self.children(id) {
                    self.write_node(child, raw, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a RenderedDocument,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.nodes[current.0].next_sibling;
        Some(current)
    }
}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors<'a> {
    doc: &'a RenderedDocument,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.nodes[current.0].parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_roundtrip() {
        let html = "<h1 id=\"heading-a\">A &amp; B</h1>\n<p>x<br>y</p>\n";
        let doc = RenderedDocument::parse(html);
        assert_eq!(doc.to_html(), html);
        assert_eq!(RenderedDocument::parse(&doc.to_html()).to_html(), html);
    }

    #[test]
    fn test_empty_document() {
        let doc = RenderedDocument::parse("");
        assert!(doc.is_empty());
        assert_eq!(doc.to_html(), "");
        assert!(RenderedDocument::new().is_empty());
    }

    #[test]
    fn test_find_by_tag_class_and_id() {
        let doc = RenderedDocument::parse(
            "<div class=\"mermaid x\" id=\"d1\">graph</div><p>one</p><p>two</p>",
        );
        assert_eq!(doc.elements_by_tag("p").len(), 2);
        let diagrams = doc.elements_by_class("mermaid");
        assert_eq!(diagrams.len(), 1);
        assert_eq!(doc.element_by_id("d1"), Some(diagrams[0]));
        assert_eq!(doc.text_content(diagrams[0]), "graph");
    }

    #[test]
    fn test_attribute_set_and_remove() {
        let mut doc = RenderedDocument::parse("<input type=\"checkbox\" disabled=\"\">");
        let input = doc.elements_by_tag("input")[0];
        assert!(doc.remove_attr(input, "disabled"));
        assert!(!doc.remove_attr(input, "disabled"));
        doc.set_attr(input, "data-task-index", "0");
        doc.set_attr(input, "type", "checkbox");
        assert_eq!(
            doc.to_html(),
            "<input type=\"checkbox\" data-task-index=\"0\">"
        );
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let mut doc = RenderedDocument::parse("<a>x</a>");
        let a = doc.elements_by_tag("a")[0];
        doc.set_attr(a, "title", "say \"hi\" & <bye>");
        assert_eq!(
            doc.to_html(),
            "<a title=\"say &quot;hi&quot; &amp; <bye>\">x</a>"
        );
    }

    #[test]
    fn test_insert_replace_and_detach() {
        let mut doc = RenderedDocument::parse("<p>a</p><p>b</p>");
        let ps = doc.elements_by_tag("p");

        let hr = doc.create_element("hr", &[]);
        doc.insert_before(ps[1], hr);
        assert_eq!(doc.to_html(), "<p>a</p><hr><p>b</p>");

        let div = doc.create_element("div", &[("class", "x")]);
        doc.replace(ps[0], div);
        assert_eq!(doc.to_html(), "<div class=\"x\"></div><hr><p>b</p>");

        doc.detach(hr);
        assert_eq!(doc.to_html(), "<div class=\"x\"></div><p>b</p>");
    }

    #[test]
    fn test_set_inner_html_and_import() {
        let mut doc = RenderedDocument::parse("<div class=\"mermaid\">spec</div>");
        let div = doc.elements_by_class("mermaid")[0];
        doc.set_inner_html(div, "<svg viewBox=\"0 0 1 1\"><rect width=\"1\"></rect></svg>");
        assert_eq!(
            doc.to_html(),
            "<div class=\"mermaid\"><svg viewBox=\"0 0 1 1\"><rect width=\"1\"></rect></svg></div>"
        );
    }

    #[test]
    fn test_text_is_escaped_and_nbsp_kept() {
        let mut doc = RenderedDocument::new();
        let root = doc.root();
        let p = doc.create_element("p", &[]);
        let text = doc.create_text("1 < 2 &\u{a0}3");
        doc.append(p, text);
        doc.append(root, p);
        assert_eq!(doc.to_html(), "<p>1 &lt; 2 &amp;&nbsp;3</p>");
    }

    #[test]
    fn test_pre_leading_newline_survives_roundtrip() {
        let html = "<pre>\n\nindented</pre>";
        let doc = RenderedDocument::parse(html);
        let again = RenderedDocument::parse(&doc.to_html());
        assert_eq!(doc.to_html(), again.to_html());
        let pre = again.elements_by_tag("pre")[0];
        assert_eq!(again.text_content(pre), "\nindented");
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let doc = RenderedDocument::parse("<ul><li>a<b>b</b></li><li>c</li></ul>");
        let texts: Vec<&str> = doc
            .descendants(doc.root())
            .into_iter()
            .filter_map(|id| doc.text(id))
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ancestors() {
        let doc = RenderedDocument::parse("<pre><code>x</code></pre>");
        let code = doc.elements_by_tag("code")[0];
        let text = doc.children(code).next().unwrap();
        assert!(doc.ancestors(text).any(|a| doc.is_element(a, "pre")));
    }
}
