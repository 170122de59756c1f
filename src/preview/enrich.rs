//! Post-Render Pass
//!
//! Enrichment steps applied to the committed, sanitized [`RenderedDocument`].
//! Each step runs against its own scratch copy of the tree; the copy replaces
//! the document only when the step succeeds, so a step that errors or panics
//! leaves nothing half-applied and never blocks the steps after it.

use super::dom::{NodeId, RenderedDocument};
use crate::config::Theme;
use crate::markdown::{html_escape, MathDisplay, RenderServices};
use crate::sanitize::Sanitizer;
use log::{debug, warn};
use std::collections::HashSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use url::Url;

// ─────────────────────────────────────────────────────────────────────────────
// Step contract
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a step may read besides the document itself.
#[derive(Debug, Clone, Copy)]
pub struct PostRenderContext<'a> {
    pub services: &'a RenderServices,
    pub sanitizer: &'a Sanitizer,
    pub theme: Theme,
    /// Host the preview is served from.
    pub document_host: &'a str,
}

/// Why a step gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError(pub String);

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StepError {}

/// One enrichment step.
pub trait PostRenderStep: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Enrich `doc` in place, returning how many elements were touched.
    fn apply(&self, doc: &mut RenderedDocument, ctx: &PostRenderContext<'_>)
        -> Result<usize, StepError>;
}

/// How a step settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Applied { changed: usize },
    Failed(String),
    Panicked(String),
}

/// The settled result of one step in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: &'static str,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, StepStatus::Applied { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// The pass
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered set of steps run with all-settle semantics.
pub struct PostRenderPass {
    steps: Vec<Box<dyn PostRenderStep>>,
}

impl Default for PostRenderPass {
    fn default() -> Self {
        Self {
            steps: vec![
                Box::new(HeadingIdStep),
                Box::new(MathStep),
                Box::new(DiagramStep),
                Box::new(CodeHighlightStep),
                Box::new(LinkHardeningStep),
                Box::new(TaskCheckboxStep),
            ],
        }
    }
}

impl fmt::Debug for PostRenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| s.name()))
            .finish()
    }
}

impl PostRenderPass {
    /// A pass with no steps.
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step at the end.
    pub fn with_step(mut self, step: Box<dyn PostRenderStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step. Each step settles on its own; the outcomes are
    /// reported in step order.
    pub fn run(&self, doc: &mut RenderedDocument, ctx: &PostRenderContext<'_>) -> Vec<StepOutcome> {
        self.steps
            .iter()
            .map(|step| run_step(step.as_ref(), doc, ctx))
            .collect()
    }

    /// Re-materialize every diagram, e.g. after a theme switch.
    pub fn refresh_diagrams(
        &self,
        doc: &mut RenderedDocument,
        ctx: &PostRenderContext<'_>,
    ) -> StepOutcome {
        for container in doc.elements_by_class(DIAGRAM_CLASS) {
            doc.remove_attr(container, PROCESSED_ATTR);
        }
        run_step(&DiagramStep, doc, ctx)
    }
}

fn run_step(
    step: &dyn PostRenderStep,
    doc: &mut RenderedDocument,
    ctx: &PostRenderContext<'_>,
) -> StepOutcome {
    let started = Instant::now();
    let mut scratch = doc.clone();
    let result = catch_unwind(AssertUnwindSafe(|| step.apply(&mut scratch, ctx)));

    let status = match result {
        Ok(Ok(changed)) => {
            *doc = scratch;
            debug!(
                "Post-render step '{}' touched {} element(s) in {:?}",
                step.name(),
                changed,
                started.elapsed()
            );
            StepStatus::Applied { changed }
        }
        Ok(Err(e)) => {
            warn!("Post-render step '{}' failed: {}", step.name(), e);
            StepStatus::Failed(e.to_string())
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("Post-render step '{}' panicked: {}", step.name(), message);
            StepStatus::Panicked(message)
        }
    };

    StepOutcome {
        step: step.name(),
        status,
    }
}

/// Parse sanitized markup and put it in place of `node`.
fn graft_before(doc: &mut RenderedDocument, node: NodeId, html: &str, ctx: &PostRenderContext<'_>) {
    let fragment = RenderedDocument::parse(&ctx.sanitizer.sanitize(html));
    doc.insert_fragment_before(node, &fragment);
}

// ─────────────────────────────────────────────────────────────────────────────
// Heading ids
// ─────────────────────────────────────────────────────────────────────────────

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Heading level of an element, if it is a heading.
pub fn heading_level(doc: &RenderedDocument, id: NodeId) -> Option<u8> {
    let tag = doc.tag(id)?;
    HEADING_TAGS
        .iter()
        .position(|&h| h == tag)
        .map(|i| i as u8 + 1)
}

/// Gives every heading a non-empty id that is unique in the document.
///
/// Missing or colliding ids become `<base>-<n>` with the smallest free `n`.
/// `base` is the colliding id, or `heading` for headings without one.
pub struct HeadingIdStep;

impl PostRenderStep for HeadingIdStep {
    fn name(&self) -> &'static str {
        "heading-ids"
    }

    fn apply(&self, doc: &mut RenderedDocument, _ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
        let elements = doc.descendants(doc.root());
        let headings: Vec<NodeId> = elements
            .iter()
            .copied()
            .filter(|&id| heading_level(doc, id).is_some())
            .collect();

        // Ids of other elements are taken; ids headings already carry are
        // reserved so a renamed heading never steals a later heading's id.
        let mut taken: HashSet<String> = elements
            .iter()
            .filter(|&&id| heading_level(doc, id).is_none())
            .filter_map(|&id| doc.attr(id, "id").map(str::to_string))
            .collect();
        let reserved: HashSet<String> = headings
            .iter()
            .filter_map(|&id| doc.attr(id, "id").map(str::to_string))
            .collect();

        let mut changed = 0;
        for heading in headings {
            let current = doc
                .attr(heading, "id")
                .filter(|id| !id.trim().is_empty())
                .map(str::to_string);

            if let Some(id) = &current {
                if !taken.contains(id) {
                    taken.insert(id.clone());
                    continue;
                }
            }

            let base = current.unwrap_or_else(|| "heading".to_string());
            let mut n = 1;
            let id = loop {
                let candidate = format!("{base}-{n}");
                if !taken.contains(&candidate) && !reserved.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            doc.set_attr(heading, "id", &id);
            taken.insert(id);
            changed += 1;
        }
        Ok(changed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Math in running text
// ─────────────────────────────────────────────────────────────────────────────

/// Elements whose text is never scanned for math.
const MATH_SKIP_TAGS: &[&str] = &["code", "pre", "math", "svg", "script", "style", "textarea"];
/// Containers that already hold rendered math.
const MATH_SKIP_CLASSES: &[&str] = &["math-block", "math-inline", "math-error"];

/// A piece of a text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSegment {
    Text(String),
    Math { expression: String, display: MathDisplay },
}

/// Split text on `$$...$$` and `$...$` delimiters.
///
/// Inline math must not start or end with whitespace, so prices like
/// `$5 and $10` stay text. `\$` is a literal dollar sign.
pub fn split_math(text: &str) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find(|c: char| c == '$' || c == '\\') {
        let (before, from) = rest.split_at(pos);
        plain.push_str(before);

        if let Some(after) = from.strip_prefix("\\$") {
            plain.push('$');
            rest = after;
            continue;
        }
        if let Some(after) = from.strip_prefix('\\') {
            plain.push('\\');
            rest = after;
            continue;
        }

        let found = if let Some(body) = from.strip_prefix("$$") {
            body.find("$$").and_then(|end| {
                let expression = body[..end].trim();
                (!expression.is_empty()).then(|| {
                    (
                        expression.to_string(),
                        MathDisplay::Block,
                        &body[end + 2..],
                    )
                })
            })
        } else {
            let body = &from[1..];
            body.find('$').and_then(|end| {
                let expression = &body[..end];
                let valid = !expression.is_empty()
                    && !expression.starts_with(char::is_whitespace)
                    && !expression.ends_with(char::is_whitespace);
                valid.then(|| (expression.to_string(), MathDisplay::Inline, &body[end + 1..]))
            })
        };

        match found {
            Some((expression, display, after)) => {
                if !plain.is_empty() {
                    segments.push(TextSegment::Text(std::mem::take(&mut plain)));
                }
                segments.push(TextSegment::Math { expression, display });
                rest = after;
            }
            None => {
                plain.push('$');
                rest = &from[1..];
            }
        }
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        segments.push(TextSegment::Text(plain));
    }
    segments
}

/// Typesets `$$...$$` and `$...$` found in text nodes.
pub struct MathStep;

impl MathStep {
    fn skipped(doc: &RenderedDocument, text: NodeId) -> bool {
        doc.ancestors(text).any(|a| {
            doc.tag(a).is_some_and(|t| MATH_SKIP_TAGS.contains(&t))
                || MATH_SKIP_CLASSES.iter().any(|c| doc.has_class(a, c))
        })
    }

    fn markup(expression: &str, display: MathDisplay, ctx: &PostRenderContext<'_>) -> String {
        let class = match display {
            MathDisplay::Block => "math-block",
            MathDisplay::Inline => "math-inline",
        };
        match ctx.services.math.render(expression, display) {
            Ok(rendered) => format!("<span class=\"{class}\">{rendered}</span>"),
            Err(e) => {
                warn!("Math in text failed: {}", e);
                format!(
                    "<span class=\"math-error\">Error rendering equation: {}</span>",
                    html_escape(e.message())
                )
            }
        }
    }
}

impl PostRenderStep for MathStep {
    fn name(&self) -> &'static str {
        "math"
    }

    fn apply(&self, doc: &mut RenderedDocument, ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
        let candidates: Vec<NodeId> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|&id| doc.text(id).is_some_and(|t| t.contains('$')))
            .filter(|&id| !Self::skipped(doc, id))
            .collect();

        let mut changed = 0;
        for node in candidates {
            let segments = match doc.text(node) {
                Some(text) => split_math(text),
                None => continue,
            };
            if !segments.iter().any(|s| matches!(s, TextSegment::Math { .. })) {
                continue;
            }

            for segment in segments {
                match segment {
                    TextSegment::Text(text) => {
                        let text_node = doc.create_text(&text);
                        doc.insert_before(node, text_node);
                    }
                    TextSegment::Math { expression, display } => {
                        graft_before(doc, node, &Self::markup(&expression, display, ctx), ctx);
                        changed += 1;
                    }
                }
            }
            doc.detach(node);
        }
        Ok(changed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Diagrams
// ─────────────────────────────────────────────────────────────────────────────

/// Class of diagram placeholder containers.
pub const DIAGRAM_CLASS: &str = "mermaid";
/// Marker set on containers that have been materialized.
pub const PROCESSED_ATTR: &str = "data-processed";
/// Where a materialized container keeps its spec.
pub const DIAGRAM_SOURCE_ATTR: &str = "data-diagram";

/// Renders diagram placeholders to SVG in the current theme.
pub struct DiagramStep;

impl PostRenderStep for DiagramStep {
    fn name(&self) -> &'static str {
        "diagrams"
    }

    fn apply(&self, doc: &mut RenderedDocument, ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
        let containers: Vec<NodeId> = doc
            .elements_by_class(DIAGRAM_CLASS)
            .into_iter()
            .filter(|&id| !doc.has_attr(id, PROCESSED_ATTR))
            .collect();

        let mut changed = 0;
        for container in containers {
            let spec = match doc.attr(container, DIAGRAM_SOURCE_ATTR) {
                Some(spec) => spec.to_string(),
                None => doc.text_content(container),
            };
            doc.set_attr(container, DIAGRAM_SOURCE_ATTR, &spec);

            let markup = match ctx.services.diagrams.render(&spec, ctx.theme) {
                Ok(svg) => svg,
                Err(e) => {
                    let label = doc.attr(container, "id").unwrap_or("diagram");
                    warn!("Failed to render {}: {}", label, e);
                    format!(
                        "<div class=\"mermaid-error\">Error rendering diagram: {}</div>",
                        html_escape(e.message())
                    )
                }
            };
            doc.set_inner_html(container, &ctx.sanitizer.sanitize(&markup));
            doc.set_attr(container, PROCESSED_ATTR, "true");
            changed += 1;
        }
        Ok(changed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Code highlighting
// ─────────────────────────────────────────────────────────────────────────────

/// Marker carried by code elements that are already highlighted.
pub const HIGHLIGHTED_ATTR: &str = "data-highlighted";

/// Highlights `pre > code.language-*` blocks the compiler did not.
pub struct CodeHighlightStep;

impl PostRenderStep for CodeHighlightStep {
    fn name(&self) -> &'static str {
        "code-highlight"
    }

    fn apply(&self, doc: &mut RenderedDocument, ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
        let blocks: Vec<(NodeId, String)> = doc
            .elements_by_tag("code")
            .into_iter()
            .filter(|&id| doc.parent(id).is_some_and(|p| doc.is_element(p, "pre")))
            .filter(|&id| !doc.has_attr(id, HIGHLIGHTED_ATTR))
            .filter_map(|id| {
                let language = doc
                    .classes(id)
                    .find_map(|c| c.strip_prefix("language-"))?
                    .to_string();
                Some((id, language))
            })
            .collect();

        let mut changed = 0;
        for (code, language) in blocks {
            let source = doc.text_content(code);
            match ctx.services.highlighter.highlight(&source, &language) {
                Ok(Some(html)) => {
                    doc.set_inner_html(code, &ctx.sanitizer.sanitize(&html));
                    doc.set_attr(code, HIGHLIGHTED_ATTR, "yes");
                    changed += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Highlighting {} block failed: {}", language, e),
            }
        }
        Ok(changed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// External links
// ─────────────────────────────────────────────────────────────────────────────

/// Whether `href` points at a host other than `document_host`.
///
/// `href` is resolved against the document's own origin first, so relative
/// and fragment links are same-host while scheme-relative links
/// (`//host/path`) keep their host. URLs without a host (`mailto:`, `tel:`)
/// are same-host.
pub fn is_external(href: &str, document_host: &str) -> bool {
    let href = href.trim();
    let resolved = match Url::parse(&format!("http://{document_host}/")) {
        Ok(base) => base.join(href),
        Err(_) => Url::parse(href),
    };
    match resolved {
        Ok(url) => url
            .host_str()
            .is_some_and(|host| !host.eq_ignore_ascii_case(document_host)),
        Err(_) => false,
    }
}

/// Opens external links in a new context without an opener handle.
pub struct LinkHardeningStep;

impl PostRenderStep for LinkHardeningStep {
    fn name(&self) -> &'static str {
        "links"
    }

    fn apply(&self, doc: &mut RenderedDocument, ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
        let mut changed = 0;
        for anchor in doc.elements_by_tag("a") {
            let external = doc
                .attr(anchor, "href")
                .is_some_and(|href| is_external(href, ctx.document_host));
            if external {
                doc.set_attr(anchor, "target", "_blank");
                doc.set_attr(anchor, "rel", "noopener noreferrer");
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task checkboxes
// ─────────────────────────────────────────────────────────────────────────────

/// Attribute holding a checkbox's ordinal among task markers.
pub const TASK_INDEX_ATTR: &str = "data-task-index";

/// Enables task-list checkboxes and numbers them in document order.
///
/// Only the leading checkbox of a list item counts; checkboxes from raw HTML
/// elsewhere would break the correspondence with source task markers.
pub struct TaskCheckboxStep;

impl TaskCheckboxStep {
    fn is_task_checkbox(doc: &RenderedDocument, input: NodeId) -> bool {
        if doc.attr(input, "type") != Some("checkbox") {
            return false;
        }
        let Some(item) = doc.ancestors(input).find(|&a| doc.is_element(a, "li")) else {
            return false;
        };
        doc.descendants(item)
            .into_iter()
            .find(|&d| doc.tag(d).is_some() && !doc.is_element(d, "p"))
            == Some(input)
    }
}

impl PostRenderStep for TaskCheckboxStep {
    fn name(&self) -> &'static str {
        "task-checkboxes"
    }

    fn apply(&self, doc: &mut RenderedDocument, _ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
        let checkboxes: Vec<NodeId> = doc
            .elements_by_tag("input")
            .into_iter()
            .filter(|&id| Self::is_task_checkbox(doc, id))
            .collect();

        for (ordinal, checkbox) in checkboxes.iter().enumerate() {
            doc.remove_attr(*checkbox, "disabled");
            doc.set_attr(*checkbox, TASK_INDEX_ATTR, &ordinal.to_string());
        }
        Ok(checkboxes.len())
    }
}

/// The checkbox carrying task ordinal `ordinal`.
pub fn task_checkbox(doc: &RenderedDocument, ordinal: usize) -> Option<NodeId> {
    let wanted = ordinal.to_string();
    doc.find(doc.root(), |d, id| {
        d.is_element(id, "input") && d.attr(id, TASK_INDEX_ATTR) == Some(wanted.as_str())
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{DiagramRenderer, ExtensionError, MathRenderer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn run(step: &dyn PostRenderStep, html: &str) -> (RenderedDocument, StepOutcome) {
        run_with(step, html, &RenderServices::default(), Theme::Light)
    }

    fn run_with(
        step: &dyn PostRenderStep,
        html: &str,
        services: &RenderServices,
        theme: Theme,
    ) -> (RenderedDocument, StepOutcome) {
        let sanitizer = Sanitizer::new();
        let ctx = PostRenderContext {
            services,
            sanitizer: &sanitizer,
            theme,
            document_host: "localhost",
        };
        let mut doc = RenderedDocument::parse(html);
        let outcome = run_step(step, &mut doc, &ctx);
        (doc, outcome)
    }

    struct Exploding;

    impl PostRenderStep for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn apply(&self, doc: &mut RenderedDocument, _ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
            let root = doc.root();
            doc.clear_children(root);
            panic!("boom");
        }
    }

    struct Refusing;

    impl PostRenderStep for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn apply(&self, _doc: &mut RenderedDocument, _ctx: &PostRenderContext<'_>) -> Result<usize, StepError> {
            Err(StepError("nope".to_string()))
        }
    }

    struct CountingDiagrams(AtomicUsize);

    impl DiagramRenderer for CountingDiagrams {
        fn render(&self, _spec: &str, theme: Theme) -> Result<String, ExtensionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("<svg class=\"{}\"></svg>", theme.name()))
        }
    }

    struct FailingMath;

    impl MathRenderer for FailingMath {
        fn render(&self, _expression: &str, _display: MathDisplay) -> Result<String, ExtensionError> {
            Err(ExtensionError::Math("bad <expr>".to_string()))
        }
    }

    #[test]
    fn test_panicking_step_is_contained_and_rolled_back() {
        let (doc, outcome) = run(&Exploding, "<p>keep</p>");
        assert_eq!(outcome.status, StepStatus::Panicked("boom".to_string()));
        assert_eq!(doc.to_html(), "<p>keep</p>");
    }

    #[test]
    fn test_all_steps_settle() {
        let pass = PostRenderPass::empty()
            .with_step(Box::new(Refusing))
            .with_step(Box::new(LinkHardeningStep));
        let services = RenderServices::default();
        let sanitizer = Sanitizer::new();
        let ctx = PostRenderContext {
            services: &services,
            sanitizer: &sanitizer,
            theme: Theme::Light,
            document_host: "localhost",
        };
        let mut doc = RenderedDocument::parse("<a href=\"https://rust-lang.org\">r</a>");
        let outcomes = pass.run(&mut doc, &ctx);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, StepStatus::Failed("nope".to_string()));
        assert!(outcomes[1].is_ok());
        assert!(doc.to_html().contains("target=\"_blank\""));
    }

    #[test]
    fn test_default_pass_order() {
        assert_eq!(
            PostRenderPass::default().step_names(),
            vec!["heading-ids", "math", "diagrams", "code-highlight", "links", "task-checkboxes"]
        );
    }

    #[test]
    fn test_heading_ids_made_unique() {
        let html = "<h1 id=\"heading-a\">A</h1><h2 id=\"heading-a\">A</h2><h2>?</h2><h3 id=\"heading-a-1\">x</h3><p id=\"heading-b\"></p><h2 id=\"heading-b\">B</h2>";
        let (doc, outcome) = run(&HeadingIdStep, html);
        assert_eq!(outcome.status, StepStatus::Applied { changed: 3 });

        let ids: Vec<String> = HEADING_TAGS
            .iter()
            .flat_map(|t| doc.elements_by_tag(t))
            .filter_map(|h| doc.attr(h, "id").map(str::to_string))
            .collect();
        assert_eq!(ids.len(), 5);
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), 5);
        assert!(ids.iter().all(|id| !id.is_empty()));

        let second = doc.elements_by_tag("h2")[0];
        assert_eq!(doc.attr(second, "id"), Some("heading-a-2"));
        let untitled = doc.elements_by_tag("h2")[1];
        assert_eq!(doc.attr(untitled, "id"), Some("heading-1"));
        let b = doc.elements_by_tag("h2")[2];
        assert_eq!(doc.attr(b, "id"), Some("heading-b-1"));
    }

    #[test]
    fn test_split_math() {
        assert_eq!(
            split_math("a $x^2$ b"),
            vec![
                TextSegment::Text("a ".to_string()),
                TextSegment::Math {
                    expression: "x^2".to_string(),
                    display: MathDisplay::Inline
                },
                TextSegment::Text(" b".to_string()),
            ]
        );
        assert_eq!(
            split_math("$$ \\sum x $$"),
            vec![TextSegment::Math {
                expression: "\\sum x".to_string(),
                display: MathDisplay::Block
            }]
        );
        assert_eq!(
            split_math("costs $5 and $10"),
            vec![TextSegment::Text("costs $5 and $10".to_string())]
        );
        assert_eq!(
            split_math("\\$x\\$"),
            vec![TextSegment::Text("$x$".to_string())]
        );
    }

    #[test]
    fn test_math_in_text_is_typeset() {
        let (doc, outcome) = run(&MathStep, "<p>Energy $E=mc^2$ and <code>$x$</code></p>");
        assert_eq!(outcome.status, StepStatus::Applied { changed: 1 });
        let html = doc.to_html();
        assert!(html.contains("<p>Energy <span class=\"math-inline\"><math"));
        assert!(html.contains("<code>$x$</code>"));
    }

    #[test]
    fn test_math_in_text_failure_is_marked() {
        let services = RenderServices::default().with_math(Arc::new(FailingMath));
        let (doc, outcome) = run_with(&MathStep, "<p>$$x$$</p><p>after</p>", &services, Theme::Light);
        assert!(outcome.is_ok());
        let html = doc.to_html();
        assert!(html.contains("<span class=\"math-error\">Error rendering equation: bad &lt;expr&gt;</span>"));
        assert!(html.contains("<p>after</p>"));
    }

    #[test]
    fn test_diagrams_materialize_once() {
        let counter = Arc::new(CountingDiagrams(AtomicUsize::new(0)));
        let services = RenderServices::default().with_diagrams(counter.clone());
        let sanitizer = Sanitizer::new();
        let ctx = PostRenderContext {
            services: &services,
            sanitizer: &sanitizer,
            theme: Theme::Dark,
            document_host: "localhost",
        };
        let mut doc = RenderedDocument::parse("<div class=\"mermaid\" id=\"mermaid-diagram-1\">graph TD\nA--&gt;B</div>");

        run_step(&DiagramStep, &mut doc, &ctx);
        run_step(&DiagramStep, &mut doc, &ctx);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        let container = doc.elements_by_class(DIAGRAM_CLASS)[0];
        assert_eq!(doc.attr(container, PROCESSED_ATTR), Some("true"));
        assert_eq!(doc.attr(container, DIAGRAM_SOURCE_ATTR), Some("graph TD\nA-->B"));
        assert_eq!(doc.elements_by_tag("svg").len(), 1);
        assert!(doc.to_html().contains("<svg class=\"dark\">"));
    }

    #[test]
    fn test_refresh_rerenders_in_new_theme() {
        let services = RenderServices::default();
        let sanitizer = Sanitizer::new();
        let pass = PostRenderPass::default();
        let mut ctx = PostRenderContext {
            services: &services,
            sanitizer: &sanitizer,
            theme: Theme::Light,
            document_host: "localhost",
        };
        let mut doc = RenderedDocument::parse("<div class=\"mermaid\">graph LR\nA--&gt;B</div>");
        pass.run(&mut doc, &ctx);
        assert!(doc.to_html().contains("#ECECFF"));

        ctx.theme = Theme::Dark;
        let outcome = pass.refresh_diagrams(&mut doc, &ctx);
        assert_eq!(outcome.status, StepStatus::Applied { changed: 1 });
        let html = doc.to_html();
        assert!(html.contains("#1f2020"));
        assert!(!html.contains("#ECECFF"));
        assert_eq!(doc.elements_by_tag("svg").len(), 1);
    }

    #[test]
    fn test_diagram_failure_is_marked_and_processed() {
        let (doc, outcome) = run(&DiagramStep, "<div class=\"mermaid\">pie\n\"a\": 1</div>");
        assert!(outcome.is_ok());
        assert_eq!(doc.elements_by_class("mermaid-error").len(), 1);
        assert!(doc.to_html().contains("Error rendering diagram: Unsupported diagram type"));
        let container = doc.elements_by_class(DIAGRAM_CLASS)[0];
        assert_eq!(doc.attr(container, PROCESSED_ATTR), Some("true"));
    }

    #[test]
    fn test_unhighlighted_code_is_highlighted() {
        let (doc, outcome) = run(
            &CodeHighlightStep,
            "<pre><code class=\"language-rust\">fn main() {}</code></pre><pre><code class=\"language-nope\">x</code></pre>",
        );
        assert_eq!(outcome.status, StepStatus::Applied { changed: 1 });
        let code = doc.elements_by_tag("code")[0];
        assert_eq!(doc.attr(code, HIGHLIGHTED_ATTR), Some("yes"));
        assert!(doc.inner_html(code).contains("<span class=\"hl-"));
        assert_eq!(doc.text_content(code), "fn main() {}");
        let other = doc.elements_by_tag("code")[1];
        assert_eq!(doc.inner_html(other), "x");
    }

    #[test]
    fn test_already_highlighted_code_is_left_alone() {
        let html = "<pre><code class=\"language-rust\" data-highlighted=\"yes\">fn</code></pre>";
        let (doc, outcome) = run(&CodeHighlightStep, html);
        assert_eq!(outcome.status, StepStatus::Applied { changed: 0 });
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_external_links_hardened() {
        let html = "<a href=\"https://example.com/x\">e</a><a href=\"http://localhost:8080/y\">s</a><a href=\"#heading-a\">f</a><a href=\"docs/readme.md\">r</a><a href=\"mailto:a@b.c\">m</a>";
        let (doc, outcome) = run(&LinkHardeningStep, html);
        assert_eq!(outcome.status, StepStatus::Applied { changed: 1 });
        let anchors = doc.elements_by_tag("a");
        assert_eq!(doc.attr(anchors[0], "target"), Some("_blank"));
        assert_eq!(doc.attr(anchors[0], "rel"), Some("noopener noreferrer"));
        for &a in &anchors[1..] {
            assert!(!doc.has_attr(a, "target"));
            assert!(!doc.has_attr(a, "rel"));
        }
    }

    #[test]
    fn test_scheme_relative_links_keep_their_host() {
        assert!(is_external("//evil.example/x", "localhost"));
        assert!(!is_external("//LOCALHOST/x", "localhost"));
        assert!(!is_external("/absolute/path", "localhost"));
        assert!(!is_external("../up.md", "localhost"));

        let (doc, outcome) = run(&LinkHardeningStep, "<a href=\"//other.host/x\">o</a>");
        assert_eq!(outcome.status, StepStatus::Applied { changed: 1 });
        let anchor = doc.elements_by_tag("a")[0];
        assert_eq!(doc.attr(anchor, "target"), Some("_blank"));
        assert_eq!(doc.attr(anchor, "rel"), Some("noopener noreferrer"));
    }

    #[test]
    fn test_task_checkboxes_wired_in_order() {
        let html = "<ul><li><input type=\"checkbox\" disabled=\"\"> a</li><li><input type=\"checkbox\" checked=\"\" disabled=\"\"> b</li></ul><p>x <input type=\"checkbox\"></p>";
        let (doc, outcome) = run(&TaskCheckboxStep, html);
        assert_eq!(outcome.status, StepStatus::Applied { changed: 2 });

        let first = task_checkbox(&doc, 0).unwrap();
        let second = task_checkbox(&doc, 1).unwrap();
        assert!(!doc.has_attr(first, "disabled"));
        assert!(doc.has_attr(second, "checked"));
        assert!(task_checkbox(&doc, 2).is_none());
    }
}
