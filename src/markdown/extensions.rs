//! Extension Renderer
//!
//! Fenced blocks and inline code spans are classified into [`ExtensionBlock`]s
//! and rendered by a strategy picked from a dispatch table keyed on the block's
//! language tag. The defaults are:
//!
//! | tag       | block          | strategy             |
//! |-----------|----------------|----------------------|
//! | `math`    | `MathBlock`    | [`MathStrategy`]     |
//! | `mermaid` | `DiagramBlock` | [`DiagramStrategy`]  |
//! | `$`       | `InlineMath`   | [`InlineMathStrategy`] |
//! | anything else | `CodeBlock` | [`CodeStrategy`] (fallback) |
//!
//! Every strategy contains its own failures: a block that cannot be rendered
//! becomes a visible error marker or plain code, never an error for the whole
//! compile.

use super::html_escape;
use super::services::{MathDisplay, RenderServices};
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

/// Fence tag for math blocks.
pub const MATH_TAG: &str = "math";
/// Fence tag for diagram blocks.
pub const DIAGRAM_TAG: &str = "mermaid";
/// Dispatch key for inline math spans.
pub const INLINE_MATH_TAG: &str = "$";
/// Prefix of the ids given to diagram placeholders.
pub const DIAGRAM_ID_PREFIX: &str = "mermaid-diagram-";

// ─────────────────────────────────────────────────────────────────────────────
// ExtensionBlock
// ─────────────────────────────────────────────────────────────────────────────

/// A construct intercepted during compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionBlock {
    MathBlock { expression: String },
    DiagramBlock { id: String, spec: String },
    CodeBlock { language: String, source: String },
    InlineMath { expression: String },
}

impl ExtensionBlock {
    /// Classify a fenced block by the first word of its info string.
    pub fn from_fence(info: &str, source: &str, ctx: &mut RenderContext<'_>) -> Self {
        let language = info.split_whitespace().next().unwrap_or_default();
        match language.to_ascii_lowercase().as_str() {
            MATH_TAG => ExtensionBlock::MathBlock {
                expression: source.to_string(),
            },
            DIAGRAM_TAG => ExtensionBlock::DiagramBlock {
                id: ctx.next_diagram_id(),
                spec: source.to_string(),
            },
            _ => ExtensionBlock::CodeBlock {
                language: language.to_string(),
                source: source.to_string(),
            },
        }
    }

    /// Classify an inline code span. Only spans wrapped in exactly one `$`
    /// pair are math; everything else stays a code span.
    pub fn from_code_span(code: &str) -> Option<Self> {
        let inner = code.strip_prefix('$')?.strip_suffix('$')?;
        if inner.trim().is_empty() || inner.starts_with('$') || inner.ends_with('$') {
            return None;
        }
        Some(ExtensionBlock::InlineMath {
            expression: inner.to_string(),
        })
    }

    /// Key into the strategy table.
    pub fn tag(&self) -> String {
        match self {
            ExtensionBlock::MathBlock { .. } => MATH_TAG.to_string(),
            ExtensionBlock::DiagramBlock { .. } => DIAGRAM_TAG.to_string(),
            ExtensionBlock::CodeBlock { language, .. } => language.to_ascii_lowercase(),
            ExtensionBlock::InlineMath { .. } => INLINE_MATH_TAG.to_string(),
        }
    }

    /// The raw text carried by the block.
    pub fn source(&self) -> &str {
        match self {
            ExtensionBlock::MathBlock { expression } | ExtensionBlock::InlineMath { expression } => {
                expression
            }
            ExtensionBlock::DiagramBlock { spec, .. } => spec,
            ExtensionBlock::CodeBlock { source, .. } => source,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderContext
// ─────────────────────────────────────────────────────────────────────────────

/// Per-compile state handed to strategies.
pub struct RenderContext<'a> {
    services: &'a RenderServices,
    diagrams: usize,
}

impl<'a> RenderContext<'a> {
    pub fn new(services: &'a RenderServices) -> Self {
        Self {
            services,
            diagrams: 0,
        }
    }

    pub fn services(&self) -> &RenderServices {
        self.services
    }

    /// Diagram ids count up from 1 within one compile, so the same text always
    /// compiles to the same markup.
    fn next_diagram_id(&mut self) -> String {
        self.diagrams += 1;
        format!("{DIAGRAM_ID_PREFIX}{}", self.diagrams)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Renders one kind of [`ExtensionBlock`] to HTML.
pub trait ExtensionStrategy: Send + Sync {
    fn render(&self, block: &ExtensionBlock, ctx: &RenderContext<'_>) -> String;
}

/// Unhighlighted, escaped code.
pub fn plain_code(language: &str, source: &str) -> String {
    if language.is_empty() {
        format!("<pre><code>{}</code></pre>\n", html_escape(source))
    } else {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            html_escape(language),
            html_escape(source)
        )
    }
}

/// Typeset `math` fences as a block.
pub struct MathStrategy;

impl ExtensionStrategy for MathStrategy {
    fn render(&self, block: &ExtensionBlock, ctx: &RenderContext<'_>) -> String {
        let ExtensionBlock::MathBlock { expression } = block else {
            return plain_code(&block.tag(), block.source());
        };
        match ctx.services().math.render(expression, MathDisplay::Block) {
            Ok(markup) => format!("<div class=\"math-block\">{}</div>\n", markup),
            Err(e) => {
                warn!("Math block failed to render: {}", e);
                format!(
                    "<div class=\"math-error\">Error rendering equation: {}</div>\n",
                    html_escape(e.message())
                )
            }
        }
    }
}

/// Emit a diagram placeholder; the Post-Render Pass materializes it.
pub struct DiagramStrategy;

impl ExtensionStrategy for DiagramStrategy {
    fn render(&self, block: &ExtensionBlock, _ctx: &RenderContext<'_>) -> String {
        let ExtensionBlock::DiagramBlock { id, spec } = block else {
            return plain_code(&block.tag(), block.source());
        };
        format!(
            "<div class=\"mermaid\" id=\"{}\">{}</div>\n",
            html_escape(id),
            html_escape(spec)
        )
    }
}

/// Highlight recognized languages, plain code otherwise.
pub struct CodeStrategy;

impl ExtensionStrategy for CodeStrategy {
    fn render(&self, block: &ExtensionBlock, ctx: &RenderContext<'_>) -> String {
        let ExtensionBlock::CodeBlock { language, source } = block else {
            return plain_code(&block.tag(), block.source());
        };
        if language.is_empty() {
            return plain_code(language, source);
        }
        match ctx.services().highlighter.highlight(source, language) {
            Ok(Some(highlighted)) => format!(
                "<pre><code class=\"language-{}\" data-highlighted=\"yes\">{}</code></pre>\n",
                html_escape(language),
                highlighted
            ),
            Ok(None) => plain_code(language, source),
            Err(e) => {
                warn!("Highlighting {} block failed: {}", language, e);
                plain_code(language, source)
            }
        }
    }
}

/// Typeset `$...$` code spans inline.
pub struct InlineMathStrategy;

impl ExtensionStrategy for InlineMathStrategy {
    fn render(&self, block: &ExtensionBlock, ctx: &RenderContext<'_>) -> String {
        let ExtensionBlock::InlineMath { expression } = block else {
            return format!("<code>{}</code>", html_escape(block.source()));
        };
        match ctx.services().math.render(expression, MathDisplay::Inline) {
            Ok(markup) => format!("<span class=\"math-inline\">{}</span>", markup),
            Err(e) => {
                warn!("Inline math failed to render: {}", e);
                format!(
                    "<span class=\"math-error\">Error rendering equation: {}</span>",
                    html_escape(e.message())
                )
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExtensionRenderer
// ─────────────────────────────────────────────────────────────────────────────

/// Dispatch table from language tag to strategy.
#[derive(Clone)]
pub struct ExtensionRenderer {
    strategies: HashMap<String, Arc<dyn ExtensionStrategy>>,
    fallback: Arc<dyn ExtensionStrategy>,
}

impl Default for ExtensionRenderer {
    fn default() -> Self {
        let mut renderer = Self {
            strategies: HashMap::new(),
            fallback: Arc::new(CodeStrategy),
        };
        renderer.register(MATH_TAG, Arc::new(MathStrategy));
        renderer.register(DIAGRAM_TAG, Arc::new(DiagramStrategy));
        renderer.register(INLINE_MATH_TAG, Arc::new(InlineMathStrategy));
        renderer
    }
}

impl std::fmt::Debug for ExtensionRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.strategies.keys().collect();
        tags.sort();
        f.debug_struct("ExtensionRenderer")
            .field("tags", &tags)
            .finish_non_exhaustive()
    }
}

impl ExtensionRenderer {
    /// Route blocks tagged `tag` to `strategy`.
    pub fn register(&mut self, tag: &str, strategy: Arc<dyn ExtensionStrategy>) {
        self.strategies.insert(tag.to_ascii_lowercase(), strategy);
    }

    /// Render any block through its strategy.
    pub fn render(&self, block: &ExtensionBlock, ctx: &RenderContext<'_>) -> String {
        self.strategies
            .get(&block.tag())
            .unwrap_or(&self.fallback)
            .render(block, ctx)
    }

    /// Render a fenced block.
    pub fn render_fence(&self, info: &str, source: &str, ctx: &mut RenderContext<'_>) -> String {
        let block = ExtensionBlock::from_fence(info, source, ctx);
        self.render(&block, ctx)
    }

    /// Render an inline code span if it is an extension; `None` leaves the
    /// span to the default renderer.
    pub fn render_code_span(&self, code: &str, ctx: &RenderContext<'_>) -> Option<String> {
        ExtensionBlock::from_code_span(code).map(|block| self.render(&block, ctx))
    }
}
