//! Markdown Compiler
//!
//! Wraps comrak (CommonMark + GFM). The parsed AST is rewritten in place
//! before rendering: fenced code blocks and `$...$` code spans go through the
//! Extension Renderer, headings are rendered with a slug id attached, and
//! `<input>` tags are dropped from raw HTML so that every checkbox in the
//! output belongs to a task-list item.

use super::extensions::{ExtensionRenderer, RenderContext};
use super::html_escape;
use super::services::RenderServices;
use super::slug::heading_id;
use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::{format_html, parse_document, Arena, Options};
use log::{debug, warn};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Instant;

const RAW_INPUT_PATTERN: &str = r"(?i)<input\b[^>]*>";

static RAW_INPUT: OnceLock<Option<Regex>> = OnceLock::new();

/// Parser and renderer options shared by the compiler and task-marker lookup.
///
/// Raw HTML is passed through on purpose: the Sanitizer is the safety
/// boundary, and extension output is itself injected as raw HTML.
pub fn comrak_options() -> Options {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;

    options.parse.smart = true;

    options.render.hardbreaks = true;
    options.render.unsafe_ = true;

    options
}

/// Turns Source Document text into raw HTML.
#[derive(Debug, Clone, Default)]
pub struct MarkdownCompiler {
    services: RenderServices,
    extensions: ExtensionRenderer,
}

impl MarkdownCompiler {
    pub fn new(services: RenderServices) -> Self {
        Self {
            services,
            extensions: ExtensionRenderer::default(),
        }
    }

    /// Use a custom strategy table.
    pub fn with_extensions(mut self, extensions: ExtensionRenderer) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn services(&self) -> &RenderServices {
        &self.services
    }

    /// Compile `text` to raw (unsanitized) HTML.
    ///
    /// Never fails: every construct that cannot be rendered degrades to its
    /// fallback markup.
    pub fn compile(&self, text: &str) -> String {
        let started = Instant::now();
        let arena = Arena::new();
        let options = comrak_options();
        let root = parse_document(&arena, text, &options);
        let nodes: Vec<&AstNode<'_>> = root.descendants().collect();

        // Heading ids come from the source text of the heading, so collect
        // them before code spans are rewritten into markup.
        let headings: Vec<(&AstNode<'_>, u8, Option<String>)> = nodes
            .iter()
            .filter_map(|node| {
                let level = match &node.data.borrow().value {
                    NodeValue::Heading(heading) => heading.level,
                    _ => return None,
                };
                Some((*node, level, heading_id(&plain_text(node))))
            })
            .collect();

        let mut ctx = RenderContext::new(&self.services);
        for node in &nodes {
            let replacement = match &node.data.borrow().value {
                NodeValue::CodeBlock(block) => {
                    let mut literal =
                        self.extensions
                            .render_fence(&block.info, &block.literal, &mut ctx);
                    if !literal.ends_with('\n') {
                        literal.push('\n');
                    }
                    Some(NodeValue::HtmlBlock(NodeHtmlBlock {
                        block_type: 0,
                        literal,
                    }))
                }
                NodeValue::Code(code) => self
                    .extensions
                    .render_code_span(&code.literal, &ctx)
                    .map(NodeValue::HtmlInline),
                NodeValue::HtmlBlock(block) => {
                    strip_raw_inputs(&block.literal).map(|literal| {
                        NodeValue::HtmlBlock(NodeHtmlBlock {
                            block_type: block.block_type,
                            literal,
                        })
                    })
                }
                NodeValue::HtmlInline(html) => strip_raw_inputs(html).map(NodeValue::HtmlInline),
                _ => None,
            };
            if let Some(value) = replacement {
                node.data.borrow_mut().value = value;
            }
        }

        for (node, level, id) in headings {
            let mut buffer = Vec::new();
            if let Err(e) = format_html(node, &options, &mut buffer) {
                warn!("Failed to render heading: {}", e);
                continue;
            }
            let mut html = String::from_utf8_lossy(&buffer).into_owned();
            if let Some(id) = id {
                let open = format!("<h{}", level);
                html = html.replacen(&open, &format!("{} id=\"{}\"", open, html_escape(&id)), 1);
            }

            let children: Vec<_> = node.children().collect();
            for child in children {
                child.detach();
            }
            node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        }

        let mut output = Vec::new();
        if let Err(e) = format_html(root, &options, &mut output) {
            warn!("Failed to render document: {}", e);
        }
        debug!(
            "Compiled {} bytes of markdown to {} bytes of HTML in {:?}",
            text.len(),
            output.len(),
            started.elapsed()
        );
        String::from_utf8_lossy(&output).into_owned()
    }
}

/// `html` without its `<input>` tags, or `None` if it has none.
///
/// Task checkboxes are matched to source task markers by ordinal; an input
/// from raw HTML would take an ordinal no marker accounts for.
fn strip_raw_inputs(html: &str) -> Option<String> {
    let pattern = RAW_INPUT
        .get_or_init(|| Regex::new(RAW_INPUT_PATTERN).ok())
        .as_ref()?;
    if !pattern.is_match(html) {
        return None;
    }
    Some(pattern.replace_all(html, "").into_owned())
}

/// Concatenated text of a node's descendants, code spans included.
fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            _ => {}
        }
    }
    text
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
