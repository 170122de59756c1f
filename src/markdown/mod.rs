//! Markdown compilation module
//!
//! This module turns raw Markdown into raw HTML using the comrak library, a
//! CommonMark + GFM compatible parser, with an extension layer on top:
//!
//! - `math` fences and `$...$` code spans are typeset to MathML
//! - `mermaid` fences become diagram placeholders
//! - other fences are syntax highlighted with syntect
//! - headings carry `heading-<slug>` ids
//!
//! # Example
//! ```ignore
//! use marklive::markdown::{MarkdownCompiler, RenderServices};
//!
//! let compiler = MarkdownCompiler::new(RenderServices::default());
//! let raw_html = compiler.compile("# Hello\n\n```math\nx^2\n```");
//! ```

mod compiler;
pub mod diagram;
mod extensions;
mod math;
mod services;
mod slug;
pub mod syntax;

pub use compiler::{comrak_options, MarkdownCompiler};
pub use diagram::FlowchartRenderer;
pub use extensions::{
    plain_code, CodeStrategy, DiagramStrategy, ExtensionBlock, ExtensionRenderer,
    ExtensionStrategy, InlineMathStrategy, MathStrategy, RenderContext, DIAGRAM_ID_PREFIX,
    DIAGRAM_TAG, INLINE_MATH_TAG, MATH_TAG,
};
pub use math::MathmlRenderer;
pub use services::{
    CodeHighlighter, DiagramRenderer, ExtensionError, MathDisplay, MathRenderer, RenderServices,
};
pub use slug::{heading_id, slugify, HEADING_ID_PREFIX};
pub use syntax::SyntectHighlighter;

/// HTML-escape a string for text content or a quoted attribute value.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">"), "&lt;a href=&quot;x&quot;&gt;");
        assert_eq!(html_escape("Tom & Jerry's"), "Tom &amp; Jerry&#39;s");
    }
}
