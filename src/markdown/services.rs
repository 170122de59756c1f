//! Rendering services used by the Extension Renderer and the Post-Render Pass.
//!
//! Math typesetting, diagram rendering and syntax highlighting are injected as
//! stateless trait objects. Anything that varies between calls (the theme, the
//! display style) is a parameter, never global state.

use super::diagram::FlowchartRenderer;
use super::math::MathmlRenderer;
use super::syntax::SyntectHighlighter;
use crate::config::Theme;
use std::fmt;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// ExtensionError
// ─────────────────────────────────────────────────────────────────────────────

/// A failure scoped to one extension block or span.
///
/// Never propagated out of a compile: callers turn it into a visible error
/// marker and carry on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// The math expression could not be typeset
    Math(String),
    /// The diagram spec could not be parsed or rendered
    Diagram(String),
    /// The highlighter failed on the source
    Highlight(String),
}

impl ExtensionError {
    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            ExtensionError::Math(msg)
            | ExtensionError::Diagram(msg)
            | ExtensionError::Highlight(msg) => msg,
        }
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionError::Math(msg) => write!(f, "Math error: {}", msg),
            ExtensionError::Diagram(msg) => write!(f, "Diagram error: {}", msg),
            ExtensionError::Highlight(msg) => write!(f, "Highlight error: {}", msg),
        }
    }
}

impl std::error::Error for ExtensionError {}

// ─────────────────────────────────────────────────────────────────────────────
// Service Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Whether math is set on its own line or inside running text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathDisplay {
    Block,
    Inline,
}

/// TeX-like expression to markup.
pub trait MathRenderer: Send + Sync {
    fn render(&self, expression: &str, display: MathDisplay) -> Result<String, ExtensionError>;
}

/// Diagram spec to vector markup, in the colors of `theme`.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, spec: &str, theme: Theme) -> Result<String, ExtensionError>;
}

/// Language-aware highlighter.
pub trait CodeHighlighter: Send + Sync {
    /// Highlight `source` as `language`.
    ///
    /// Returns `Ok(None)` when the language is not recognized, so the caller
    /// can emit plain code instead.
    fn highlight(&self, source: &str, language: &str) -> Result<Option<String>, ExtensionError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderServices
// ─────────────────────────────────────────────────────────────────────────────

/// The bundle of services a pipeline run calls into.
#[derive(Clone)]
pub struct RenderServices {
    pub math: Arc<dyn MathRenderer>,
    pub diagrams: Arc<dyn DiagramRenderer>,
    pub highlighter: Arc<dyn CodeHighlighter>,
}

impl Default for RenderServices {
    fn default() -> Self {
        Self {
            math: Arc::new(MathmlRenderer),
            diagrams: Arc::new(FlowchartRenderer),
            highlighter: SyntectHighlighter::shared(),
        }
    }
}

impl fmt::Debug for RenderServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderServices").finish_non_exhaustive()
    }
}

impl RenderServices {
    /// Replace the math renderer.
    pub fn with_math(mut self, math: Arc<dyn MathRenderer>) -> Self {
        self.math = math;
        self
    }

    /// Replace the diagram renderer.
    pub fn with_diagrams(mut self, diagrams: Arc<dyn DiagramRenderer>) -> Self {
        self.diagrams = diagrams;
        self
    }

    /// Replace the code highlighter.
    pub fn with_highlighter(mut self, highlighter: Arc<dyn CodeHighlighter>) -> Self {
        self.highlighter = highlighter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_error_display() {
        let err = ExtensionError::Math("unexpected `}`".to_string());
        assert_eq!(err.to_string(), "Math error: unexpected `}`");
        assert_eq!(err.message(), "unexpected `}`");

        let err = ExtensionError::Diagram("Unsupported diagram type: pie".to_string());
        assert!(err.to_string().starts_with("Diagram error"));
    }
}
