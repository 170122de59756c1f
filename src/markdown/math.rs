//! TeX math to MathML via `latex2mathml`.

use super::services::{ExtensionError, MathDisplay, MathRenderer};
use latex2mathml::{latex_to_mathml, DisplayStyle};

/// Default math renderer. Stateless: the output does not depend on the theme,
/// MathML inherits the surrounding text color.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathmlRenderer;

impl MathRenderer for MathmlRenderer {
    fn render(&self, expression: &str, display: MathDisplay) -> Result<String, ExtensionError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(ExtensionError::Math("empty expression".to_string()));
        }
        let style = match display {
            MathDisplay::Block => DisplayStyle::Block,
            MathDisplay::Inline => DisplayStyle::Inline,
        };
        latex_to_mathml(expression, style).map_err(|e| ExtensionError::Math(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_block_and_inline() {
        let block = MathmlRenderer
            .render("E = mc^2", MathDisplay::Block)
            .unwrap();
        assert!(block.contains("<math"));
        assert!(block.contains("display=\"block\""));

        let inline = MathmlRenderer
            .render("x^2", MathDisplay::Inline)
            .unwrap();
        assert!(inline.contains("<math"));
        assert!(!inline.contains("display=\"block\""));
    }

    #[test]
    fn test_empty_expression_is_an_error() {
        let err = MathmlRenderer.render("  ", MathDisplay::Block).unwrap_err();
        assert!(matches!(err, ExtensionError::Math(_)));
    }
}
