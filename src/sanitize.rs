//! Allow-list HTML sanitizer
//!
//! Everything the compiler emits passes through here before it reaches the
//! rendered document. The allow-list covers standard rich text, task-list
//! checkboxes, MathML and the SVG subset produced by diagrams; anything not on
//! it (scripts, event handlers, iframes, unknown attributes) is dropped
//! silently.

use ammonia::Builder;

/// Diagram vector markup.
const SVG_TAGS: &[&str] = &[
    "svg",
    "g",
    "path",
    "line",
    "polygon",
    "text",
    "rect",
    "circle",
    "foreignObject",
];

/// Typeset math markup.
const MATH_TAGS: &[&str] = &[
    "math",
    "semantics",
    "annotation",
    "mrow",
    "mi",
    "mo",
    "mn",
    "ms",
    "mtext",
    "mspace",
    "msup",
    "msub",
    "msubsup",
    "mfrac",
    "msqrt",
    "mroot",
    "mover",
    "munder",
    "munderover",
    "mtable",
    "mtr",
    "mtd",
    "mstyle",
    "menclose",
    "mpadded",
    "mphantom",
];

const GENERIC_ATTRIBUTES: &[&str] = &["class", "id"];

const SVG_ATTRIBUTES: &[&str] = &[
    "xmlns",
    "viewBox",
    "width",
    "height",
    "x",
    "y",
    "x1",
    "y1",
    "x2",
    "y2",
    "cx",
    "cy",
    "r",
    "rx",
    "ry",
    "d",
    "points",
    "fill",
    "stroke",
    "stroke-width",
    "stroke-dasharray",
    "transform",
    "text-anchor",
    "dominant-baseline",
    "font-family",
    "font-size",
];

const MATH_ATTRIBUTES: &[&str] = &[
    "xmlns",
    "display",
    "displaystyle",
    "scriptlevel",
    "mathvariant",
    "stretchy",
    "fence",
    "separator",
    "lspace",
    "rspace",
    "accent",
    "accentunder",
    "movablelimits",
    "minsize",
    "maxsize",
    "linethickness",
    "columnalign",
    "notation",
    "width",
    "height",
    "depth",
    "encoding",
];

/// Allow-list sanitizer over ammonia.
pub struct Sanitizer {
    builder: Builder<'static>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        let mut builder = Builder::default();
        builder
            .add_tags(&["input"])
            .add_tags(SVG_TAGS)
            .add_tags(MATH_TAGS)
            .add_generic_attributes(GENERIC_ATTRIBUTES)
            .add_tag_attributes("input", &["checked", "disabled"])
            .set_tag_attribute_value("input", "type", "checkbox")
            .add_tag_attributes("code", &["data-highlighted"])
            .add_tag_attributes("th", &["align"])
            .add_tag_attributes("td", &["align"])
            // link hardening happens after commit, per link
            .link_rel(None);

        for tag in SVG_TAGS {
            builder.add_tag_attributes(tag, SVG_ATTRIBUTES);
        }
        for tag in MATH_TAGS {
            builder.add_tag_attributes(tag, MATH_ATTRIBUTES);
        }

        Self { builder }
    }

    /// Sanitize untrusted HTML.
    pub fn sanitize(&self, raw_html: &str) -> String {
        self.builder.clean(raw_html).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> String {
        Sanitizer::new().sanitize(html)
    }

    #[test]
    fn test_scripts_and_handlers_are_stripped() {
        let out = clean("<p onclick=\"steal()\">hi</p><script>alert(1)</script>");
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn test_iframes_and_unknown_attributes_are_stripped() {
        let out = clean("<iframe src=\"https://evil.example\"></iframe><div style=\"x\" data-x=\"1\">ok</div>");
        assert_eq!(out, "<div>ok</div>");
    }

    #[test]
    fn test_heading_ids_and_classes_survive() {
        let out = clean("<h2 id=\"heading-a\" class=\"x\">A</h2>");
        assert_eq!(out, "<h2 id=\"heading-a\" class=\"x\">A</h2>");
    }

    #[test]
    fn test_links_get_no_rel() {
        let out = clean("<a href=\"https://example.com\">x</a>");
        assert_eq!(out, "<a href=\"https://example.com\">x</a>");
    }

    #[test]
    fn test_checkboxes_are_kept_and_forced_to_checkbox() {
        let out = clean("<input type=\"checkbox\" checked=\"\" disabled=\"\">");
        assert!(out.contains("type=\"checkbox\""));
        assert!(out.contains("checked"));

        let out = clean("<input type=\"text\" value=\"x\">");
        assert!(out.contains("type=\"checkbox\""));
        assert!(!out.contains("value"));
    }

    #[test]
    fn test_svg_survives() {
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 10 10\" width=\"10\" height=\"10\"><g class=\"nodes\"><rect x=\"1\" y=\"1\" width=\"5\" height=\"5\" fill=\"#fff\"></rect><text x=\"2\" y=\"2\">A</text></g></svg>";
        let out = clean(svg);
        assert!(out.contains("viewBox=\"0 0 10 10\""));
        assert!(out.contains("<rect"));
        assert!(out.contains(">A</text>"));
    }

    #[test]
    fn test_svg_script_is_stripped() {
        let out = clean("<svg><script>alert(1)</script><circle cx=\"1\" cy=\"1\" r=\"1\" onload=\"x()\"></circle></svg>");
        assert!(!out.contains("script"));
        assert!(!out.contains("onload"));
        assert!(out.contains("<circle"));
    }

    #[test]
    fn test_mathml_survives() {
        let out = clean("<math display=\"block\"><mrow><msup><mi>x</mi><mn>2</mn></msup></mrow></math>");
        assert!(out.contains("<math display=\"block\">"));
        assert!(out.contains("<msup><mi>x</mi><mn>2</mn></msup>"));
    }

    #[test]
    fn test_highlight_markers_survive() {
        let out = clean("<pre><code class=\"language-rust\" data-highlighted=\"yes\"><span class=\"hl-source\">x</span></code></pre>");
        assert!(out.contains("data-highlighted=\"yes\""));
        assert!(out.contains("<span class=\"hl-source\">x</span>"));
    }
}
