//! Flowchart diagrams to SVG.
//!
//! Understands the Mermaid `graph` / `flowchart` subset used in everyday
//! notes: a direction header, nodes with `[]`, `()`, `{}` and `(())` shapes,
//! and chains of `-->`, `---`, `-.->` and `==>` edges with optional `|label|`.
//! Styling statements (`style`, `classDef`, `click`, `subgraph`, ...) are
//! accepted and ignored. Other diagram kinds are reported as errors.
//!
//! The output only uses `svg`, `g`, `rect`, `circle`, `polygon`, `line`,
//! `path` and `text`, so it survives the sanitizer untouched.

use super::html_escape;
use super::services::{DiagramRenderer, ExtensionError};
use crate::config::Theme;
use log::debug;
use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

const MARGIN: i32 = 20;
const RANK_GAP: i32 = 60;
const NODE_GAP: i32 = 40;
const NODE_HEIGHT: i32 = 40;
const CHAR_WIDTH: i32 = 8;
const FONT_SIZE: i32 = 14;
const ARROW_SIZE: f64 = 8.0;
const BACK_EDGE_BEND: f64 = 40.0;

/// Statements that carry styling or grouping only.
const IGNORED_KEYWORDS: &[&str] = &[
    "subgraph",
    "end",
    "style",
    "classdef",
    "class",
    "click",
    "linkstyle",
    "direction",
];

// ─────────────────────────────────────────────────────────────────────────────
// Model
// ─────────────────────────────────────────────────────────────────────────────

/// Flow direction from the header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

impl Direction {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "td" | "tb" => Some(Direction::TopDown),
            "bt" => Some(Direction::BottomUp),
            "lr" => Some(Direction::LeftRight),
            "rl" => Some(Direction::RightLeft),
            _ => None,
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftRight | Direction::RightLeft)
    }

    fn is_reversed(self) -> bool {
        matches!(self, Direction::BottomUp | Direction::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rect,
    Round,
    Diamond,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dotted,
    Thick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub label: Option<String>,
    pub style: LineStyle,
    pub arrow: bool,
}

/// A parsed flowchart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flowchart {
    pub direction: Direction,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a flowchart spec.
pub fn parse_flowchart(spec: &str) -> Result<Flowchart, ExtensionError> {
    let mut lines = spec
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, strip_comment(line).trim()))
        .filter(|(_, line)| !line.is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(ExtensionError::Diagram("empty diagram".to_string()));
    };
    let mut chart = Flowchart {
        direction: parse_header(header)?,
        nodes: Vec::new(),
        edges: Vec::new(),
    };

    for (line_no, line) in lines {
        for statement in line.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let keyword = statement
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if IGNORED_KEYWORDS.contains(&keyword.as_str()) {
                debug!("Ignoring flowchart statement on line {}: {}", line_no, statement);
                continue;
            }
            chart
                .parse_statement(statement)
                .map_err(|msg| ExtensionError::Diagram(format!("line {}: {}", line_no, msg)))?;
        }
    }

    Ok(chart)
}

fn strip_comment(line: &str) -> &str {
    match line.find("%%") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_header(line: &str) -> Result<Direction, ExtensionError> {
    let mut parts = line.split_whitespace();
    let kind = parts.next().unwrap_or_default();
    if !kind.eq_ignore_ascii_case("graph") && !kind.eq_ignore_ascii_case("flowchart") {
        return Err(ExtensionError::Diagram(format!(
            "Unsupported diagram type: {}",
            kind
        )));
    }
    match parts.next() {
        None => Ok(Direction::TopDown),
        Some(dir) => Direction::parse(dir)
            .ok_or_else(|| ExtensionError::Diagram(format!("Unknown direction: {}", dir))),
    }
}

impl Flowchart {
    /// Parse `A[x] --> B -->|label| C` into nodes and edges.
    fn parse_statement(&mut self, statement: &str) -> Result<(), String> {
        let mut rest = statement;
        let mut prev = self.parse_node_ref(&mut rest)?;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                return Ok(());
            }
            let (style, arrow, len) = match_edge(rest)
                .ok_or_else(|| format!("expected an edge after `{}`, found `{}`", self.nodes[prev].id, rest))?;
            rest = rest[len..].trim_start();

            let mut label = None;
            if let Some(stripped) = rest.strip_prefix('|') {
                let end = stripped
                    .find('|')
                    .ok_or_else(|| "unterminated edge label".to_string())?;
                label = Some(stripped[..end].trim().to_string()).filter(|l| !l.is_empty());
                rest = stripped[end + 1..].trim_start();
            }

            let next = self.parse_node_ref(&mut rest)?;
            self.edges.push(Edge {
                from: prev,
                to: next,
                label,
                style,
                arrow,
            });
            prev = next;
        }
    }

    /// Parse a node id with an optional shape, returning its index.
    fn parse_node_ref(&mut self, rest: &mut &str) -> Result<usize, String> {
        let text = rest.trim_start();
        let id_len = text
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        if id_len == 0 {
            return Err(format!("expected a node id at `{}`", text));
        }
        let (id, after) = text.split_at(id_len);
        let (shape, consumed) = parse_shape(after)?;
        *rest = &after[consumed..];
        Ok(self.node(id, shape))
    }

    fn node(&mut self, id: &str, shape: Option<(Shape, String)>) -> usize {
        if let Some(index) = self.nodes.iter().position(|n| n.id == id) {
            if let Some((shape, label)) = shape {
                self.nodes[index].shape = shape;
                self.nodes[index].label = label;
            }
            return index;
        }
        let (shape, label) = shape.unwrap_or_else(|| (Shape::Rect, id.to_string()));
        self.nodes.push(Node {
            id: id.to_string(),
            label,
            shape,
        });
        self.nodes.len() - 1
    }
}

fn parse_shape(text: &str) -> Result<(Option<(Shape, String)>, usize), String> {
    const SHAPES: [(&str, &str, Shape); 4] = [
        ("((", "))", Shape::Circle),
        ("[", "]", Shape::Rect),
        ("(", ")", Shape::Round),
        ("{", "}", Shape::Diamond),
    ];
    for (open, close, shape) in SHAPES {
        if let Some(inner) = text.strip_prefix(open) {
            let end = inner
                .find(close)
                .ok_or_else(|| format!("missing `{}`", close))?;
            let label = inner[..end].trim().trim_matches('"').to_string();
            return Ok((Some((shape, label)), open.len() + end + close.len()));
        }
    }
    Ok((None, 0))
}

/// Match an edge operator at the start of `text`: `(style, has_arrow, byte_len)`.
fn match_edge(text: &str) -> Option<(LineStyle, bool, usize)> {
    let bytes = text.as_bytes();
    let (style, body) = if text.starts_with("-.") {
        let dots = bytes[1..].iter().take_while(|&&b| b == b'.').count();
        if bytes.get(1 + dots) != Some(&b'-') {
            return None;
        }
        (LineStyle::Dotted, dots + 2)
    } else {
        let lead = *bytes.first()?;
        if lead != b'-' && lead != b'=' {
            return None;
        }
        let run = bytes.iter().take_while(|&&b| b == lead).count();
        if run < 2 {
            return None;
        }
        let style = if lead == b'=' {
            LineStyle::Thick
        } else {
            LineStyle::Solid
        };
        (style, run)
    };
    let arrow = bytes.get(body) == Some(&b'>');
    if !arrow && body < 3 {
        return None;
    }
    Some((style, arrow, body + usize::from(arrow)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Placed {
    cx: i32,
    cy: i32,
    width: i32,
    height: i32,
}

impl Flowchart {
    /// Edges that close a cycle, found by depth-first search in declaration order.
    fn back_edges(&self) -> Vec<bool> {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (index, edge) in self.edges.iter().enumerate() {
            adjacency[edge.from].push(index);
        }

        let mut state = vec![Visit::New; self.nodes.len()];
        let mut back = vec![false; self.edges.len()];
        for root in 0..self.nodes.len() {
            if state[root] != Visit::New {
                continue;
            }
            state[root] = Visit::Active;
            let mut stack = vec![(root, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (node, cursor) = *top;
                if let Some(&edge) = adjacency[node].get(cursor) {
                    top.1 += 1;
                    let target = self.edges[edge].to;
                    match state[target] {
                        Visit::New => {
                            state[target] = Visit::Active;
                            stack.push((target, 0));
                        }
                        Visit::Active => back[edge] = true,
                        Visit::Done => {}
                    }
                } else {
                    state[node] = Visit::Done;
                    stack.pop();
                }
            }
        }
        back
    }

    /// Longest-path rank of every node over the acyclic edges.
    fn ranks(&self, back: &[bool]) -> Vec<usize> {
        let mut rank = vec![0usize; self.nodes.len()];
        for _ in 0..self.nodes.len() {
            let mut changed = false;
            for (edge, is_back) in self.edges.iter().zip(back) {
                if !is_back && rank[edge.to] < rank[edge.from] + 1 {
                    rank[edge.to] = rank[edge.from] + 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        rank
    }

    fn layout(&self, ranks: &[usize]) -> (Vec<Placed>, i32, i32) {
        let horizontal = self.direction.is_horizontal();
        let sizes: Vec<(i32, i32)> = self.nodes.iter().map(node_size).collect();
        // (main, cross) axes: main follows the ranks
        let axis = |(w, h): (i32, i32)| if horizontal { (w, h) } else { (h, w) };

        let layer_count = ranks.iter().copied().max().map_or(0, |r| r + 1);
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
        for (node, &rank) in ranks.iter().enumerate() {
            layers[rank].push(node);
        }

        let extents: Vec<i32> = layers
            .iter()
            .map(|layer| layer.iter().map(|&n| axis(sizes[n]).0).max().unwrap_or(0))
            .collect();
        let cross_totals: Vec<i32> = layers
            .iter()
            .map(|layer| {
                let sum: i32 = layer.iter().map(|&n| axis(sizes[n]).1).sum();
                sum + NODE_GAP * (layer.len() as i32 - 1).max(0)
            })
            .collect();
        let cross_max = cross_totals.iter().copied().max().unwrap_or(0);
        let main_total =
            extents.iter().sum::<i32>() + RANK_GAP * (layer_count as i32 - 1).max(0);

        let mut placed = vec![
            Placed {
                cx: 0,
                cy: 0,
                width: 0,
                height: 0,
            };
            self.nodes.len()
        ];
        let mut main_offset = MARGIN;
        for (l, layer) in layers.iter().enumerate() {
            let mut cross = MARGIN + (cross_max - cross_totals[l]) / 2;
            for &node in layer {
                let (width, height) = sizes[node];
                let (_, cross_size) = axis(sizes[node]);
                let mut main = main_offset + extents[l] / 2;
                if self.direction.is_reversed() {
                    main = 2 * MARGIN + main_total - main;
                }
                let cross_center = cross + cross_size / 2;
                let (cx, cy) = if horizontal {
                    (main, cross_center)
                } else {
                    (cross_center, main)
                };
                placed[node] = Placed {
                    cx,
                    cy,
                    width,
                    height,
                };
                cross += cross_size + NODE_GAP;
            }
            main_offset += extents[l] + RANK_GAP;
        }

        let (width, height) = if horizontal {
            (main_total, cross_max)
        } else {
            (cross_max, main_total)
        };
        (placed, width + 2 * MARGIN, height + 2 * MARGIN)
    }
}

fn node_size(node: &Node) -> (i32, i32) {
    let text = node.label.chars().count() as i32 * CHAR_WIDTH;
    match node.shape {
        Shape::Rect | Shape::Round => (text + 32, NODE_HEIGHT),
        Shape::Diamond => (text + 56, NODE_HEIGHT + 20),
        Shape::Circle => {
            let d = (text + 24).max(50);
            (d, d)
        }
    }
}

/// Point where the ray from the node center towards `(dx, dy)` leaves the box.
fn boundary_point(p: &Placed, dx: f64, dy: f64) -> (f64, f64) {
    let hw = f64::from(p.width) / 2.0;
    let hh = f64::from(p.height) / 2.0;
    let tx = if dx.abs() > f64::EPSILON { hw / dx.abs() } else { f64::INFINITY };
    let ty = if dy.abs() > f64::EPSILON { hh / dy.abs() } else { f64::INFINITY };
    let t = tx.min(ty);
    (f64::from(p.cx) + dx * t, f64::from(p.cy) + dy * t)
}

// ─────────────────────────────────────────────────────────────────────────────
// SVG emission
// ─────────────────────────────────────────────────────────────────────────────

struct Palette {
    node_fill: &'static str,
    node_stroke: &'static str,
    text: &'static str,
    edge: &'static str,
    label_fill: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        if theme.is_dark() {
            Self {
                node_fill: "#1f2020",
                node_stroke: "#cccccc",
                text: "#e0e0e0",
                edge: "#d3d3d3",
                label_fill: "#585858",
            }
        } else {
            Self {
                node_fill: "#ECECFF",
                node_stroke: "#9370DB",
                text: "#333333",
                edge: "#333333",
                label_fill: "#e8e8e8",
            }
        }
    }
}

fn num(v: f64) -> String {
    format!("{:.1}", v)
}

impl Flowchart {
    /// Lay the chart out and emit SVG markup.
    pub fn to_svg(&self, theme: Theme) -> String {
        let palette = Palette::for_theme(theme);
        let back = self.back_edges();
        let ranks = self.ranks(&back);
        let (placed, width, height) = self.layout(&ranks);

        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" class="flowchart">"#,
            w = width,
            h = height
        );

        svg.push_str(r#"<g class="edges">"#);
        for (edge, &is_back) in self.edges.iter().zip(&back) {
            self.write_edge(&mut svg, edge, is_back, &placed, &palette);
        }
        svg.push_str("</g>");

        svg.push_str(r#"<g class="nodes">"#);
        for (node, p) in self.nodes.iter().zip(&placed) {
            write_node(&mut svg, node, p, &palette);
        }
        svg.push_str("</g></svg>");
        svg
    }

    fn write_edge(
        &self,
        svg: &mut String,
        edge: &Edge,
        is_back: bool,
        placed: &[Placed],
        palette: &Palette,
    ) {
        let a = &placed[edge.from];
        let b = &placed[edge.to];
        let (ax, ay) = (f64::from(a.cx), f64::from(a.cy));
        let (bx, by) = (f64::from(b.cx), f64::from(b.cy));
        let (dx, dy) = (bx - ax, by - ay);
        let len = (dx * dx + dy * dy).sqrt();

        let stroke_width = match edge.style {
            LineStyle::Thick => 3,
            _ => 1,
        };
        let dash = match edge.style {
            LineStyle::Dotted => r#" stroke-dasharray="3 3""#,
            _ => "",
        };

        if len < f64::EPSILON {
            // self-loop: a small arc above the node
            let top = ay - f64::from(a.height) / 2.0;
            let _ = write!(
                svg,
                r#"<path d="M {x1} {y} C {x1} {c} {x2} {c} {x2} {y}" fill="none" stroke="{s}" stroke-width="{sw}"{dash}/>"#,
                x1 = num(ax - 10.0),
                x2 = num(ax + 10.0),
                y = num(top),
                c = num(top - 30.0),
                s = palette.edge,
                sw = stroke_width,
                dash = dash
            );
            return;
        }

        let (ux, uy) = (dx / len, dy / len);
        let (sx, sy) = boundary_point(a, ux, uy);
        let (ex, ey) = boundary_point(b, -ux, -uy);

        // back edges bend sideways so they do not overlap the forward edge
        let (cx, cy) = if is_back {
            ((sx + ex) / 2.0 - uy * BACK_EDGE_BEND, (sy + ey) / 2.0 + ux * BACK_EDGE_BEND)
        } else {
            ((sx + ex) / 2.0, (sy + ey) / 2.0)
        };

        // arrow direction at the end of the (possibly curved) edge
        let (tx, ty) = (ex - cx, ey - cy);
        let tlen = (tx * tx + ty * ty).sqrt().max(f64::EPSILON);
        let (vx, vy) = (tx / tlen, ty / tlen);
        let (lx, ly) = if edge.arrow {
            (ex - vx * ARROW_SIZE, ey - vy * ARROW_SIZE)
        } else {
            (ex, ey)
        };

        if is_back {
            let _ = write!(
                svg,
                r#"<path d="M {} {} Q {} {} {} {}" fill="none" stroke="{}" stroke-width="{}"{}/>"#,
                num(sx),
                num(sy),
                num(cx),
                num(cy),
                num(lx),
                num(ly),
                palette.edge,
                stroke_width,
                dash
            );
        } else {
            let _ = write!(
                svg,
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"{}/>"#,
                num(sx),
                num(sy),
                num(lx),
                num(ly),
                palette.edge,
                stroke_width,
                dash
            );
        }

        if edge.arrow {
            let half = ARROW_SIZE / 2.0;
            let _ = write!(
                svg,
                r#"<polygon points="{},{} {},{} {},{}" fill="{}"/>"#,
                num(ex),
                num(ey),
                num(lx - vy * half),
                num(ly + vx * half),
                num(lx + vy * half),
                num(ly - vx * half),
                palette.edge
            );
        }

        if let Some(label) = &edge.label {
            // midpoint of the quadratic curve (equals the chord midpoint for lines)
            let mx = 0.25 * sx + 0.5 * cx + 0.25 * ex;
            let my = 0.25 * sy + 0.5 * cy + 0.25 * ey;
            let w = f64::from(label.chars().count() as i32 * CHAR_WIDTH + 8);
            let _ = write!(
                svg,
                r#"<rect x="{}" y="{}" width="{}" height="18" fill="{}"/>"#,
                num(mx - w / 2.0),
                num(my - 9.0),
                num(w),
                palette.label_fill
            );
            write_text(svg, mx, my, label, palette.text);
        }
    }
}

fn write_node(svg: &mut String, node: &Node, p: &Placed, palette: &Palette) {
    let (cx, cy) = (f64::from(p.cx), f64::from(p.cy));
    let (hw, hh) = (f64::from(p.width) / 2.0, f64::from(p.height) / 2.0);
    let paint = format!(
        r#"fill="{}" stroke="{}" stroke-width="1""#,
        palette.node_fill, palette.node_stroke
    );
    let _ = match node.shape {
        Shape::Rect | Shape::Round => write!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{r}" ry="{r}" {}/>"#,
            num(cx - hw),
            num(cy - hh),
            p.width,
            p.height,
            paint,
            r = if node.shape == Shape::Round { 12 } else { 0 }
        ),
        Shape::Diamond => write!(
            svg,
            r#"<polygon points="{},{} {},{} {},{} {},{}" {}/>"#,
            num(cx),
            num(cy - hh),
            num(cx + hw),
            num(cy),
            num(cx),
            num(cy + hh),
            num(cx - hw),
            num(cy),
            paint
        ),
        Shape::Circle => write!(
            svg,
            r#"<circle cx="{}" cy="{}" r="{}" {}/>"#,
            num(cx),
            num(cy),
            num(hw),
            paint
        ),
    };
    write_text(svg, cx, cy, &node.label, palette.text);
}

fn write_text(svg: &mut String, x: f64, y: f64, text: &str, fill: &str) {
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" dominant-baseline="central" font-family="sans-serif" font-size="{}" fill="{}">{}</text>"#,
        num(x),
        num(y),
        FONT_SIZE,
        fill,
        html_escape(text)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// Default diagram renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowchartRenderer;

impl DiagramRenderer for FlowchartRenderer {
    fn render(&self, spec: &str, theme: Theme) -> Result<String, ExtensionError> {
        let chart = parse_flowchart(spec)?;
        debug!(
            "Rendering flowchart with {} nodes and {} edges",
            chart.nodes.len(),
            chart.edges.len()
        );
        Ok(chart.to_svg(theme))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    const SAMPLE: &str = "graph TD\n    A[Start] --> B{Is it working?}\n    B -->|Yes| C[Great!]\n    B -->|No| D[Debug]\n    D --> B\n";

    #[test]
    fn test_parse_header_directions() {
        assert_eq!(parse_flowchart("graph").unwrap().direction, Direction::TopDown);
        assert_eq!(parse_flowchart("flowchart LR").unwrap().direction, Direction::LeftRight);
        assert_eq!(parse_flowchart("graph bt").unwrap().direction, Direction::BottomUp);
        assert!(parse_flowchart("graph XY").is_err());
    }

    #[test]
    fn test_unsupported_diagram_type() {
        let err = parse_flowchart("sequenceDiagram\n  Alice->>Bob: hi").unwrap_err();
        assert_eq!(
            err,
            ExtensionError::Diagram("Unsupported diagram type: sequenceDiagram".to_string())
        );
        assert!(parse_flowchart("  \n%% only a comment\n").is_err());
    }

    #[test]
    fn test_parse_sample() {
        let chart = parse_flowchart(SAMPLE).unwrap();
        let ids: Vec<&str> = chart.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
        assert_eq!(chart.nodes[1].shape, Shape::Diamond);
        assert_eq!(chart.nodes[1].label, "Is it working?");
        assert_eq!(chart.edges.len(), 4);
        assert_eq!(chart.edges[1].label.as_deref(), Some("Yes"));
    }

    #[test]
    fn test_parse_chains_shapes_and_edge_styles() {
        let chart =
            parse_flowchart("graph LR\nA((Hub)) -.-> B(Round) ==> C --- D; D --> A %% loop").unwrap();
        assert_eq!(chart.nodes[0].shape, Shape::Circle);
        assert_eq!(chart.nodes[1].shape, Shape::Round);
        assert_eq!(chart.nodes[2].label, "C");
        let styles: Vec<(LineStyle, bool)> = chart.edges.iter().map(|e| (e.style, e.arrow)).collect();
        assert_eq!(
            styles,
            vec![
                (LineStyle::Dotted, true),
                (LineStyle::Thick, true),
                (LineStyle::Solid, false),
                (LineStyle::Solid, true),
            ]
        );
    }

    #[test]
    fn test_styling_statements_are_ignored() {
        let chart = parse_flowchart("graph TD\nA --> B\nstyle A fill:#f9f\nclassDef x fill:#fff\n").unwrap();
        assert_eq!(chart.nodes.len(), 2);
    }

    #[test]
    fn test_parse_error_names_the_line() {
        let err = parse_flowchart("graph TD\nA --> B\nA -> \n").unwrap_err();
        assert!(err.message().starts_with("line 3:"), "{}", err);

        let err = parse_flowchart("graph TD\nA[unclosed --> B").unwrap_err();
        assert!(err.message().contains("missing `]`"));
    }

    #[test]
    fn test_cycles_do_not_inflate_ranks() {
        let chart = parse_flowchart(SAMPLE).unwrap();
        let back = chart.back_edges();
        assert_eq!(back, vec![false, false, false, true]);
        assert_eq!(chart.ranks(&back), vec![0, 1, 2, 2]);
    }

    #[test]
    fn test_svg_uses_only_vector_elements() {
        let svg = FlowchartRenderer.render(SAMPLE, Theme::Light).unwrap();
        assert!(svg.starts_with("<svg"));
        let allowed = ["svg", "g", "rect", "circle", "polygon", "line", "path", "text"];
        let tags = Regex::new(r"<([a-zA-Z]+)").unwrap();
        for cap in tags.captures_iter(&svg) {
            assert!(allowed.contains(&&cap[1]), "unexpected <{}>", &cap[1]);
        }
        assert!(svg.contains(">Is it working?</text>"));
        assert!(svg.contains(">Yes</text>"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let svg = FlowchartRenderer
            .render("graph TD\nA[<b>x</b> & y] --> B", Theme::Light)
            .unwrap();
        assert!(svg.contains("&lt;b&gt;x&lt;/b&gt; &amp; y"));
    }

    #[test]
    fn test_theme_changes_colors_only() {
        let light = FlowchartRenderer.render(SAMPLE, Theme::Light).unwrap();
        let dark = FlowchartRenderer.render(SAMPLE, Theme::Dark).unwrap();
        assert!(light.contains("#ECECFF"));
        assert!(dark.contains("#1f2020"));
        assert_ne!(light, dark);
        assert_eq!(light, FlowchartRenderer.render(SAMPLE, Theme::Light).unwrap());
    }

    #[test]
    fn test_reversed_direction_flips_layout() {
        let down = parse_flowchart("graph TD\nA --> B").unwrap();
        let up = parse_flowchart("graph BT\nA --> B").unwrap();
        let (down_placed, _, _) = down.layout(&down.ranks(&down.back_edges()));
        let (up_placed, _, _) = up.layout(&up.ranks(&up.back_edges()));
        assert!(down_placed[0].cy < down_placed[1].cy);
        assert!(up_placed[0].cy > up_placed[1].cy);
    }
}
