//! Task-list markers in the source text.
//!
//! The preview's checkboxes are matched back to the source by ordinal: the
//! n-th rendered checkbox is the n-th task item of the document. Markers are
//! located from the same comrak parse the compiler uses, so text that only
//! looks like a task (inside a fenced block, for instance) never shifts the
//! count.

use crate::markdown::comrak_options;
use comrak::nodes::NodeValue;
use comrak::{parse_document, Arena};
use regex::Regex;
use std::sync::OnceLock;

/// A `[ ]` / `[x]` marker found in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMarker {
    /// Byte offset of the state character between the brackets.
    pub offset: usize,
    /// Whether the marker is checked.
    pub checked: bool,
}

/// All task markers of `text`, in document order.
pub fn task_markers(text: &str) -> Vec<TaskMarker> {
    let arena = Arena::new();
    let options = comrak_options();
    let root = parse_document(&arena, text, &options);
    let line_starts = line_start_offsets(text);

    let mut markers = Vec::new();
    for node in root.descendants() {
        let ast = node.data.borrow();
        let NodeValue::TaskItem(state) = ast.value else {
            continue;
        };
        let pos = ast.sourcepos.start;
        let Some(&line_start) = line_starts.get(pos.line.saturating_sub(1)) else {
            continue;
        };
        let item_start = line_start + pos.column.saturating_sub(1);
        if let Some(offset) = find_marker(text, item_start) {
            markers.push(TaskMarker {
                offset,
                checked: matches!(state, Some(c) if c != ' '),
            });
        }
    }
    markers
}

/// Byte offset of the first character of every line.
fn line_start_offsets(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// List marker followed by the task box, anchored at the item start.
const TASK_MARKER_PATTERN: &str = r"^(?:[-+*]|\d{1,9}[.)])[ \t]+\[([ xX])\]";

static TASK_MARKER: OnceLock<Option<Regex>> = OnceLock::new();

/// Find `[?]` right after the item's list marker and return the offset of `?`.
fn find_marker(text: &str, item_start: usize) -> Option<usize> {
    let pattern = TASK_MARKER
        .get_or_init(|| Regex::new(TASK_MARKER_PATTERN).ok())
        .as_ref()?;
    let rest = text.get(item_start..)?;
    let state = pattern.captures(rest)?.get(1)?;
    Some(item_start + state.start())
}
