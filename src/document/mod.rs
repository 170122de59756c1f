//! Document model for marklive
//!
//! The source document (raw Markdown plus selection), the insertion snippets
//! that edit it, task-marker lookup for checkbox write-back, and text stats.

mod snippets;
mod source;
mod stats;
mod tasks;

pub use snippets::{Snippet, TOC_MARKER};
pub use source::{Selection, SourceDocument};
pub use stats::TextStats;
pub use tasks::{task_markers, TaskMarker};

/// Document loaded when nothing has been persisted yet.
pub const WELCOME_DOCUMENT: &str = include_str!("welcome.md");

/// Set the `ordinal`-th task marker of `doc` to `checked`.
///
/// Returns `false` (and leaves the document untouched) when the document has
/// fewer task markers than `ordinal + 1`.
pub fn set_task(doc: &mut SourceDocument, ordinal: usize, checked: bool) -> bool {
    let markers = task_markers(doc.text());
    let Some(marker) = markers.get(ordinal) else {
        log::warn!(
            "Task checkbox #{} has no matching marker ({} in source), toggle dropped",
            ordinal,
            markers.len()
        );
        return false;
    };
    if marker.checked == checked {
        return true;
    }
    doc.overwrite_ascii(marker.offset, if checked { 'x' } else { ' ' })
}
