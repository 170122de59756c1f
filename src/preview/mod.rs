//! Preview module for marklive
//!
//! The display surface of the pipeline: the rendered document tree, the
//! Post-Render Pass that enriches it, and the outline derived from it.

mod dom;
pub mod enrich;
pub mod outline;
mod sink;

pub use dom::{Attribute, NodeData, NodeId, RenderedDocument};
pub use enrich::{
    PostRenderContext, PostRenderPass, PostRenderStep, StepError, StepOutcome, StepStatus,
};
pub use outline::{HeadingEntry, Outline, OutlineNode};

/// What the user sees: the last committed document and its outline.
#[derive(Debug, Clone, Default)]
pub struct Preview {
    /// The committed, enriched document
    pub document: RenderedDocument,
    /// Source revision the document was rendered from; `None` before the first run
    pub revision: Option<u64>,
    /// The outline, if it was built for the current document
    pub outline: Option<Outline>,
    /// Whether the outline sidebar is open
    pub outline_visible: bool,
}

impl Preview {
    pub fn new(outline_visible: bool) -> Self {
        Self {
            outline_visible,
            ..Self::default()
        }
    }

    /// Replace the displayed document. The old outline no longer applies.
    pub fn commit(&mut self, document: RenderedDocument, revision: u64) {
        self.document = document;
        self.revision = Some(revision);
        self.outline = None;
    }

    /// Rebuild the outline from the committed document.
    pub fn rebuild_outline(&mut self) -> &Outline {
        self.outline.insert(outline::build_from_document(&self.document))
    }

    /// Serialized document content.
    pub fn html(&self) -> String {
        self.document.to_html()
    }

    /// Whether the preview shows `revision` of the source.
    pub fn is_current(&self, revision: u64) -> bool {
        self.revision == Some(revision)
    }
}
