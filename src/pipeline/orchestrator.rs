//! Pipeline Orchestrator
//!
//! Runs Compile → Sanitize → commit → Post-Render Pass → outline for a
//! snapshot of the source document. Runs are started either by the debouncer
//! (`poll` after `on_document_changed`) or directly by `force_refresh`.

use super::scheduler::Debouncer;
use crate::config::{Settings, Theme};
use crate::document::SourceDocument;
use crate::markdown::{MarkdownCompiler, RenderServices};
use crate::preview::{PostRenderContext, PostRenderPass, Preview, RenderedDocument, StepOutcome};
use crate::sanitize::Sanitizer;
use log::{debug, info};
use std::time::{Duration, Instant};

/// What one pipeline run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Source revision the run rendered
    pub revision: u64,
    /// Settled result of every post-render step, in step order
    pub outcomes: Vec<StepOutcome>,
    /// Whether the outline was rebuilt (only when it is visible)
    pub outline_rebuilt: bool,
}

impl RunReport {
    /// Steps that did not apply.
    pub fn failed_steps(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.step)
            .collect()
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    compiler: MarkdownCompiler,
    sanitizer: Sanitizer,
    pass: PostRenderPass,
    debouncer: Debouncer,
    theme: Theme,
    document_host: String,
}

impl Orchestrator {
    pub fn new(services: RenderServices, settings: &Settings) -> Self {
        Self {
            compiler: MarkdownCompiler::new(services),
            sanitizer: Sanitizer::new(),
            pass: PostRenderPass::default(),
            debouncer: Debouncer::new(settings.debounce()),
            theme: settings.theme,
            document_host: settings.document_host.clone(),
        }
    }

    /// Replace the post-render steps.
    pub fn with_pass(mut self, pass: PostRenderPass) -> Self {
        self.pass = pass;
        self
    }

    pub fn with_compiler(mut self, compiler: MarkdownCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn debounce_window(&self) -> Duration {
        self.debouncer.window()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scheduling
    // ─────────────────────────────────────────────────────────────────────────

    /// Called after every source mutation. Arms or resets the pending slot.
    pub fn on_document_changed(&mut self, now: Instant) {
        self.debouncer.trigger(now);
    }

    /// Whether a debounced run is waiting.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// When the pending run fires, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Run the pipeline if the quiescence window has elapsed.
    pub fn poll(
        &mut self,
        now: Instant,
        source: &SourceDocument,
        preview: &mut Preview,
    ) -> Option<RunReport> {
        if !self.debouncer.take_due(now) {
            return None;
        }
        Some(self.run(source, preview))
    }

    /// Run the pipeline now, dropping any pending debounced run.
    pub fn force_refresh(&mut self, source: &SourceDocument, preview: &mut Preview) -> RunReport {
        self.debouncer.cancel();
        self.run(source, preview)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Theme
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch theme and re-materialize the diagrams of the committed document.
    pub fn set_theme(&mut self, theme: Theme, preview: &mut Preview) -> StepOutcome {
        self.theme = theme;
        self.refresh_diagrams(preview)
    }

    /// Clear the processed markers of every diagram and render them again.
    pub fn refresh_diagrams(&self, preview: &mut Preview) -> StepOutcome {
        let ctx = self.context();
        self.pass.refresh_diagrams(&mut preview.document, &ctx)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Running
    // ─────────────────────────────────────────────────────────────────────────

    fn context(&self) -> PostRenderContext<'_> {
        PostRenderContext {
            services: self.compiler.services(),
            sanitizer: &self.sanitizer,
            theme: self.theme,
            document_host: &self.document_host,
        }
    }

    /// Compile and sanitize `text` into a fresh, not yet enriched document.
    pub fn compile(&self, text: &str) -> RenderedDocument {
        let raw_html = self.compiler.compile(text);
        let safe_html = self.sanitizer.sanitize(&raw_html);
        RenderedDocument::parse(&safe_html)
    }

    /// Render `text` through every stage without touching any preview.
    pub fn render(&self, text: &str) -> (RenderedDocument, Vec<StepOutcome>) {
        let mut document = self.compile(text);
        let outcomes = self.pass.run(&mut document, &self.context());
        (document, outcomes)
    }

    fn run(&self, source: &SourceDocument, preview: &mut Preview) -> RunReport {
        let started = Instant::now();
        let revision = source.revision();
        let document = self.compile(source.text());
        debug!("Compiled revision {} in {:?}", revision, started.elapsed());

        preview.commit(document, revision);
        let outcomes = self.pass.run(&mut preview.document, &self.context());

        let outline_rebuilt = preview.outline_visible;
        if outline_rebuilt {
            let entries = preview.rebuild_outline().len();
            debug!("Outline rebuilt with {} entries", entries);
        }

        info!(
            "Rendered revision {} ({} bytes) in {:?}",
            revision,
            source.text().len(),
            started.elapsed()
        );
        RunReport {
            revision,
            outcomes,
            outline_rebuilt,
        }
    }
}
