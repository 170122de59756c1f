//! Editing session
//!
//! `Session` is what a display surface drives: it owns the source document,
//! the committed preview, the preferences and their store, and routes every
//! source mutation to the orchestrator. I/O failures never escape as panics;
//! they become transient notifications.

use crate::config::{KeyValueStore, Settings, Theme, KEY_MARKDOWN};
use crate::document::{set_task, Snippet, SourceDocument, TextStats, WELCOME_DOCUMENT};
use crate::error::Result;
use crate::export::{self, ExportFormat, ExportOptions};
use crate::markdown::RenderServices;
use crate::pipeline::{Orchestrator, RunReport};
use crate::preview::{outline, NodeId, Outline, Preview, StepStatus};
use log::{error, info, warn};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

/// How long a notification stays visible.
pub const NOTIFICATION_DURATION: Duration = Duration::from_secs(3);

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    pub expires_at: Instant,
}

pub struct Session {
    store: Box<dyn KeyValueStore>,
    settings: Settings,
    source: SourceDocument,
    orchestrator: Orchestrator,
    preview: Preview,
    notifications: Vec<Notification>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("source", &self.source)
            .field("preview_revision", &self.preview.revision)
            .field("notifications", &self.notifications.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Load preferences and the document from `store`, then render once.
    ///
    /// A store without a document yields the welcome document.
    pub fn new(store: Box<dyn KeyValueStore>, services: RenderServices) -> Self {
        let settings = Settings::load_from(store.as_ref());
        let text = store
            .get(KEY_MARKDOWN)
            .unwrap_or_else(|| WELCOME_DOCUMENT.to_string());

        let mut orchestrator = Orchestrator::new(services, &settings);
        let source = SourceDocument::new(text);
        let mut preview = Preview::new(settings.outline_visible);
        orchestrator.force_refresh(&source, &mut preview);
        info!(
            "Session started ({} theme, {} bytes)",
            settings.theme.name(),
            source.text().len()
        );

        Self {
            store,
            settings,
            source,
            orchestrator,
            preview,
            notifications: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn source(&self) -> &SourceDocument {
        &self.source
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the whole document.
    pub fn set_text(&mut self, text: impl Into<String>, now: Instant) {
        self.source.set_text(text);
        self.orchestrator.on_document_changed(now);
    }

    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.source.set_selection(start, end);
    }

    /// Wrap the selection in `before`/`after`.
    pub fn insert_at_cursor(&mut self, before: &str, after: &str, now: Instant) {
        self.source.insert_at_cursor(before, after);
        self.orchestrator.on_document_changed(now);
    }

    pub fn apply_snippet(&mut self, snippet: Snippet, now: Instant) {
        snippet.apply(&mut self.source);
        self.orchestrator.on_document_changed(now);
    }

    /// Write a checkbox toggle back to the source marker with the same
    /// ordinal. The document is persisted immediately.
    ///
    /// Returns `false` when no marker matches; the toggle is then dropped.
    pub fn toggle_task(&mut self, ordinal: usize, checked: bool, now: Instant) -> bool {
        let revision = self.source.revision();
        if !set_task(&mut self.source, ordinal, checked) {
            return false;
        }
        if self.source.revision() != revision {
            self.persist_document(now);
            self.orchestrator.on_document_changed(now);
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    /// Drive the debounced pipeline. Call on every tick of the event loop.
    ///
    /// A completed run also persists the document.
    pub fn poll(&mut self, now: Instant) -> Option<RunReport> {
        self.expire_notifications(now);
        let report = self
            .orchestrator
            .poll(now, &self.source, &mut self.preview)?;
        self.persist_document(now);
        Some(report)
    }

    /// When the next debounced run is due, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.orchestrator.next_deadline()
    }

    /// Re-render immediately, bypassing the debounce window.
    pub fn force_refresh(&mut self) -> RunReport {
        self.orchestrator
            .force_refresh(&self.source, &mut self.preview)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outline & counter
    // ─────────────────────────────────────────────────────────────────────────

    /// Open or close the outline. Opening builds it from the committed document.
    pub fn toggle_outline(&mut self, now: Instant) -> bool {
        let visible = !self.preview.outline_visible;
        self.preview.outline_visible = visible;
        self.settings.outline_visible = visible;
        if visible {
            self.preview.rebuild_outline();
        }
        self.save_settings(now);
        visible
    }

    pub fn outline(&self) -> Option<&Outline> {
        self.preview.outline.as_ref()
    }

    /// The heading an outline link points at.
    pub fn navigate(&self, id: &str) -> Option<NodeId> {
        outline::navigate(&self.preview.document, id)
    }

    /// Word/character counter label.
    pub fn counter(&self) -> String {
        TextStats::from_text(self.source.text()).format_counter()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Preferences
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch between light and dark. Diagrams are re-rendered in place.
    pub fn toggle_theme(&mut self, now: Instant) -> Theme {
        let theme = self.settings.theme.toggle();
        self.settings.theme = theme;
        let outcome = self.orchestrator.set_theme(theme, &mut self.preview);
        if let StepStatus::Failed(message) | StepStatus::Panicked(message) = &outcome.status {
            warn!("Diagram refresh after theme switch failed: {}", message);
        }
        self.save_settings(now);
        theme
    }

    pub fn toggle_focus_mode(&mut self, now: Instant) -> bool {
        self.settings.focus_mode = !self.settings.focus_mode;
        self.save_settings(now);
        self.settings.focus_mode
    }

    pub fn toggle_word_wrap(&mut self, now: Instant) -> bool {
        self.settings.word_wrap = !self.settings.word_wrap;
        self.save_settings(now);
        self.settings.word_wrap
    }

    pub fn toggle_spell_check(&mut self, now: Instant) -> bool {
        self.settings.spell_check = !self.settings.spell_check;
        self.save_settings(now);
        self.settings.spell_check
    }

    pub fn cycle_preview_layout(&mut self, now: Instant) {
        self.settings.preview_layout = self.settings.preview_layout.next();
        self.save_settings(now);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Export
    // ─────────────────────────────────────────────────────────────────────────

    /// Export the document to `path`. The outcome is also notified.
    pub fn export(&mut self, format: ExportFormat, path: &Path, now: Instant) -> Result<()> {
        let options = ExportOptions::default().with_theme(self.settings.theme);
        let contents =
            export::export_contents(format, self.source.text(), &self.preview.html(), &options);
        let result = export::write_export(path, &contents);
        self.report(result, format!("Exported {}", format.label()), now)
    }

    /// Copy the rendered preview to the clipboard.
    pub fn copy_html(&mut self, now: Instant) -> Result<()> {
        let result = export::copy_html_to_clipboard(&self.preview.html(), self.source.text());
        self.report(result, "Copied HTML to clipboard".to_string(), now)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    pub fn notify(&mut self, message: impl Into<String>, is_error: bool, now: Instant) {
        self.notifications.push(Notification {
            message: message.into(),
            is_error,
            expires_at: now + NOTIFICATION_DURATION,
        });
    }

    /// Drop notifications whose time is up.
    pub fn expire_notifications(&mut self, now: Instant) {
        self.notifications.retain(|n| now < n.expires_at);
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    fn report(&mut self, result: Result<()>, success: String, now: Instant) -> Result<()> {
        match &result {
            Ok(()) => self.notify(success, false, now),
            Err(e) => {
                error!("{}", e);
                self.notify(e.to_string(), true, now);
            }
        }
        result
    }

    fn persist_document(&mut self, now: Instant) {
        if let Err(e) = self.store.set(KEY_MARKDOWN, self.source.text()) {
            error!("Failed to save document: {}", e);
            self.notify(format!("Could not save document: {}", e), true, now);
        }
    }

    fn save_settings(&mut self, now: Instant) {
        if let Err(e) = self.settings.save_to(self.store.as_mut()) {
            error!("Failed to save preferences: {}", e);
            self.notify(format!("Could not save preferences: {}", e), true, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryStore, PreviewLayout};
    use crate::error::Error;
    use tempfile::TempDir;

    fn session_with(store: MemoryStore) -> Session {
        Session::new(Box::new(store), RenderServices::default())
    }

    fn session(text: &str) -> Session {
        let mut store = MemoryStore::new();
        store.set(KEY_MARKDOWN, text).unwrap();
        session_with(store)
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Application("store is read-only".to_string()))
        }

        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(Error::Application("store is read-only".to_string()))
        }
    }

    #[test]
    fn test_empty_store_loads_welcome_document() {
        let session = session_with(MemoryStore::new());
        assert_eq!(session.source().text(), WELCOME_DOCUMENT);
        assert!(session.preview().html().contains("Welcome to marklive"));
        assert!(session.preview().is_current(0));
    }

    #[test]
    fn test_edits_render_after_quiet_window() {
        let mut session = session("# Start");
        let start = Instant::now();
        session.set_text("# Changed", start);

        assert!(session.poll(start).is_none());
        let deadline = session.next_deadline().unwrap();
        let report = session.poll(deadline).unwrap();
        assert_eq!(report.revision, session.source().revision());
        assert!(session.preview().html().contains("Changed"));
        assert_eq!(
            session.store().get(KEY_MARKDOWN).as_deref(),
            Some("# Changed")
        );
    }

    #[test]
    fn test_snippet_insertion_schedules_run() {
        let mut session = session("word");
        let start = Instant::now();
        session.set_selection(0, 4);
        session.apply_snippet(Snippet::Bold, start);
        assert_eq!(session.source().text(), "**word**");
        assert!(session.next_deadline().is_some());

        session.set_selection(0, 8);
        session.insert_at_cursor("_", "_", start);
        assert_eq!(session.source().text(), "_**word**_");
    }

    #[test]
    fn test_toggle_task_persists_immediately() {
        let mut session = session("- [ ] a\n- [ ] b\n");
        let now = Instant::now();

        assert!(session.toggle_task(1, true, now));
        assert_eq!(session.source().text(), "- [ ] a\n- [x] b\n");
        assert_eq!(
            session.store().get(KEY_MARKDOWN).as_deref(),
            Some("- [ ] a\n- [x] b\n")
        );
        assert!(session.next_deadline().is_some());

        assert!(!session.toggle_task(5, true, now));
        assert_eq!(session.source().text(), "- [ ] a\n- [x] b\n");
    }

    #[test]
    fn test_outline_toggle_and_navigate() {
        let mut session = session("# Top\n\n## Sub\n");
        let now = Instant::now();
        assert!(session.outline().is_none());

        assert!(session.toggle_outline(now));
        let outline = session.outline().unwrap();
        assert_eq!(outline.len(), 2);
        assert_eq!(
            session.store().get("outlineVisible").as_deref(),
            Some("true")
        );

        let target = session.navigate("#heading-sub").unwrap();
        assert_eq!(session.preview().document.tag(target), Some("h2"));
        assert!(session.navigate("heading-missing").is_none());

        assert!(!session.toggle_outline(now));
    }

    #[test]
    fn test_counter() {
        let session = session("one two three");
        assert_eq!(session.counter(), "13 characters, 3 words");
    }

    #[test]
    fn test_preferences_are_saved() {
        let mut session = session("text");
        let now = Instant::now();

        assert_eq!(session.toggle_theme(now), Theme::Dark);
        assert!(session.toggle_focus_mode(now));
        assert!(!session.toggle_word_wrap(now));
        assert!(!session.toggle_spell_check(now));
        session.cycle_preview_layout(now);

        let store = session.store();
        assert_eq!(store.get("darkTheme").as_deref(), Some("true"));
        assert_eq!(store.get("focusMode").as_deref(), Some("true"));
        assert_eq!(store.get("wordWrap").as_deref(), Some("false"));
        assert_eq!(store.get("spellCheck").as_deref(), Some("false"));
        assert_eq!(
            Settings::load_from(store).preview_layout,
            PreviewLayout::Split.next()
        );
    }

    #[test]
    fn test_export_writes_file_and_notifies() {
        let dir = TempDir::new().unwrap();
        let mut session = session("# Title\n");
        let now = Instant::now();

        let path = dir.path().join("preview.html");
        session.export(ExportFormat::Html, &path, now).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("id=\"heading-title\""));

        let md = dir.path().join("markdown.md");
        session.export(ExportFormat::Markdown, &md, now).unwrap();
        assert_eq!(std::fs::read_to_string(&md).unwrap(), "# Title\n");

        assert_eq!(session.notifications().len(), 2);
        assert!(session.notifications().iter().all(|n| !n.is_error));
    }

    #[test]
    fn test_export_failure_is_notified() {
        let dir = TempDir::new().unwrap();
        let mut session = session("x");
        let now = Instant::now();

        let result = session.export(ExportFormat::Html, dir.path(), now);
        assert!(result.is_err());
        assert_eq!(session.source().text(), "x");
        assert!(session.notifications()[0].is_error);
    }

    #[test]
    fn test_store_failures_become_notifications() {
        let mut session = Session::new(Box::new(ReadOnlyStore), RenderServices::default());
        let now = Instant::now();

        session.toggle_focus_mode(now);
        assert_eq!(session.notifications().len(), 1);
        assert!(session.notifications()[0].is_error);

        session.expire_notifications(now + NOTIFICATION_DURATION);
        assert!(session.notifications().is_empty());
    }
}
