//! User settings and preferences for marklive
//!
//! This module defines the `Settings` struct that holds the handful of
//! preferences the editing surface remembers between sessions, and the
//! mapping of each preference onto a key in a [`KeyValueStore`].

use super::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Store Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Key holding the raw Markdown of the source document.
pub const KEY_MARKDOWN: &str = "markdown";
const KEY_DARK_THEME: &str = "darkTheme";
const KEY_FOCUS_MODE: &str = "focusMode";
const KEY_WORD_WRAP: &str = "wordWrap";
const KEY_SPELL_CHECK: &str = "spellCheck";
const KEY_PREVIEW_MODE: &str = "previewMode";
const KEY_OUTLINE_VISIBLE: &str = "outlineVisible";
const KEY_DEBOUNCE_MS: &str = "debounceMs";
const KEY_DOCUMENT_HOST: &str = "documentHost";

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Color theme for the preview.
///
/// Math and diagram appearance depend on it, so it is an input of every
/// pipeline run alongside the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Whether this is a dark theme.
    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }

    /// Toggle between light and dark.
    pub fn toggle(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Lowercase name, used by the CLI and in CSS class names.
    pub fn name(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parse a theme name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preview Layout Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// How the editor and preview panes share the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PreviewLayout {
    /// Editor and preview side by side
    #[default]
    Split,
    /// Only the preview is shown
    PreviewOnly,
    /// Preview takes two thirds of the width
    PreviewFocus,
}

impl PreviewLayout {
    /// Cycle to the next layout.
    pub fn next(&self) -> Self {
        match self {
            PreviewLayout::Split => PreviewLayout::PreviewOnly,
            PreviewLayout::PreviewOnly => PreviewLayout::PreviewFocus,
            PreviewLayout::PreviewFocus => PreviewLayout::Split,
        }
    }

    /// Stored string form.
    pub fn key(&self) -> &'static str {
        match self {
            PreviewLayout::Split => "split",
            PreviewLayout::PreviewOnly => "preview-only",
            PreviewLayout::PreviewFocus => "preview-focus",
        }
    }

    /// Parse the stored string form.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "split" => Some(PreviewLayout::Split),
            "preview-only" => Some(PreviewLayout::PreviewOnly),
            "preview-focus" => Some(PreviewLayout::PreviewFocus),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences and pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Preview color theme
    pub theme: Theme,
    /// Distraction-free mode (hides toolbars in the editing surface)
    pub focus_mode: bool,
    /// Soft-wrap long lines in the editor
    pub word_wrap: bool,
    /// Spell checking in the editor
    pub spell_check: bool,
    /// Editor / preview pane arrangement
    pub preview_layout: PreviewLayout,
    /// Whether the outline sidebar is open
    pub outline_visible: bool,
    /// Quiescence window for coalescing edits, in milliseconds
    pub debounce_ms: u64,
    /// Host the preview is served from; links to other hosts are hardened
    pub document_host: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            focus_mode: false,
            word_wrap: true,
            spell_check: true,
            preview_layout: PreviewLayout::Split,
            outline_visible: false,
            debounce_ms: Self::DEFAULT_DEBOUNCE_MS,
            document_host: "localhost".to_string(),
        }
    }
}

impl Settings {
    /// Default quiescence window.
    pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
    /// Minimum allowed debounce window.
    pub const MIN_DEBOUNCE_MS: u64 = 50;
    /// Maximum allowed debounce window.
    pub const MAX_DEBOUNCE_MS: u64 = 5_000;

    /// The debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Clamp values into their valid ranges.
    pub fn sanitize(&mut self) {
        self.debounce_ms = self
            .debounce_ms
            .clamp(Self::MIN_DEBOUNCE_MS, Self::MAX_DEBOUNCE_MS);
        if self.document_host.trim().is_empty() {
            self.document_host = "localhost".to_string();
        } else {
            self.document_host = self.document_host.trim().to_ascii_lowercase();
        }
    }

    /// Parse settings from JSON and sanitize them.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Read settings from a JSON file. Missing fields keep their default.
    pub fn load_json_file(path: &Path) -> crate::error::Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| crate::error::Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_json_sanitized(&json)?)
    }

    /// Load preferences from a key-value store.
    ///
    /// Missing or malformed entries keep their default value.
    pub fn load_from(store: &dyn KeyValueStore) -> Self {
        let mut settings = Self::default();

        if let Some(dark) = read_bool(store, KEY_DARK_THEME) {
            settings.theme = if dark { Theme::Dark } else { Theme::Light };
        }
        if let Some(value) = read_bool(store, KEY_FOCUS_MODE) {
            settings.focus_mode = value;
        }
        if let Some(value) = read_bool(store, KEY_WORD_WRAP) {
            settings.word_wrap = value;
        }
        if let Some(value) = read_bool(store, KEY_SPELL_CHECK) {
            settings.spell_check = value;
        }
        if let Some(layout) = store
            .get(KEY_PREVIEW_MODE)
            .and_then(|v| PreviewLayout::from_key(&v))
        {
            settings.preview_layout = layout;
        }
        if let Some(value) = read_bool(store, KEY_OUTLINE_VISIBLE) {
            settings.outline_visible = value;
        }
        if let Some(ms) = store
            .get(KEY_DEBOUNCE_MS)
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            settings.debounce_ms = ms;
        }
        if let Some(host) = store.get(KEY_DOCUMENT_HOST) {
            settings.document_host = host;
        }

        settings.sanitize();
        settings
    }

    /// Write every preference to a key-value store.
    pub fn save_to(&self, store: &mut dyn KeyValueStore) -> crate::error::Result<()> {
        store.set(KEY_DARK_THEME, bool_str(self.theme.is_dark()))?;
        store.set(KEY_FOCUS_MODE, bool_str(self.focus_mode))?;
        store.set(KEY_WORD_WRAP, bool_str(self.word_wrap))?;
        store.set(KEY_SPELL_CHECK, bool_str(self.spell_check))?;
        store.set(KEY_PREVIEW_MODE, self.preview_layout.key())?;
        store.set(KEY_OUTLINE_VISIBLE, bool_str(self.outline_visible))?;
        store.set(KEY_DEBOUNCE_MS, &self.debounce_ms.to_string())?;
        store.set(KEY_DOCUMENT_HOST, &self.document_host)?;
        Ok(())
    }
}

fn read_bool(store: &dyn KeyValueStore, key: &str) -> Option<bool> {
    match store.get(key)?.as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.theme, Theme::Light);
        assert!(settings.word_wrap);
        assert!(settings.spell_check);
        assert!(!settings.outline_visible);
        assert_eq!(settings.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_theme_serialization() {
        assert_eq!(serde_json::to_string(&Theme::Light).unwrap(), "\"light\"");
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
        assert_eq!(Theme::from_name("DARK"), Some(Theme::Dark));
        assert_eq!(Theme::from_name("sepia"), None);
    }

    #[test]
    fn test_preview_layout_keys() {
        assert_eq!(
            serde_json::to_string(&PreviewLayout::PreviewOnly).unwrap(),
            "\"preview-only\""
        );
        for layout in [
            PreviewLayout::Split,
            PreviewLayout::PreviewOnly,
            PreviewLayout::PreviewFocus,
        ] {
            assert_eq!(PreviewLayout::from_key(layout.key()), Some(layout));
        }
        assert_eq!(PreviewLayout::Split.next(), PreviewLayout::PreviewOnly);
        assert_eq!(PreviewLayout::PreviewFocus.next(), PreviewLayout::Split);
    }

    #[test]
    fn test_sanitize_debounce() {
        let settings = Settings::from_json_sanitized(r#"{"debounce_ms": 1}"#).unwrap();
        assert_eq!(settings.debounce_ms, Settings::MIN_DEBOUNCE_MS);

        let settings = Settings::from_json_sanitized(r#"{"debounce_ms": 999999}"#).unwrap();
        assert_eq!(settings.debounce_ms, Settings::MAX_DEBOUNCE_MS);
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("marklive.json");
        fs::write(&path, r#"{"theme": "dark", "document_host": " Docs.Example "}"#).unwrap();

        let settings = Settings::load_json_file(&path).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.document_host, "docs.example");
        assert!(settings.word_wrap);

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load_json_file(&path),
            Err(crate::error::Error::ConfigParse { .. })
        ));
        assert!(matches!(
            Settings::load_json_file(&dir.path().join("missing.json")),
            Err(crate::error::Error::FileRead { .. })
        ));
    }

    #[test]
    fn test_sanitize_host() {
        let settings = Settings::from_json_sanitized(r#"{"document_host": "  "}"#).unwrap();
        assert_eq!(settings.document_host, "localhost");

        let settings =
            Settings::from_json_sanitized(r#"{"document_host": " Example.COM "}"#).unwrap();
        assert_eq!(settings.document_host, "example.com");
    }

    #[test]
    fn test_store_roundtrip() {
        let mut store = MemoryStore::new();
        let original = Settings {
            theme: Theme::Dark,
            focus_mode: true,
            word_wrap: false,
            spell_check: false,
            preview_layout: PreviewLayout::PreviewFocus,
            outline_visible: true,
            debounce_ms: 500,
            document_host: "notes.example.org".to_string(),
        };
        original.save_to(&mut store).unwrap();

        assert_eq!(store.get("darkTheme").as_deref(), Some("true"));
        assert_eq!(store.get("previewMode").as_deref(), Some("preview-focus"));
        assert_eq!(Settings::load_from(&store), original);
    }

    #[test]
    fn test_load_from_empty_store_uses_defaults() {
        let store = MemoryStore::new();
        assert_eq!(Settings::load_from(&store), Settings::default());
    }

    #[test]
    fn test_load_from_store_ignores_garbage() {
        let mut store = MemoryStore::new();
        store.set("darkTheme", "yes please").unwrap();
        store.set("previewMode", "fullscreen").unwrap();
        store.set("debounceMs", "soon").unwrap();

        let settings = Settings::load_from(&store);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.preview_layout, PreviewLayout::Split);
        assert_eq!(settings.debounce_ms, Settings::DEFAULT_DEBOUNCE_MS);
    }
}
