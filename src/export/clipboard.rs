//! Clipboard Operations for HTML Export
//!
//! Copies the rendered preview to the system clipboard through `arboard`,
//! as HTML with the Markdown source as the plain-text fallback.

use crate::error::{Error, Result};
use arboard::Clipboard;
use log::debug;

/// Copy rendered HTML to the clipboard.
///
/// Rich-paste targets (mail clients, word processors) pick up the HTML;
/// everything else gets `plain_text`.
pub fn copy_html_to_clipboard(html: &str, plain_text: &str) -> Result<()> {
    let mut clipboard =
        Clipboard::new().map_err(|e| Error::Clipboard(format!("cannot open clipboard: {}", e)))?;

    clipboard.set_html(html, Some(plain_text))?;
    debug!("Copied {} bytes of HTML to clipboard", html.len());
    Ok(())
}

/// Copy plain text to the clipboard.
pub fn copy_text_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard =
        Clipboard::new().map_err(|e| Error::Clipboard(format!("cannot open clipboard: {}", e)))?;

    clipboard.set_text(text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipboard_error_display() {
        let err = Error::Clipboard("cannot open clipboard: no display".to_string());
        assert!(err.to_string().contains("no display"));
    }

    // Writing to the clipboard needs a display server, which CI lacks.
}
