//! Document Export Module for marklive
//!
//! Exports the source document or the rendered preview:
//!
//! - **Markdown**: the raw source text
//! - **HTML File**: complete HTML document with inlined theme and syntax CSS
//! - **Print**: print-styled HTML document, the PDF path through the
//!   platform's print dialog
//! - **Clipboard HTML**: rendered HTML for pasting into other apps
//!
//! # Architecture
//!
//! - `options.rs` - Export formats and options
//! - `html.rs` - HTML document generation with theme styling
//! - `clipboard.rs` - Platform clipboard operations

pub mod clipboard;
pub mod html;
pub mod options;

pub use clipboard::copy_html_to_clipboard;
pub use html::{generate_html_document, generate_print_document};
pub use options::{ExportFormat, ExportOptions};

use crate::error::{Error, Result};
use log::info;
use std::fs;
use std::path::Path;

/// Build the file contents for `format`.
///
/// `body_html` is the rendered preview; it is ignored for Markdown exports.
pub fn export_contents(
    format: ExportFormat,
    markdown: &str,
    body_html: &str,
    options: &ExportOptions,
) -> String {
    match format {
        ExportFormat::Markdown => markdown.to_string(),
        ExportFormat::Html => generate_html_document(body_html, options),
        ExportFormat::Print => generate_print_document(body_html, &options.title),
    }
}

/// Write exported contents to `path`, creating parent directories.
pub fn write_export(path: &Path, contents: &str) -> Result<()> {
    if path.is_dir() {
        return Err(Error::Export(format!(
            "'{}' is a directory, not a file",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Exported {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_markdown_export_is_source() {
        let contents = export_contents(
            ExportFormat::Markdown,
            "# Title\n",
            "<h1>Title</h1>",
            &ExportOptions::default(),
        );
        assert_eq!(contents, "# Title\n");
    }

    #[test]
    fn test_html_exports_wrap_body() {
        let options = ExportOptions::default();
        let html = export_contents(ExportFormat::Html, "", "<p>body</p>", &options);
        assert!(html.contains("<article class=\"markdown-body\">"));

        let print = export_contents(ExportFormat::Print, "", "<p>body</p>", &options);
        assert!(print.contains("@media print"));
        assert!(print.contains("<p>body</p>"));
    }

    #[test]
    fn test_write_export_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("preview.html");
        write_export(&path, "<p>x</p>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>x</p>");
    }

    #[test]
    fn test_write_export_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let err = write_export(dir.path(), "x").unwrap_err();
        assert!(matches!(err, Error::Export(_)));
        assert!(err.to_string().contains("is a directory"));
    }

    #[test]
    fn test_write_export_reports_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // A regular file cannot serve as a parent directory.
        let err = write_export(&blocker.join("out.html"), "x").unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }));
    }
}
