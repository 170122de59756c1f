//! marklive - live Markdown preview pipeline
//!
//! Turns Markdown into a safe, enriched preview: typeset math, rendered
//! diagrams, highlighted code, hardened links, interactive task checkboxes
//! and a heading outline. The library is display-agnostic; [`session::Session`]
//! is the entry point an editing surface drives, and the `marklive` binary
//! uses the same pipeline to render, watch and export files.

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod markdown;
pub mod pipeline;
pub mod preview;
pub mod sanitize;
pub mod session;
pub mod watch;

pub use error::{Error, Result};
pub use pipeline::Orchestrator;
pub use preview::{Preview, RenderedDocument};
pub use session::Session;
