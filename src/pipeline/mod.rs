//! Render pipeline scheduling.
//!
//! The [`Orchestrator`] is the single entry point that turns the source
//! document into a committed, enriched preview; the [`Debouncer`] collapses
//! bursts of edits into one run per quiescence window.

mod orchestrator;
mod scheduler;

pub use orchestrator::{Orchestrator, RunReport};
pub use scheduler::Debouncer;
