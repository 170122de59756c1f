//! Configuration module for marklive
//!
//! This module handles user preferences and their durable storage:
//! a flat key-value store (file-backed or in-memory) and the `Settings`
//! struct mapped onto it.

mod persistence;
mod settings;
mod store;

pub use persistence::*;
pub use settings::*;
pub use store::*;
