//! Document loading and persistence.
//!
//! This module provides:
//! - Parsing of plan, state and change documents
//! - A trait for document backends
//! - Local filesystem and in-memory backends

mod local;
mod memory;
mod parser;
mod store;

pub use local::LocalDocumentStore;
pub use memory::MemoryDocumentStore;
pub use parser::{parse_change, parse_plan, parse_state, render_state};
pub use store::{Document, DocumentStore};
