//! Filesystem utilities for fleet.
//!
//! Generated documents, audit records and manifests are written atomically
//! so a reader never observes a half-written file. Step output files are
//! appended to.

pub mod append;
pub mod atomic;

pub use append::append_text;
pub use atomic::{atomic_write, write_if_changed, write_json};
