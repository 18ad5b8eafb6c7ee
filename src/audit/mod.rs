//! Audit records and the per-event manifest.
//!
//! Each agent node writes an [`AuditRecord`] from its apply step. The audit
//! node merges those with dispatch verdicts and node results into one
//! [`Manifest`], the only durable artifact of an event, and renders a
//! Markdown summary of it.

mod manifest;
mod record;
mod summary;

#[cfg(test)]
mod tests;

// Re-export public API
pub use manifest::{Manifest, load_records};
pub use record::{AuditRecord, ExecutionResult};
