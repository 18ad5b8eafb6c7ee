//! Admission control: which agents run for an inbound event, and why the
//! others do not.
//!
//! - **State**: the [`RepoState`] trait for live lookups
//! - **Verdict**: [`DispatchVerdict`] and the closed set of skip reasons
//! - **Engine**: the ordered checks producing a verdict per agent

mod engine;
mod state;
mod verdict;


// Re-export public API
pub use engine::DispatchEngine;
pub use state::{RepoRole, RepoState, RunRecord};
pub use verdict::{DispatchVerdict, SkipReason, VerdictMap};
