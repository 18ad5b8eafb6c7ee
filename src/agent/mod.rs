//! Agent records.
//!
//! - **Model**: [`AgentSpec`] and its admission and timeout settings
//! - **Loader**: YAML loading and set-level validation
//!
//! ```yaml
//! name: triage
//! triggers:
//!   events:
//!     issues: [opened, reopened]
//! permissions:
//!   issues: write
//! outputs:
//!   add_labels: { allowed: [bug, question] }
//! admission:
//!   min_interval_minutes: 10
//! ```

mod loader;
mod model;

#[cfg(test)]
mod tests;

// Re-export public API
pub use loader::{agents_from_yaml, load_agents, validate_agents};
pub use model::{AdmissionSettings, AgentSpec, TimeoutBudget};
