//! Job graph builder.
//!
//! Produces the substrate document as a typed value:
//!
//! - **Expr**: run conditions as an expression tree
//! - **Model**: document, nodes and steps, serialized in key order
//! - **Check**: structural invariants verified before serialization
//! - **Builder**: wires triggers, permissions, concurrency, dispatch and
//!   outputs into one document

mod builder;
mod check;
mod expr;
mod model;


// Re-export public API
pub use builder::{GraphBuilder, MANIFEST_ARTIFACT, RECORD_ARTIFACT_PREFIX, WORK_DIR};
pub use expr::{Expr, Status};
pub use model::{
    AUDIT_JOB, Cardinality, DISPATCH_JOB, FAILURE_JOB, Job, JobGraph, Step, Strategy,
    WorkflowDocument,
};
