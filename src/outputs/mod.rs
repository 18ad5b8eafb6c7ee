//! Output protocol for side-effecting agent actions.
//!
//! An agent never touches the tracker itself. It proposes
//! [`OutputInstance`]s; the [`Registry`] validates every instance of a kind
//! and applies that kind only if all of them pass.
//!
//! - **Instance**: NDJSON parsing of proposals
//! - **Config**: per-agent declaration of enabled kinds and limits
//! - **Protocol**: the handler contract and the two-phase algorithm
//! - **Registry**: closed set of handlers, one per kind
//! - **Tracker**: the external item tracker the apply phase writes to

mod config;
mod footer;
pub mod handlers;
mod instance;
mod paths;
mod protocol;
mod registry;
mod tracker;


// Re-export public API
pub use config::{
    CommentConfig, DiscussionConfig, IssueConfig, LabelConfig, OutputDeclaration,
    PullRequestConfig,
};
pub use footer::{provenance_footer, with_footer};
pub use instance::{OutputInstance, OutputKind, ParsedOutputs, RejectedLine, parse_output_lines};
pub use paths::PathAllowList;
pub use protocol::{
    ExecutionOutcome, InstanceReport, KindReport, OutputHandler, RunContext, ValidationVerdict,
    validate_and_apply,
};
pub use registry::{Handler, Registry};
pub use tracker::{FileEdit, PullRequestDraft, Tracker};
