//! One handler per action-kind.

mod comment;
mod discussion;
mod issue;
mod labels;
mod pull_request;

pub use comment::{CommentHandler, CommentPayload};
pub use discussion::{DiscussionHandler, DiscussionPayload};
pub use issue::{IssueHandler, IssuePayload};
pub use labels::{AddLabelsHandler, LabelsPayload, RemoveLabelsHandler};
pub use pull_request::{PullRequestHandler, PullRequestPayload};
