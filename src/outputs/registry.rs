//! The output registry: one handler per action-kind, dispatched by `match`.
//!
//! [`Registry::standard`] is the only way to obtain a populated registry; it
//! is passed explicitly to whoever needs it.

use super::config::OutputDeclaration;
use super::handlers::{
    AddLabelsHandler, CommentHandler, DiscussionHandler, IssueHandler, PullRequestHandler,
    RemoveLabelsHandler,
};
use super::instance::{OutputInstance, OutputKind};
use super::protocol::{
    KindReport, OutputHandler, RunContext, reject_undeclared, validate_and_apply,
};
use super::tracker::Tracker;
use crate::error::Result;

/// A handler for one action-kind.
#[derive(Debug, Clone, Copy)]
pub enum Handler {
    AddComment(CommentHandler),
    AddLabels(AddLabelsHandler),
    RemoveLabels(RemoveLabelsHandler),
    CreateIssue(IssueHandler),
    CreatePullRequest(PullRequestHandler),
    UpdateDiscussion(DiscussionHandler),
}

impl Handler {
    /// The handler responsible for `kind`.
    pub fn for_kind(kind: OutputKind) -> Self {
        match kind {
            OutputKind::AddComment => Handler::AddComment(CommentHandler),
            OutputKind::AddLabels => Handler::AddLabels(AddLabelsHandler),
            OutputKind::RemoveLabels => Handler::RemoveLabels(RemoveLabelsHandler),
            OutputKind::CreateIssue => Handler::CreateIssue(IssueHandler),
            OutputKind::CreatePullRequest => Handler::CreatePullRequest(PullRequestHandler),
            OutputKind::UpdateDiscussion => Handler::UpdateDiscussion(DiscussionHandler),
        }
    }

    pub fn kind(&self) -> OutputKind {
        match self {
            Handler::AddComment(_) => CommentHandler::KIND,
            Handler::AddLabels(_) => AddLabelsHandler::KIND,
            Handler::RemoveLabels(_) => RemoveLabelsHandler::KIND,
            Handler::CreateIssue(_) => IssueHandler::KIND,
            Handler::CreatePullRequest(_) => PullRequestHandler::KIND,
            Handler::UpdateDiscussion(_) => DiscussionHandler::KIND,
        }
    }

    /// Capability description, or `None` if the kind is not declared.
    pub fn describe(&self, outputs: &OutputDeclaration) -> Option<String> {
        match self {
            Handler::AddComment(h) => outputs.add_comment.as_ref().map(|c| h.describe(c)),
            Handler::AddLabels(h) => outputs.add_labels.as_ref().map(|c| h.describe(c)),
            Handler::RemoveLabels(h) => outputs.remove_labels.as_ref().map(|c| h.describe(c)),
            Handler::CreateIssue(h) => outputs.create_issue.as_ref().map(|c| h.describe(c)),
            Handler::CreatePullRequest(h) => {
                outputs.create_pull_request.as_ref().map(|c| h.describe(c))
            }
            Handler::UpdateDiscussion(h) => {
                outputs.update_discussion.as_ref().map(|c| h.describe(c))
            }
        }
    }

    /// Supplementary context for a declared kind.
    pub fn context(
        &self,
        outputs: &OutputDeclaration,
        run: &RunContext,
        tracker: &dyn Tracker,
    ) -> Result<Option<String>> {
        let found = match self {
            Handler::AddComment(h) => match &outputs.add_comment {
                Some(c) => h.context(c, run, tracker)?,
                None => None,
            },
            Handler::AddLabels(h) => match &outputs.add_labels {
                Some(c) => h.context(c, run, tracker)?,
                None => None,
            },
            Handler::RemoveLabels(h) => match &outputs.remove_labels {
                Some(c) => h.context(c, run, tracker)?,
                None => None,
            },
            Handler::CreateIssue(h) => match &outputs.create_issue {
                Some(c) => h.context(c, run, tracker)?,
                None => None,
            },
            Handler::CreatePullRequest(h) => match &outputs.create_pull_request {
                Some(c) => h.context(c, run, tracker)?,
                None => None,
            },
            Handler::UpdateDiscussion(h) => match &outputs.update_discussion {
                Some(c) => h.context(c, run, tracker)?,
                None => None,
            },
        };
        Ok(found)
    }

    /// Two-phase processing of this kind's instances.
    ///
    /// Instances of a kind the agent did not declare all fail validation.
    pub fn validate_and_apply(
        &self,
        outputs: &OutputDeclaration,
        run: &RunContext,
        tracker: &dyn Tracker,
        instances: &[&OutputInstance],
    ) -> KindReport {
        let report = match self {
            Handler::AddComment(h) => outputs
                .add_comment
                .as_ref()
                .map(|c| validate_and_apply(h, c, run, tracker, instances)),
            Handler::AddLabels(h) => outputs
                .add_labels
                .as_ref()
                .map(|c| validate_and_apply(h, c, run, tracker, instances)),
            Handler::RemoveLabels(h) => outputs
                .remove_labels
                .as_ref()
                .map(|c| validate_and_apply(h, c, run, tracker, instances)),
            Handler::CreateIssue(h) => outputs
                .create_issue
                .as_ref()
                .map(|c| validate_and_apply(h, c, run, tracker, instances)),
            Handler::CreatePullRequest(h) => outputs
                .create_pull_request
                .as_ref()
                .map(|c| validate_and_apply(h, c, run, tracker, instances)),
            Handler::UpdateDiscussion(h) => outputs
                .update_discussion
                .as_ref()
                .map(|c| validate_and_apply(h, c, run, tracker, instances)),
        };
        report.unwrap_or_else(|| reject_undeclared(&run.agent, self.kind(), instances))
    }
}

/// Every action-kind handler, in canonical kind order.
#[derive(Debug, Clone)]
pub struct Registry {
    handlers: Vec<Handler>,
}

impl Registry {
    /// A registry with a handler for every action-kind.
    pub fn standard() -> Self {
        Self {
            handlers: OutputKind::ALL.into_iter().map(Handler::for_kind).collect(),
        }
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Capability descriptions of every declared kind, joined for the agent.
    pub fn describe(&self, outputs: &OutputDeclaration) -> String {
        self.handlers
            .iter()
            .filter_map(|h| h.describe(outputs))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Context entries of every declared kind that provides one.
    pub fn context(
        &self,
        outputs: &OutputDeclaration,
        run: &RunContext,
        tracker: &dyn Tracker,
    ) -> Result<Vec<(OutputKind, String)>> {
        let mut entries = Vec::new();
        for handler in &self.handlers {
            if let Some(text) = handler.context(outputs, run, tracker)? {
                entries.push((handler.kind(), text));
            }
        }
        Ok(entries)
    }

    /// Validate and apply every proposed instance, kind by kind.
    ///
    /// Kinds with no instances produce no report.
    pub fn process(
        &self,
        outputs: &OutputDeclaration,
        run: &RunContext,
        tracker: &dyn Tracker,
        instances: &[OutputInstance],
    ) -> Vec<KindReport> {
        self.handlers
            .iter()
            .filter_map(|handler| {
                let of_kind: Vec<&OutputInstance> = instances
                    .iter()
                    .filter(|i| i.kind == handler.kind())
                    .collect();
                if of_kind.is_empty() {
                    None
                } else {
                    Some(handler.validate_and_apply(outputs, run, tracker, &of_kind))
                }
            })
            .collect()
    }
}
