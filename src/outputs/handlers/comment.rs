//! `add_comment`: post a comment on an issue or pull request.

use crate::error::Result;
use crate::outputs::config::CommentConfig;
use crate::outputs::footer::with_footer;
use crate::outputs::instance::OutputKind;
use crate::outputs::protocol::{ExecutionOutcome, OutputHandler, RunContext, resolve_issue_target};
use crate::outputs::tracker::Tracker;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentPayload {
    pub body: String,
    #[serde(default)]
    pub item_number: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentHandler;

impl OutputHandler for CommentHandler {
    type Config = CommentConfig;
    type Payload = CommentPayload;

    const KIND: OutputKind = OutputKind::AddComment;

    fn max_instances(config: &CommentConfig) -> u32 {
        config.max
    }

    fn describe(&self, config: &CommentConfig) -> String {
        format!(
            "### add_comment\n\
             Post a comment on the triggering issue or pull request.\n\
             Fields: `body` (string, required), `item_number` (integer, optional; defaults to the triggering item).\n\
             Limit: at most {} per run.",
            config.max
        )
    }

    fn check(
        &self,
        _config: &CommentConfig,
        run: &RunContext,
        _tracker: &dyn Tracker,
        payload: &CommentPayload,
    ) -> Result<Vec<String>> {
        let mut reasons = Vec::new();
        if payload.body.trim().is_empty() {
            reasons.push("`body` must not be empty".to_string());
        }
        if resolve_issue_target(payload.item_number, run).is_none() {
            reasons.push(
                "no target: the event has no issue or pull request and `item_number` is absent"
                    .to_string(),
            );
        }
        Ok(reasons)
    }

    fn apply(
        &self,
        _config: &CommentConfig,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &CommentPayload,
    ) -> Result<ExecutionOutcome> {
        // Target presence was established in check().
        let Some(number) = resolve_issue_target(payload.item_number, run) else {
            return Ok(ExecutionOutcome::Discarded {
                reason: "no target item".to_string(),
            });
        };
        let url = tracker.add_comment(number, &with_footer(&payload.body, run))?;
        Ok(ExecutionOutcome::Applied {
            detail: format!("commented on #{}: {}", number, url),
        })
    }
}
