//! `update_discussion`: replace a discussion's body.

use crate::error::Result;
use crate::event::ItemKind;
use crate::outputs::config::DiscussionConfig;
use crate::outputs::footer::with_footer;
use crate::outputs::instance::OutputKind;
use crate::outputs::protocol::{ExecutionOutcome, OutputHandler, RunContext};
use crate::outputs::tracker::Tracker;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscussionPayload {
    pub body: String,
    #[serde(default)]
    pub discussion_number: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiscussionHandler;

fn target(payload: &DiscussionPayload, run: &RunContext) -> Option<u64> {
    payload.discussion_number.or_else(|| {
        run.item
            .filter(|i| i.kind == ItemKind::Discussion)
            .map(|i| i.number)
    })
}

impl OutputHandler for DiscussionHandler {
    type Config = DiscussionConfig;
    type Payload = DiscussionPayload;

    const KIND: OutputKind = OutputKind::UpdateDiscussion;

    fn max_instances(config: &DiscussionConfig) -> u32 {
        config.max
    }

    fn describe(&self, config: &DiscussionConfig) -> String {
        format!(
            "### update_discussion\n\
             Replace the body of the triggering discussion.\n\
             Fields: `body` (string, required), `discussion_number` (integer, optional).\n\
             Limit: at most {} per run.",
            config.max
        )
    }

    fn check(
        &self,
        _config: &DiscussionConfig,
        run: &RunContext,
        _tracker: &dyn Tracker,
        payload: &DiscussionPayload,
    ) -> Result<Vec<String>> {
        let mut reasons = Vec::new();
        if payload.body.trim().is_empty() {
            reasons.push("`body` must not be empty".to_string());
        }
        if target(payload, run).is_none() {
            reasons.push(
                "no target: the event has no discussion and `discussion_number` is absent"
                    .to_string(),
            );
        }
        Ok(reasons)
    }

    fn apply(
        &self,
        _config: &DiscussionConfig,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &DiscussionPayload,
    ) -> Result<ExecutionOutcome> {
        let Some(number) = target(payload, run) else {
            return Ok(ExecutionOutcome::Discarded {
                reason: "no target discussion".to_string(),
            });
        };
        tracker.update_discussion_body(number, &with_footer(&payload.body, run))?;
        Ok(ExecutionOutcome::Applied {
            detail: format!("updated discussion #{}", number),
        })
    }
}
