//! `create_issue`: open a new issue.

use crate::error::Result;
use crate::outputs::config::IssueConfig;
use crate::outputs::footer::with_footer;
use crate::outputs::instance::OutputKind;
use crate::outputs::protocol::{ExecutionOutcome, OutputHandler, RunContext};
use crate::outputs::tracker::Tracker;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuePayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IssueHandler;

impl IssueHandler {
    fn title(config: &IssueConfig, payload: &IssuePayload) -> String {
        match &config.title_prefix {
            Some(prefix) => format!("{}{}", prefix, payload.title.trim()),
            None => payload.title.trim().to_string(),
        }
    }

    /// Configured labels, then the agent's, then the companion label.
    fn labels(config: &IssueConfig, run: &RunContext, payload: &IssuePayload) -> Vec<String> {
        let mut labels = config.labels.clone();
        for label in payload.labels.iter().chain(run.companion_label.iter()) {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        labels
    }
}

impl OutputHandler for IssueHandler {
    type Config = IssueConfig;
    type Payload = IssuePayload;

    const KIND: OutputKind = OutputKind::CreateIssue;

    fn max_instances(config: &IssueConfig) -> u32 {
        config.max
    }

    fn describe(&self, config: &IssueConfig) -> String {
        let mut out = format!(
            "### create_issue\n\
             Open a new issue.\n\
             Fields: `title` (string, required), `body` (string, required), `labels` (array of existing label names, optional).\n\
             Limit: at most {} per run.",
            config.max
        );
        if let Some(prefix) = &config.title_prefix {
            out.push_str(&format!("\nTitles are prefixed with \"{}\".", prefix));
        }
        out
    }

    fn check(
        &self,
        _config: &IssueConfig,
        _run: &RunContext,
        tracker: &dyn Tracker,
        payload: &IssuePayload,
    ) -> Result<Vec<String>> {
        let mut reasons = Vec::new();
        if payload.title.trim().is_empty() {
            reasons.push("`title` must not be empty".to_string());
        }
        if payload.body.trim().is_empty() {
            reasons.push("`body` must not be empty".to_string());
        }
        if !payload.labels.is_empty() {
            let existing = tracker.repository_labels()?;
            for label in &payload.labels {
                if !existing.contains(label) {
                    reasons.push(format!("label '{}' does not exist in the repository", label));
                }
            }
        }
        Ok(reasons)
    }

    fn apply(
        &self,
        config: &IssueConfig,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &IssuePayload,
    ) -> Result<ExecutionOutcome> {
        let number = tracker.create_issue(
            &Self::title(config, payload),
            &with_footer(&payload.body, run),
            &Self::labels(config, run, payload),
        )?;
        Ok(ExecutionOutcome::Applied {
            detail: format!("opened issue #{}", number),
        })
    }
}
