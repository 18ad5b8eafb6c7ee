//! `add_labels` / `remove_labels`.
//!
//! Both read the item's current labels immediately before writing and send
//! only the difference, so label changes made by others in between survive.

use crate::error::Result;
use crate::outputs::config::LabelConfig;
use crate::outputs::instance::OutputKind;
use crate::outputs::protocol::{ExecutionOutcome, OutputHandler, RunContext, resolve_issue_target};
use crate::outputs::tracker::Tracker;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelsPayload {
    pub labels: Vec<String>,
    #[serde(default)]
    pub item_number: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddLabelsHandler;

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveLabelsHandler;

/// Repository labels visible to the agent under its allow-list.
fn visible_labels(config: &LabelConfig, tracker: &dyn Tracker) -> Result<Vec<String>> {
    let mut labels = tracker.repository_labels()?;
    if !config.allowed.is_empty() {
        labels.retain(|l| config.allowed.contains(l));
    }
    labels.sort();
    Ok(labels)
}

fn describe_labels(kind: OutputKind, verb: &str, config: &LabelConfig) -> String {
    let allowed = if config.allowed.is_empty() {
        "any existing repository label".to_string()
    } else {
        config.allowed.join(", ")
    };
    format!(
        "### {}\n\
         {} labels on the triggering issue or pull request.\n\
         Fields: `labels` (array of strings, required), `item_number` (integer, optional).\n\
         Allowed labels: {}.\n\
         Limit: at most {} per run.",
        kind, verb, allowed, config.max
    )
}

/// Checks shared by both label kinds.
fn check_common(config: &LabelConfig, run: &RunContext, payload: &LabelsPayload) -> Vec<String> {
    let mut reasons = Vec::new();
    if payload.labels.is_empty() {
        reasons.push("`labels` must not be empty".to_string());
    }
    for label in &payload.labels {
        if label.trim().is_empty() {
            reasons.push("label names must not be empty".to_string());
        } else if !config.allowed.is_empty() && !config.allowed.contains(label) {
            reasons.push(format!("label '{}' is not in the allowed list", label));
        }
    }
    if resolve_issue_target(payload.item_number, run).is_none() {
        reasons.push(
            "no target: the event has no issue or pull request and `item_number` is absent"
                .to_string(),
        );
    }
    reasons
}

impl OutputHandler for AddLabelsHandler {
    type Config = LabelConfig;
    type Payload = LabelsPayload;

    const KIND: OutputKind = OutputKind::AddLabels;

    fn max_instances(config: &LabelConfig) -> u32 {
        config.max
    }

    fn context(
        &self,
        config: &LabelConfig,
        _run: &RunContext,
        tracker: &dyn Tracker,
    ) -> Result<Option<String>> {
        let labels = visible_labels(config, tracker)?;
        Ok(Some(format!("Valid labels: {}", labels.join(", "))))
    }

    fn describe(&self, config: &LabelConfig) -> String {
        describe_labels(Self::KIND, "Add", config)
    }

    fn check(
        &self,
        config: &LabelConfig,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &LabelsPayload,
    ) -> Result<Vec<String>> {
        let mut reasons = check_common(config, run, payload);
        let existing = tracker.repository_labels()?;
        for label in &payload.labels {
            if !label.trim().is_empty() && !existing.contains(label) {
                reasons.push(format!("label '{}' does not exist in the repository", label));
            }
        }
        Ok(reasons)
    }

    fn apply(
        &self,
        _config: &LabelConfig,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &LabelsPayload,
    ) -> Result<ExecutionOutcome> {
        let Some(number) = resolve_issue_target(payload.item_number, run) else {
            return Ok(ExecutionOutcome::Discarded {
                reason: "no target item".to_string(),
            });
        };

        let current = tracker.item_labels(number)?;
        let mut missing: Vec<String> = Vec::new();
        for label in &payload.labels {
            if !current.contains(label) && !missing.contains(label) {
                missing.push(label.clone());
            }
        }

        if missing.is_empty() {
            return Ok(ExecutionOutcome::Skipped {
                reason: format!("#{} already has every requested label", number),
            });
        }

        tracker.add_item_labels(number, &missing)?;
        Ok(ExecutionOutcome::Applied {
            detail: format!("added to #{}: {}", number, missing.join(", ")),
        })
    }
}

impl OutputHandler for RemoveLabelsHandler {
    type Config = LabelConfig;
    type Payload = LabelsPayload;

    const KIND: OutputKind = OutputKind::RemoveLabels;

    fn max_instances(config: &LabelConfig) -> u32 {
        config.max
    }

    fn describe(&self, config: &LabelConfig) -> String {
        describe_labels(Self::KIND, "Remove", config)
    }

    fn check(
        &self,
        config: &LabelConfig,
        run: &RunContext,
        _tracker: &dyn Tracker,
        payload: &LabelsPayload,
    ) -> Result<Vec<String>> {
        Ok(check_common(config, run, payload))
    }

    fn apply(
        &self,
        _config: &LabelConfig,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &LabelsPayload,
    ) -> Result<ExecutionOutcome> {
        let Some(number) = resolve_issue_target(payload.item_number, run) else {
            return Ok(ExecutionOutcome::Discarded {
                reason: "no target item".to_string(),
            });
        };

        let current = tracker.item_labels(number)?;
        let present: Vec<&String> = current
            .iter()
            .filter(|l| payload.labels.contains(l))
            .collect();

        if present.is_empty() {
            return Ok(ExecutionOutcome::Skipped {
                reason: format!("#{} carries none of the labels to remove", number),
            });
        }

        for label in &present {
            tracker.remove_item_label(number, label)?;
        }
        let removed: Vec<&str> = present.iter().map(|l| l.as_str()).collect();
        Ok(ExecutionOutcome::Applied {
            detail: format!("removed from #{}: {}", number, removed.join(", ")),
        })
    }
}
