//! Dispatch verdicts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why an agent was not admitted. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoTriggerMatch,
    UnauthorizedActor,
    LabelAbsent,
    RateLimited,
    BlockingItemOpen,
    /// A live lookup for this agent failed; the agent is not run blind.
    LookupFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoTriggerMatch => "no_trigger_match",
            SkipReason::UnauthorizedActor => "unauthorized_actor",
            SkipReason::LabelAbsent => "label_absent",
            SkipReason::RateLimited => "rate_limited",
            SkipReason::BlockingItemOpen => "blocking_item_open",
            SkipReason::LookupFailed => "lookup_failed",
        }
    }

    /// Human wording used in summaries.
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::NoTriggerMatch => "no trigger match",
            SkipReason::UnauthorizedActor => "unauthorized actor",
            SkipReason::LabelAbsent => "label absent",
            SkipReason::RateLimited => "rate limited",
            SkipReason::BlockingItemOpen => "blocking item open",
            SkipReason::LookupFailed => "lookup failed",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Decision for one (agent, event) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DispatchVerdict {
    Admit,
    Skip { reason: SkipReason, detail: String },
}

impl DispatchVerdict {
    pub fn skip(reason: SkipReason, detail: impl Into<String>) -> Self {
        DispatchVerdict::Skip {
            reason,
            detail: detail.into(),
        }
    }

    pub fn is_admit(&self) -> bool {
        matches!(self, DispatchVerdict::Admit)
    }

    pub fn reason(&self) -> Option<SkipReason> {
        match self {
            DispatchVerdict::Admit => None,
            DispatchVerdict::Skip { reason, .. } => Some(*reason),
        }
    }

    /// Value of the per-agent dispatch output: `admit`, or `skip`.
    pub fn output_value(&self) -> &'static str {
        match self {
            DispatchVerdict::Admit => "admit",
            DispatchVerdict::Skip { .. } => "skip",
        }
    }

    /// One-line summary, e.g. `skip (rate limited: last success 3m ago)`.
    pub fn summary(&self) -> String {
        match self {
            DispatchVerdict::Admit => "admit".to_string(),
            DispatchVerdict::Skip { reason, detail } if detail.is_empty() => {
                format!("skip ({})", reason)
            }
            DispatchVerdict::Skip { reason, detail } => format!("skip ({}: {})", reason, detail),
        }
    }
}

/// Verdicts keyed by agent name.
pub type VerdictMap = BTreeMap<String, DispatchVerdict>;
