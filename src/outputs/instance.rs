//! Action-kinds and the output instances an agent proposes.
//!
//! An agent writes its proposals as NDJSON, one JSON object per line with a
//! `type` field naming the action-kind:
//!
//! ```text
//! {"type": "add_comment", "body": "Looks like a duplicate of #12."}
//! {"type": "add_labels", "labels": ["duplicate"]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The closed set of side-effecting actions an agent may propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    AddComment,
    AddLabels,
    RemoveLabels,
    CreateIssue,
    CreatePullRequest,
    UpdateDiscussion,
}

impl OutputKind {
    /// Every kind, in canonical order.
    pub const ALL: [OutputKind; 6] = [
        OutputKind::AddComment,
        OutputKind::AddLabels,
        OutputKind::RemoveLabels,
        OutputKind::CreateIssue,
        OutputKind::CreatePullRequest,
        OutputKind::UpdateDiscussion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::AddComment => "add_comment",
            OutputKind::AddLabels => "add_labels",
            OutputKind::RemoveLabels => "remove_labels",
            OutputKind::CreateIssue => "create_issue",
            OutputKind::CreatePullRequest => "create_pull_request",
            OutputKind::UpdateDiscussion => "update_discussion",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One proposed action, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputInstance {
    pub kind: OutputKind,
    /// 1-based position among instances of the same kind in this run.
    pub ordinal: usize,
    /// The line's fields, without `type`.
    pub payload: Value,
}

/// A line of agent output that could not be turned into an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLine {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// Result of parsing an agent's output file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedOutputs {
    pub instances: Vec<OutputInstance>,
    pub rejected: Vec<RejectedLine>,
}

/// Parse NDJSON agent output into instances.
///
/// Blank lines are ignored. Lines that are not JSON objects, lack a string
/// `type`, or name an unknown kind are rejected with a reason instead of
/// aborting the parse.
pub fn parse_output_lines(text: &str) -> ParsedOutputs {
    let mut parsed = ParsedOutputs::default();
    let mut ordinals: BTreeMap<OutputKind, usize> = BTreeMap::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                parsed.rejected.push(RejectedLine {
                    line: line_no,
                    reason: format!("invalid JSON: {}", e),
                });
                continue;
            }
        };

        let Value::Object(mut fields) = value else {
            parsed.rejected.push(RejectedLine {
                line: line_no,
                reason: "expected a JSON object".to_string(),
            });
            continue;
        };

        let kind = match fields.remove("type") {
            Some(Value::String(name)) => match OutputKind::from_str(&name) {
                Some(kind) => kind,
                None => {
                    parsed.rejected.push(RejectedLine {
                        line: line_no,
                        reason: format!("unknown action kind '{}'", name),
                    });
                    continue;
                }
            },
            _ => {
                parsed.rejected.push(RejectedLine {
                    line: line_no,
                    reason: "missing string field `type`".to_string(),
                });
                continue;
            }
        };

        let ordinal = ordinals.entry(kind).or_insert(0);
        *ordinal += 1;
        parsed.instances.push(OutputInstance {
            kind,
            ordinal: *ordinal,
            payload: Value::Object(fields),
        });
    }

    parsed
}
