//! Inbound events.
//!
//! An [`InboundEvent`] is the single event the dispatcher evaluates every
//! agent against. It is built from the substrate's event name and JSON
//! payload (the file at `$GITHUB_EVENT_PATH`).

use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event types an agent can be triggered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Issues,
    IssueComment,
    PullRequest,
    PullRequestReview,
    Discussion,
    DiscussionComment,
    /// Cron-triggered run. Never declared under `events`.
    Schedule,
    /// Manual invocation. Never declared under `events`.
    WorkflowDispatch,
}

impl EventType {
    /// The substrate's name for this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Issues => "issues",
            EventType::IssueComment => "issue_comment",
            EventType::PullRequest => "pull_request",
            EventType::PullRequestReview => "pull_request_review",
            EventType::Discussion => "discussion",
            EventType::DiscussionComment => "discussion_comment",
            EventType::Schedule => "schedule",
            EventType::WorkflowDispatch => "workflow_dispatch",
        }
    }

    /// Parse an event type from the substrate's event name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "issues" => Some(Self::Issues),
            "issue_comment" => Some(Self::IssueComment),
            "pull_request" => Some(Self::PullRequest),
            "pull_request_review" => Some(Self::PullRequestReview),
            "discussion" => Some(Self::Discussion),
            "discussion_comment" => Some(Self::DiscussionComment),
            "schedule" => Some(Self::Schedule),
            "workflow_dispatch" => Some(Self::WorkflowDispatch),
            _ => None,
        }
    }

    /// Whether this event is about a work item and carries sub-actions.
    pub fn is_item_event(&self) -> bool {
        !matches!(self, EventType::Schedule | EventType::WorkflowDispatch)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work item an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Issue,
    PullRequest,
    Discussion,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Issue => "issue",
            ItemKind::PullRequest => "pull_request",
            ItemKind::Discussion => "discussion",
        }
    }
}

/// A reference to one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub number: u64,
}

/// One inbound event, as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event_type: EventType,

    /// Sub-action (e.g. `opened`, `labeled`); absent for schedule/manual runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// The affected work item, when the event has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemRef>,

    /// Login of the triggering actor.
    pub actor: String,

    /// Labels the item carried in the event payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_labels: Vec<String>,

    /// Cron expression that fired, for schedule events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    /// Agent named by a manual invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_agent: Option<String>,

    /// Substrate run identifier.
    pub run_id: String,
}

impl InboundEvent {
    /// Build an event from the substrate's event name and payload.
    pub fn from_payload(
        event_name: &str,
        payload: &Value,
        actor: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Result<Self> {
        let event_type = EventType::from_str(event_name).ok_or_else(|| {
            FleetError::UserError(format!("unsupported event type '{}'", event_name))
        })?;

        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string);

        let item_object = item_object(event_type, payload);
        let item = item_object.and_then(|(kind, obj)| {
            obj.get("number")
                .and_then(Value::as_u64)
                .map(|number| ItemRef { kind, number })
        });
        let item_labels = item_object
            .map(|(_, obj)| label_names(obj))
            .unwrap_or_default();

        let schedule = match event_type {
            EventType::Schedule => payload
                .get("schedule")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };

        let requested_agent = match event_type {
            EventType::WorkflowDispatch => payload
                .pointer("/inputs/agent")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        };

        Ok(Self {
            event_type,
            action,
            item,
            actor: actor.into(),
            item_labels,
            schedule,
            requested_agent,
            run_id: run_id.into(),
        })
    }

    /// Short human description, e.g. `issues.opened #12`.
    pub fn describe(&self) -> String {
        let mut out = self.event_type.to_string();
        if let Some(action) = &self.action {
            out.push('.');
            out.push_str(action);
        }
        if let Some(item) = self.item {
            out.push_str(&format!(" #{}", item.number));
        }
        out
    }
}

/// Locate the work-item object inside a payload.
fn item_object(event_type: EventType, payload: &Value) -> Option<(ItemKind, &Value)> {
    match event_type {
        EventType::Issues => payload.get("issue").map(|o| (ItemKind::Issue, o)),
        // Comments on pull requests arrive as issue comments.
        EventType::IssueComment => payload.get("issue").map(|o| {
            if o.get("pull_request").is_some() {
                (ItemKind::PullRequest, o)
            } else {
                (ItemKind::Issue, o)
            }
        }),
        EventType::PullRequest | EventType::PullRequestReview => payload
            .get("pull_request")
            .map(|o| (ItemKind::PullRequest, o)),
        EventType::Discussion | EventType::DiscussionComment => {
            payload.get("discussion").map(|o| (ItemKind::Discussion, o))
        }
        EventType::Schedule | EventType::WorkflowDispatch => None,
    }
}

fn label_names(item: &Value) -> Vec<String> {
    item.get("labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|l| l.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_names_round_trip() {
        for ty in [
            EventType::Issues,
            EventType::IssueComment,
            EventType::PullRequest,
            EventType::PullRequestReview,
            EventType::Discussion,
            EventType::DiscussionComment,
            EventType::Schedule,
            EventType::WorkflowDispatch,
        ] {
            assert_eq!(EventType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(EventType::from_str("push"), None);
    }

    #[test]
    fn issue_event_from_payload() {
        let payload = json!({
            "action": "labeled",
            "issue": {"number": 42, "labels": [{"name": "bug"}, {"name": "triage"}]}
        });
        let event = InboundEvent::from_payload("issues", &payload, "octocat", "100").unwrap();

        assert_eq!(event.event_type, EventType::Issues);
        assert_eq!(event.action.as_deref(), Some("labeled"));
        assert_eq!(
            event.item,
            Some(ItemRef {
                kind: ItemKind::Issue,
                number: 42
            })
        );
        assert_eq!(event.item_labels, vec!["bug", "triage"]);
        assert_eq!(event.describe(), "issues.labeled #42");
    }

    #[test]
    fn issue_comment_on_pull_request_is_pull_request_item() {
        let payload = json!({
            "action": "created",
            "issue": {"number": 7, "pull_request": {"url": "x"}}
        });
        let event =
            InboundEvent::from_payload("issue_comment", &payload, "octocat", "1").unwrap();
        assert_eq!(event.item.unwrap().kind, ItemKind::PullRequest);
    }

    #[test]
    fn discussion_event_from_payload() {
        let payload = json!({"action": "created", "discussion": {"number": 3}});
        let event = InboundEvent::from_payload("discussion", &payload, "octocat", "1").unwrap();
        assert_eq!(event.item.unwrap().kind, ItemKind::Discussion);
    }

    #[test]
    fn schedule_event_has_no_item() {
        let payload = json!({"schedule": "0 9 * * 1"});
        let event =
            InboundEvent::from_payload("schedule", &payload, "github-actions[bot]", "5").unwrap();
        assert_eq!(event.item, None);
        assert_eq!(event.schedule.as_deref(), Some("0 9 * * 1"));
        assert_eq!(event.describe(), "schedule");
    }

    #[test]
    fn manual_event_reads_requested_agent() {
        let payload = json!({"inputs": {"agent": " triage "}});
        let event =
            InboundEvent::from_payload("workflow_dispatch", &payload, "octocat", "5").unwrap();
        assert_eq!(event.requested_agent.as_deref(), Some("triage"));

        let payload = json!({"inputs": {"agent": ""}});
        let event =
            InboundEvent::from_payload("workflow_dispatch", &payload, "octocat", "5").unwrap();
        assert_eq!(event.requested_agent, None);
    }

    #[test]
    fn unsupported_event_is_user_error() {
        let err = InboundEvent::from_payload("push", &json!({}), "octocat", "1").unwrap_err();
        assert!(err.to_string().contains("unsupported event type 'push'"));
    }
}
