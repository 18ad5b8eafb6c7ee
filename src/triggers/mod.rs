//! Trigger declarations, their aggregation into one entry point, and the
//! per-agent matching the dispatcher uses.
//!
//! The aggregate is stored in sorted collections only, so the same agent
//! set always produces the same [`TriggerSet`] regardless of order.

use crate::agent::AgentSpec;
use crate::error::{FleetError, Result};
use crate::event::{EventType, InboundEvent};
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

#[cfg(test)]
mod tests;

/// Sub-action added to `issues` when any agent retries on companion close.
pub const COMPANION_CLOSE_ACTION: &str = "closed";

/// Name of the manual-invocation input naming the agent to run.
pub const MANUAL_AGENT_INPUT: &str = "agent";

static CRON_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[0-9A-Za-z]+(-[0-9A-Za-z]+)?)(/[0-9]+)?(,(\*|[0-9A-Za-z]+(-[0-9A-Za-z]+)?)(/[0-9]+)?)*$")
        .expect("cron field regex is valid")
});

/// What one agent reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerDeclaration {
    /// Event type to sub-actions. An empty list means every action.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub events: BTreeMap<EventType, Vec<String>>,

    /// Cron expressions (five fields).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schedules: Vec<String>,
}

impl TriggerDeclaration {
    /// Check event types and cron syntax.
    pub fn validate(&self, agent: &str) -> Result<()> {
        for (event_type, actions) in &self.events {
            if !event_type.is_item_event() {
                return Err(FleetError::UserError(format!(
                    "agent '{}': '{}' cannot be declared under triggers.events",
                    agent, event_type
                )));
            }
            if actions.iter().any(|a| a.trim().is_empty()) {
                return Err(FleetError::UserError(format!(
                    "agent '{}': triggers.events.{} has an empty action",
                    agent, event_type
                )));
            }
        }
        for cron in &self.schedules {
            if !is_valid_cron(cron) {
                return Err(FleetError::UserError(format!(
                    "agent '{}': invalid cron expression '{}' (expected five fields)",
                    agent, cron
                )));
            }
        }
        Ok(())
    }
}

/// Whether `cron` has five well-formed fields.
pub fn is_valid_cron(cron: &str) -> bool {
    let fields: Vec<&str> = cron.split_whitespace().collect();
    fields.len() == 5 && fields.iter().all(|f| CRON_FIELD.is_match(f))
}

/// Sub-actions accepted for one event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionFilter {
    Any,
    Only(BTreeSet<String>),
}

impl ActionFilter {
    fn from_declared(actions: &[String]) -> Self {
        if actions.is_empty() {
            ActionFilter::Any
        } else {
            ActionFilter::Only(actions.iter().cloned().collect())
        }
    }

    /// Union with another filter. `Any` absorbs everything.
    fn union(&mut self, other: &ActionFilter) {
        match other {
            ActionFilter::Any => *self = ActionFilter::Any,
            ActionFilter::Only(theirs) => {
                if let ActionFilter::Only(mine) = self {
                    mine.extend(theirs.iter().cloned());
                }
            }
        }
    }

    fn insert(&mut self, action: &str) {
        if let ActionFilter::Only(actions) = self {
            actions.insert(action.to_string());
        }
    }

    pub fn accepts(&self, action: Option<&str>) -> bool {
        match self {
            ActionFilter::Any => true,
            ActionFilter::Only(actions) => action.is_some_and(|a| actions.contains(a)),
        }
    }
}

/// The document's single entry point: every agent's triggers combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSet {
    pub events: BTreeMap<EventType, ActionFilter>,
    pub schedules: BTreeSet<String>,
}

impl TriggerSet {
    /// Sub-actions for `event_type`, or `None` when the type is absent or
    /// accepts every action.
    pub fn actions(&self, event_type: EventType) -> Option<&BTreeSet<String>> {
        match self.events.get(&event_type) {
            Some(ActionFilter::Only(actions)) => Some(actions),
            _ => None,
        }
    }
}

/// Merge the triggers of every agent.
///
/// An empty agent set yields only the manual-invocation entry, which is
/// always present.
pub fn aggregate(agents: &[AgentSpec]) -> TriggerSet {
    let mut events: BTreeMap<EventType, ActionFilter> = BTreeMap::new();
    let mut schedules = BTreeSet::new();

    for agent in agents {
        for (event_type, actions) in &agent.triggers.events {
            let filter = ActionFilter::from_declared(actions);
            events
                .entry(*event_type)
                .and_modify(|f| f.union(&filter))
                .or_insert(filter);
        }
        schedules.extend(agent.triggers.schedules.iter().cloned());
    }

    if agents.iter().any(|a| a.admission.retry_on_companion_close) {
        events
            .entry(EventType::Issues)
            .and_modify(|f| f.insert(COMPANION_CLOSE_ACTION))
            .or_insert_with(|| {
                ActionFilter::Only(BTreeSet::from([COMPANION_CLOSE_ACTION.to_string()]))
            });
    }

    TriggerSet { events, schedules }
}

/// Whether `agent`'s own triggers match `event`.
///
/// `companion_label` is the label this agent's companion items carry; a
/// closed issue bearing it matches agents that retry on companion close.
pub fn matches(agent: &AgentSpec, event: &InboundEvent, companion_label: &str) -> bool {
    match event.event_type {
        EventType::WorkflowDispatch => event.requested_agent.as_deref() == Some(agent.name.as_str()),
        EventType::Schedule => event
            .schedule
            .as_ref()
            .is_some_and(|cron| agent.triggers.schedules.contains(cron)),
        event_type => {
            let declared = agent
                .triggers
                .events
                .get(&event_type)
                .is_some_and(|actions| {
                    ActionFilter::from_declared(actions).accepts(event.action.as_deref())
                });
            declared || is_companion_close(agent, event, companion_label)
        }
    }
}

fn is_companion_close(agent: &AgentSpec, event: &InboundEvent, companion_label: &str) -> bool {
    agent.admission.retry_on_companion_close
        && event.event_type == EventType::Issues
        && event.action.as_deref() == Some(COMPANION_CLOSE_ACTION)
        && event.item_labels.iter().any(|l| l == companion_label)
}

struct ActionTypes<'a>(&'a ActionFilter);

impl Serialize for ActionTypes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let ActionFilter::Only(actions) = self.0 {
            map.serialize_entry("types", actions)?;
        }
        map.end()
    }
}

struct CronEntry<'a>(&'a str);

impl Serialize for CronEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("cron", self.0)?;
        map.end()
    }
}

#[derive(Serialize)]
struct ManualInput {
    description: &'static str,
    required: bool,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ManualTrigger {
    inputs: BTreeMap<&'static str, ManualInput>,
}

impl ManualTrigger {
    fn new() -> Self {
        Self {
            inputs: BTreeMap::from([(
                MANUAL_AGENT_INPUT,
                ManualInput {
                    description: "Name of the agent to run",
                    required: false,
                    kind: "string",
                },
            )]),
        }
    }
}

/// Serialized as the document's `on:` block: item events, then schedules,
/// then the manual-invocation entry.
impl Serialize for TriggerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (event_type, filter) in &self.events {
            map.serialize_entry(event_type.as_str(), &ActionTypes(filter))?;
        }
        if !self.schedules.is_empty() {
            let crons: Vec<CronEntry<'_>> = self.schedules.iter().map(|c| CronEntry(c.as_str())).collect();
            map.serialize_entry(EventType::Schedule.as_str(), &crons)?;
        }
        map.serialize_entry(EventType::WorkflowDispatch.as_str(), &ManualTrigger::new())?;
        map.end()
    }
}
