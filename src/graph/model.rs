//! Typed model of the compiled workflow document.
//!
//! Field order in each struct is the order keys appear in the emitted YAML.

use super::expr::Expr;
use crate::concurrency::ConcurrencyPlan;
use crate::permissions::PermissionSet;
use crate::triggers::TriggerSet;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// Id of the node that evaluates admission for every agent.
pub const DISPATCH_JOB: &str = "dispatch";
/// Id of the always-run fan-in node that assembles the manifest.
pub const AUDIT_JOB: &str = "audit";
/// Id of the per-failed-agent tracking node.
pub const FAILURE_JOB: &str = "failure_issue";

/// The whole document.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDocument {
    pub name: String,
    pub on: TriggerSet,
    pub permissions: PermissionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyPlan>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    pub jobs: JobGraph,
}

/// How many instances of a node the substrate creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    /// One node per agent, each with its own id.
    PerAgent,
    /// Matrix over the agents whose execution failed.
    PerFailedAgent,
}

/// One node.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
    #[serde(rename = "runs-on")]
    pub runs_on: String,
    #[serde(rename = "timeout-minutes", skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
    pub permissions: PermissionSet,
    #[serde(rename = "continue-on-error", skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Expr>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    pub steps: Vec<Step>,

    #[serde(skip)]
    pub cardinality: Cardinality,
    /// Writes to the tracker.
    #[serde(skip)]
    pub side_effects: bool,
    /// Agent whose admit verdict gates this node.
    #[serde(skip)]
    pub gate: Option<String>,
}

impl Job {
    pub fn new(name: impl Into<String>, runs_on: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            needs: Vec::new(),
            condition: None,
            runs_on: runs_on.into(),
            timeout_minutes: None,
            permissions: PermissionSet::new(),
            continue_on_error: false,
            strategy: None,
            outputs: BTreeMap::new(),
            env: BTreeMap::new(),
            steps: Vec::new(),
            cardinality: Cardinality::Single,
            side_effects: false,
            gate: None,
        }
    }
}

/// Matrix fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct Strategy {
    pub matrix: BTreeMap<String, Expr>,
    #[serde(rename = "fail-fast")]
    pub fail_fast: bool,
}

/// One step of a node. Either `uses` or `run` is set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Step {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(rename = "timeout-minutes", skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
    #[serde(rename = "continue-on-error", skip_serializing_if = "is_false")]
    pub continue_on_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

impl Step {
    pub fn uses(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uses: Some(action.into()),
            ..Self::default()
        }
    }

    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: Some(script.into()),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn when(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    /// Environment entry evaluated from `value` at run time.
    pub fn env(mut self, key: impl Into<String>, value: Expr) -> Self {
        self.env.insert(key.into(), value.wrapped());
        self
    }

    pub fn timeout(mut self, minutes: u32) -> Self {
        self.timeout_minutes = Some(minutes);
        self
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Nodes keyed by id, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct JobGraph {
    jobs: Vec<(String, Job)>,
}

impl JobGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Duplicate ids are reported by [`JobGraph::check`].
    pub fn insert(&mut self, id: impl Into<String>, job: Job) {
        self.jobs.push((id.into(), job));
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|(k, _)| k == id).map(|(_, j)| j)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Job)> {
        self.jobs.iter().map(|(k, j)| (k.as_str(), j))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Serialize for JobGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.jobs.len()))?;
        for (id, job) in &self.jobs {
            map.serialize_entry(id, job)?;
        }
        map.end()
    }
}
