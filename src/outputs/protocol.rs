//! The two-phase validate-then-apply protocol.
//!
//! Every instance of a kind is validated before any is applied. If one
//! instance fails validation, no instance of that kind is applied in the
//! run. Kinds are processed independently of each other.
//!
//! Validation cannot see every way the tracker may reject a write. When an
//! apply call fails, the instances before it stay applied (tracker writes
//! have no rollback), the failing one is recorded as `Failed` and the rest
//! as `Discarded` without being attempted. Such a kind reports
//! [`KindReport::is_partial`], and its execution failure marks the agent as
//! failed so the run files a tracking issue.

use super::instance::{OutputInstance, OutputKind};
use super::tracker::Tracker;
use crate::error::Result;
use crate::event::ItemRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Facts about the current run that handlers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub agent: String,
    pub run_id: String,
    pub run_url: String,
    /// The item the triggering event was about.
    pub item: Option<ItemRef>,
    /// The environment can produce signed commits.
    pub can_sign: bool,
    /// Label attached to issues this agent opens as companion items.
    pub companion_label: Option<String>,
}

/// Result of phase 1 for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Pass,
    Fail { reasons: Vec<String> },
}

impl ValidationVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationVerdict::Pass)
    }
}

/// What happened to one instance in phase 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The side effect was performed.
    Applied { detail: String },
    /// Nothing to do; the desired state already holds.
    Skipped { reason: String },
    /// The tracker call failed.
    Failed { error: String },
    /// The instance was never attempted.
    Discarded { reason: String },
}

/// Audit entry for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceReport {
    pub ordinal: usize,
    pub verdict: ValidationVerdict,
    pub outcome: ExecutionOutcome,
}

/// Audit entry for every instance of one kind in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindReport {
    pub kind: OutputKind,
    /// Phase 2 ran (every instance passed validation).
    pub applied: bool,
    pub instances: Vec<InstanceReport>,
}

impl KindReport {
    /// Instances that failed validation.
    pub fn validation_failures(&self) -> impl Iterator<Item = &InstanceReport> {
        self.instances.iter().filter(|i| !i.verdict.is_pass())
    }

    /// Instances whose tracker call failed.
    pub fn execution_failures(&self) -> impl Iterator<Item = &InstanceReport> {
        self.instances
            .iter()
            .filter(|i| matches!(i.outcome, ExecutionOutcome::Failed { .. }))
    }

    /// Some instances were applied before a tracker call failed.
    pub fn is_partial(&self) -> bool {
        self.execution_failures().next().is_some()
            && self
                .instances
                .iter()
                .any(|i| matches!(i.outcome, ExecutionOutcome::Applied { .. }))
    }

    /// Whether any instance failed validation or execution.
    pub fn has_failures(&self) -> bool {
        self.validation_failures().next().is_some() || self.execution_failures().next().is_some()
    }
}

/// Contract implemented by every action-kind handler.
pub trait OutputHandler {
    /// Kind-specific configuration from the agent's output declaration.
    type Config;
    /// Typed shape of one instance's payload.
    type Payload: DeserializeOwned;

    const KIND: OutputKind;

    /// Configured instance cap.
    fn max_instances(config: &Self::Config) -> u32;

    /// Supplementary read-only information shown to the agent.
    fn context(
        &self,
        _config: &Self::Config,
        _run: &RunContext,
        _tracker: &dyn Tracker,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    /// Capability description: schema and configured limits. No I/O.
    fn describe(&self, config: &Self::Config) -> String;

    /// Field and live-state checks for one well-formed payload.
    ///
    /// Returns every violation found, not just the first.
    fn check(
        &self,
        config: &Self::Config,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &Self::Payload,
    ) -> Result<Vec<String>>;

    /// Perform the side effect for one validated payload.
    fn apply(
        &self,
        config: &Self::Config,
        run: &RunContext,
        tracker: &dyn Tracker,
        payload: &Self::Payload,
    ) -> Result<ExecutionOutcome>;
}

/// Run both phases for every instance of `H::KIND`.
pub fn validate_and_apply<H: OutputHandler>(
    handler: &H,
    config: &H::Config,
    run: &RunContext,
    tracker: &dyn Tracker,
    instances: &[&OutputInstance],
) -> KindReport {
    let max = H::max_instances(config) as usize;

    // Phase 1: validate everything, collecting every failure.
    let mut checked: Vec<(usize, Option<H::Payload>, ValidationVerdict)> = Vec::new();
    for (idx, instance) in instances.iter().enumerate() {
        let mut reasons = Vec::new();

        if idx >= max {
            reasons.push(format!(
                "exceeds the maximum of {} {} instance(s) per run",
                max,
                H::KIND
            ));
        }

        let payload = match serde_json::from_value::<H::Payload>(instance.payload.clone()) {
            Ok(payload) => {
                match handler.check(config, run, tracker, &payload) {
                    Ok(found) => reasons.extend(found),
                    Err(e) => reasons.push(format!("could not verify against live state: {}", e)),
                }
                Some(payload)
            }
            Err(e) => {
                reasons.push(format!("malformed payload: {}", e));
                None
            }
        };

        let verdict = if reasons.is_empty() {
            ValidationVerdict::Pass
        } else {
            ValidationVerdict::Fail { reasons }
        };
        debug!(kind = %H::KIND, ordinal = instance.ordinal, pass = verdict.is_pass(), "validated instance");
        checked.push((instance.ordinal, payload, verdict));
    }

    let all_pass = checked.iter().all(|(_, _, v)| v.is_pass());
    if !all_pass {
        let failed = checked.iter().filter(|(_, _, v)| !v.is_pass()).count();
        warn!(kind = %H::KIND, failed, total = checked.len(), "validation failed; applying nothing of this kind");
        let instances = checked
            .into_iter()
            .map(|(ordinal, _, verdict)| {
                let reason = if verdict.is_pass() {
                    "another instance of this kind failed validation".to_string()
                } else {
                    "failed validation".to_string()
                };
                InstanceReport {
                    ordinal,
                    verdict,
                    outcome: ExecutionOutcome::Discarded { reason },
                }
            })
            .collect();
        return KindReport {
            kind: H::KIND,
            applied: false,
            instances,
        };
    }

    // Phase 2: apply in order; stop at the first tracker failure.
    let mut reports = Vec::with_capacity(checked.len());
    let mut halted = false;
    for (ordinal, payload, verdict) in checked {
        let outcome = match (halted, payload) {
            (true, _) => ExecutionOutcome::Discarded {
                reason: "not attempted: an earlier instance of this kind failed to apply"
                    .to_string(),
            },
            (false, Some(payload)) => match handler.apply(config, run, tracker, &payload) {
                Ok(outcome) => outcome,
                Err(e) => {
                    halted = true;
                    ExecutionOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            },
            // A passing verdict always carries a parsed payload.
            (false, None) => ExecutionOutcome::Discarded {
                reason: "payload unavailable".to_string(),
            },
        };
        info!(kind = %H::KIND, ordinal, outcome = ?outcome, "applied instance");
        reports.push(InstanceReport {
            ordinal,
            verdict,
            outcome,
        });
    }

    KindReport {
        kind: H::KIND,
        applied: true,
        instances: reports,
    }
}

/// Report for instances of a kind the agent did not declare.
pub fn reject_undeclared(agent: &str, kind: OutputKind, instances: &[&OutputInstance]) -> KindReport {
    let instances = instances
        .iter()
        .map(|i| InstanceReport {
            ordinal: i.ordinal,
            verdict: ValidationVerdict::Fail {
                reasons: vec![format!(
                    "action kind `{}` is not enabled for agent `{}`",
                    kind, agent
                )],
            },
            outcome: ExecutionOutcome::Discarded {
                reason: "failed validation".to_string(),
            },
        })
        .collect();
    KindReport {
        kind,
        applied: false,
        instances,
    }
}

/// Resolve the issue or pull request an instance targets.
///
/// An explicit number wins; otherwise the triggering item is used when it
/// is an issue or pull request.
pub(crate) fn resolve_issue_target(explicit: Option<u64>, run: &RunContext) -> Option<u64> {
    use crate::event::ItemKind;
    explicit.or_else(|| {
        run.item
            .filter(|i| matches!(i.kind, ItemKind::Issue | ItemKind::PullRequest))
            .map(|i| i.number)
    })
}
