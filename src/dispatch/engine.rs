//! The per-agent admission decision.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. trigger match
//! 2. actor authorization
//! 3. required labels
//! 4. minimum interval since the last successful run
//! 5. open companion item
//!
//! Each agent is evaluated on its own; one agent's verdict never depends on
//! another's. A failed lookup while evaluating one agent skips that agent
//! with [`SkipReason::LookupFailed`] and leaves the others untouched.

use super::state::RepoState;
use super::verdict::{DispatchVerdict, SkipReason, VerdictMap};
use crate::agent::AgentSpec;
use crate::config::Config;
use crate::error::Result;
use crate::event::{EventType, InboundEvent};
use crate::triggers;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

pub struct DispatchEngine<'a> {
    config: &'a Config,
    state: &'a dyn RepoState,
    now: DateTime<Utc>,
}

impl<'a> DispatchEngine<'a> {
    pub fn new(config: &'a Config, state: &'a dyn RepoState, now: DateTime<Utc>) -> Self {
        Self { config, state, now }
    }

    /// Verdict for every agent, keyed by name.
    pub fn evaluate_all(&self, agents: &[AgentSpec], event: &InboundEvent) -> VerdictMap {
        let mut verdicts = VerdictMap::new();
        for agent in agents {
            let verdict = self.evaluate(agent, event).unwrap_or_else(|err| {
                warn!(agent = %agent.name, error = %err, "state lookup failed, skipping agent");
                DispatchVerdict::skip(SkipReason::LookupFailed, err.to_string())
            });
            verdicts.insert(agent.name.clone(), verdict);
        }
        verdicts
    }

    /// Verdict for one agent. Lookup failures are returned as errors.
    pub fn evaluate(&self, agent: &AgentSpec, event: &InboundEvent) -> Result<DispatchVerdict> {
        let verdict = match self.first_failure(agent, event)? {
            Some(skip) => skip,
            None => DispatchVerdict::Admit,
        };
        info!(agent = %agent.name, event = %event.describe(), verdict = %verdict.summary(), "dispatch verdict");
        Ok(verdict)
    }

    fn first_failure(
        &self,
        agent: &AgentSpec,
        event: &InboundEvent,
    ) -> Result<Option<DispatchVerdict>> {
        let companion_label = self.config.companion_label(&agent.name);
        if !triggers::matches(agent, event, &companion_label) {
            return Ok(Some(DispatchVerdict::skip(
                SkipReason::NoTriggerMatch,
                "",
            )));
        }
        debug!(agent = %agent.name, "trigger matched");

        if let Some(skip) = self.check_actor(agent, event)? {
            return Ok(Some(skip));
        }
        if let Some(skip) = self.check_labels(agent, event)? {
            return Ok(Some(skip));
        }
        if let Some(skip) = self.check_interval(agent)? {
            return Ok(Some(skip));
        }
        if agent.admission.retry_on_companion_close
            && let Some(number) = self.state.open_item_with_label(&companion_label)?
        {
            return Ok(Some(DispatchVerdict::skip(
                SkipReason::BlockingItemOpen,
                format!("companion issue #{} is still open", number),
            )));
        }
        Ok(None)
    }

    fn check_actor(&self, agent: &AgentSpec, event: &InboundEvent) -> Result<Option<DispatchVerdict>> {
        // Scheduled runs are started by the platform, not a person.
        if event.event_type == EventType::Schedule {
            return Ok(None);
        }

        let actor = event.actor.as_str();
        let (names, teams): (Vec<&String>, Vec<&String>) = agent
            .admission
            .allowed_actors
            .iter()
            .partition(|entry| !entry.contains('/'));

        if names
            .iter()
            .any(|name| name.trim_start_matches('@').eq_ignore_ascii_case(actor))
        {
            return Ok(None);
        }

        let role = self.state.actor_role(actor)?;
        if role.can_write() {
            debug!(agent = %agent.name, actor, ?role, "actor authorized by role");
            return Ok(None);
        }
        if self.state.is_org_member(actor)? {
            return Ok(None);
        }
        for team in teams {
            if self
                .state
                .is_team_member(actor, team.trim_start_matches('@'))?
            {
                return Ok(None);
            }
        }

        Ok(Some(DispatchVerdict::skip(
            SkipReason::UnauthorizedActor,
            format!("'{}' has no write access and is not in the allow-list", actor),
        )))
    }

    fn check_labels(&self, agent: &AgentSpec, event: &InboundEvent) -> Result<Option<DispatchVerdict>> {
        let required = &agent.admission.required_labels;
        if required.is_empty() {
            return Ok(None);
        }

        let Some(item) = event.item else {
            return Ok(Some(DispatchVerdict::skip(
                SkipReason::LabelAbsent,
                "the event has no item to carry a label",
            )));
        };

        let current = self.state.current_labels(item)?;
        if current.iter().any(|l| required.contains(l)) {
            return Ok(None);
        }
        Ok(Some(DispatchVerdict::skip(
            SkipReason::LabelAbsent,
            format!("#{} carries none of: {}", item.number, required.join(", ")),
        )))
    }

    fn check_interval(&self, agent: &AgentSpec) -> Result<Option<DispatchVerdict>> {
        let Some(minutes) = agent.admission.min_interval_minutes else {
            return Ok(None);
        };

        let last_success = self
            .state
            .recent_runs()?
            .into_iter()
            .filter(|run| run.succeeded)
            .map(|run| run.completed_at)
            .max();
        let Some(last) = last_success else {
            return Ok(None);
        };

        let elapsed = self.now - last;
        if elapsed < Duration::minutes(i64::from(minutes)) {
            return Ok(Some(DispatchVerdict::skip(
                SkipReason::RateLimited,
                format!(
                    "last successful run {}m ago, minimum interval is {}m",
                    elapsed.num_minutes(),
                    minutes
                ),
            )));
        }
        Ok(None)
    }
}
