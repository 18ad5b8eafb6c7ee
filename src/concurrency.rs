//! Debounce and cancellation policy.
//!
//! Runs about the same item share a debounce key, and a newer run cancels
//! an older in-flight one. The exception is a run started by an automated
//! actor editing or relabeling the item: that is usually the older run's own
//! side effect, and cancelling the older run would cut its output short.
//!
//! The policy exists twice with the same semantics: as plain functions over
//! an [`InboundEvent`], and as the expressions emitted into the compiled
//! document's `concurrency:` block.

use crate::agent::AgentSpec;
use crate::config::Config;
use crate::event::InboundEvent;
use crate::graph::Expr;
use serde::Serialize;

/// Sub-actions an agent's own side effects produce on an item.
pub const SELF_TRIGGER_ACTIONS: &[&str] = &["edited", "labeled", "unlabeled"];

/// Debounce key for `event`.
///
/// Event type plus item number; a run-unique key when there is no item.
pub fn debounce_key(workflow: &str, event: &InboundEvent) -> String {
    match event.item {
        Some(item) => format!("{}-{}-{}", workflow, event.event_type, item.number),
        None => format!("{}-{}-run-{}", workflow, event.event_type, event.run_id),
    }
}

/// Whether `event`'s run cancels an older in-flight run on the same key.
pub fn cancels_older_run(event: &InboundEvent, config: &Config) -> bool {
    let self_triggered = config.is_bot(&event.actor)
        && event
            .action
            .as_deref()
            .is_some_and(|a| SELF_TRIGGER_ACTIONS.contains(&a));
    !self_triggered
}

/// Whether any agent exempts the fleet from debouncing.
pub fn is_exempt(agents: &[AgentSpec]) -> bool {
    agents.iter().any(|a| a.disable_concurrency)
}

/// The document's `concurrency:` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcurrencyPlan {
    pub group: Expr,
    #[serde(rename = "cancel-in-progress")]
    pub cancel_in_progress: Expr,
}

/// Compile the policy, or `None` when an agent opted out.
pub fn plan(agents: &[AgentSpec], config: &Config) -> Option<ConcurrencyPlan> {
    if is_exempt(agents) {
        return None;
    }
    Some(ConcurrencyPlan {
        group: group_expression(),
        cancel_in_progress: cancel_expression(config),
    })
}

/// `<workflow>-<event>-<item number>`, or `<workflow>-<event>-run-<run id>`.
fn group_expression() -> Expr {
    Expr::call(
        "format",
        vec![
            Expr::str("{0}-{1}-{2}"),
            Expr::ctx("github.workflow"),
            Expr::ctx("github.event_name"),
            Expr::or(vec![
                Expr::ctx("github.event.issue.number"),
                Expr::ctx("github.event.pull_request.number"),
                Expr::ctx("github.event.discussion.number"),
                Expr::call(
                    "format",
                    vec![Expr::str("run-{0}"), Expr::ctx("github.run_id")],
                ),
            ]),
        ],
    )
}

fn cancel_expression(config: &Config) -> Expr {
    let mut bot_checks = vec![Expr::call(
        "endsWith",
        vec![Expr::ctx("github.actor"), Expr::str("[bot]")],
    )];
    for actor in &config.bot_actors {
        if !actor.ends_with("[bot]") {
            bot_checks.push(Expr::ctx("github.actor").eq(Expr::str(actor.clone())));
        }
    }
    let actions = serde_json::to_string(SELF_TRIGGER_ACTIONS).unwrap_or_default();
    let self_action = Expr::call(
        "contains",
        vec![
            Expr::call("fromJSON", vec![Expr::str(actions)]),
            Expr::ctx("github.event.action"),
        ],
    );
    Expr::not(Expr::and(vec![Expr::or(bot_checks), self_action]))
}
