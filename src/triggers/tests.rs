//! Tests for trigger aggregation and matching.

use super::*;
use crate::test_support::{agent, issue_event, schedule_event};

fn with_issue_actions(name: &str, actions: &[&str]) -> AgentSpec {
    let mut a = agent(name);
    a.triggers.events.insert(
        EventType::Issues,
        actions.iter().map(|s| s.to_string()).collect(),
    );
    a
}

fn issue_actions(set: &TriggerSet) -> Vec<String> {
    set.actions(EventType::Issues)
        .map(|a| a.iter().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn empty_input_yields_only_manual_entry() {
    let set = aggregate(&[]);
    assert!(set.events.is_empty());
    assert!(set.schedules.is_empty());

    let yaml = serde_yaml::to_string(&set).unwrap();
    assert_eq!(
        yaml,
        "workflow_dispatch:\n  inputs:\n    agent:\n      description: Name of the agent to run\n      required: false\n      type: string\n"
    );
}

#[test]
fn issue_actions_are_unioned() {
    let agents = vec![
        with_issue_actions("a", &["opened"]),
        with_issue_actions("b", &["opened", "labeled"]),
        with_issue_actions("c", &["closed"]),
    ];
    let set = aggregate(&agents);
    assert_eq!(issue_actions(&set), vec!["closed", "labeled", "opened"]);
}

#[test]
fn aggregation_is_order_independent() {
    let mut scheduled = with_issue_actions("a", &["opened"]);
    scheduled.triggers.schedules = vec!["0 9 * * 1".into(), "*/30 * * * *".into()];
    let mut commenter = agent("b");
    commenter
        .triggers
        .events
        .insert(EventType::IssueComment, vec!["created".into()]);
    commenter.triggers.schedules = vec!["0 9 * * 1".into()];
    let labeler = with_issue_actions("c", &["labeled", "opened"]);

    let forward = aggregate(&[scheduled.clone(), commenter.clone(), labeler.clone()]);
    let backward = aggregate(&[labeler, commenter, scheduled]);

    assert_eq!(forward, backward);
    assert_eq!(
        serde_yaml::to_string(&forward).unwrap(),
        serde_yaml::to_string(&backward).unwrap()
    );
    assert_eq!(forward.schedules.len(), 2);
}

#[test]
fn empty_action_list_accepts_everything() {
    let agents = vec![
        with_issue_actions("a", &["opened"]),
        with_issue_actions("b", &[]),
    ];
    let set = aggregate(&agents);
    assert_eq!(set.events.get(&EventType::Issues), Some(&ActionFilter::Any));

    let yaml = serde_yaml::to_string(&set).unwrap();
    assert!(yaml.starts_with("issues: {}\n"));
}

#[test]
fn companion_retry_adds_closed_action() {
    let mut retrying = with_issue_actions("a", &["opened"]);
    retrying.admission.retry_on_companion_close = true;
    let set = aggregate(&[retrying]);
    assert_eq!(issue_actions(&set), vec!["closed", "opened"]);

    let mut scheduled_only = agent("nightly");
    scheduled_only.triggers.schedules = vec!["0 3 * * *".into()];
    scheduled_only.admission.retry_on_companion_close = true;
    let set = aggregate(&[scheduled_only]);
    assert_eq!(issue_actions(&set), vec!["closed"]);
}

#[test]
fn serializes_on_block_in_fixed_order() {
    let mut a = with_issue_actions("a", &["opened", "labeled"]);
    a.triggers.schedules = vec!["0 9 * * 1".into()];
    let yaml = serde_yaml::to_string(&aggregate(&[a])).unwrap();

    let issues = yaml.find("issues:").unwrap();
    let schedule = yaml.find("schedule:").unwrap();
    let manual = yaml.find("workflow_dispatch:").unwrap();
    assert!(issues < schedule && schedule < manual);
    assert!(yaml.contains("  types:\n  - labeled\n  - opened\n"));
    assert!(yaml.contains("schedule:\n- cron: "));
    assert!(yaml.contains("0 9 * * 1"));
}

#[test]
fn agent_matches_only_its_own_actions() {
    let a = with_issue_actions("a", &["opened"]);
    assert!(matches(&a, &issue_event("opened", 1, "octocat"), "followup:a"));
    assert!(!matches(&a, &issue_event("labeled", 1, "octocat"), "followup:a"));

    let any = with_issue_actions("any", &[]);
    assert!(matches(&any, &issue_event("labeled", 1, "octocat"), "followup:any"));
}

#[test]
fn schedule_matches_declared_cron_only() {
    let mut a = agent("nightly");
    a.triggers.schedules = vec!["0 3 * * *".into()];
    assert!(matches(&a, &schedule_event("0 3 * * *", "1"), "x"));
    assert!(!matches(&a, &schedule_event("0 4 * * *", "1"), "x"));
}

#[test]
fn manual_invocation_matches_named_agent_only() {
    let a = with_issue_actions("triage", &["opened"]);
    let mut event = schedule_event("", "1");
    event.event_type = EventType::WorkflowDispatch;
    event.schedule = None;

    assert!(!matches(&a, &event, "x"));
    event.requested_agent = Some("triage".into());
    assert!(matches(&a, &event, "x"));
    event.requested_agent = Some("other".into());
    assert!(!matches(&a, &event, "x"));
}

#[test]
fn companion_close_matches_opted_in_agent() {
    let mut a = with_issue_actions("triage", &["opened"]);
    let mut closed = issue_event("closed", 8, "octocat");
    closed.item_labels = vec!["agent-followup:triage".into()];

    assert!(!matches(&a, &closed, "agent-followup:triage"));
    a.admission.retry_on_companion_close = true;
    assert!(matches(&a, &closed, "agent-followup:triage"));

    closed.item_labels = vec!["agent-followup:other".into()];
    assert!(!matches(&a, &closed, "agent-followup:triage"));
}

#[test]
fn cron_syntax() {
    assert!(is_valid_cron("0 9 * * 1"));
    assert!(is_valid_cron("*/15 0-6 1,15 * MON-FRI"));
    assert!(!is_valid_cron("0 9 * *"));
    assert!(!is_valid_cron("0 9 * * 1 2024"));
    assert!(!is_valid_cron("0 9 * * ?!"));
}

#[test]
fn declaration_rejects_schedule_under_events() {
    let mut decl = TriggerDeclaration::default();
    decl.events.insert(EventType::Schedule, Vec::new());
    assert!(decl.validate("a").is_err());

    let decl = TriggerDeclaration {
        events: BTreeMap::new(),
        schedules: vec!["every day".into()],
    };
    let err = decl.validate("a").unwrap_err();
    assert!(err.to_string().contains("invalid cron expression 'every day'"));
}
