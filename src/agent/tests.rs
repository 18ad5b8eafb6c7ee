//! Tests for agent loading and validation.

use super::*;
use crate::event::EventType;
use crate::permissions::PermissionLevel;
use crate::test_support::agent;
use tempfile::TempDir;

const TRIAGE: &str = r#"
name: triage
description: Labels new issues
triggers:
  events:
    issues: [opened, reopened]
permissions:
  issues: write
outputs:
  add_labels:
    allowed: [bug, question]
  add_comment: {}
admission:
  allowed_actors: [octocat, "@acme/maintainers"]
  required_labels: [needs-triage]
  min_interval_minutes: 10
timeout:
  action_minutes: 15
"#;

#[test]
fn parses_full_agent() {
    let agents = agents_from_yaml(TRIAGE).unwrap();
    assert_eq!(agents.len(), 1);
    let a = &agents[0];

    assert_eq!(a.name, "triage");
    assert_eq!(
        a.triggers.events.get(&EventType::Issues),
        Some(&vec!["opened".to_string(), "reopened".to_string()])
    );
    assert_eq!(a.permissions.get("issues"), Some(&PermissionLevel::Write));
    assert_eq!(a.outputs.add_labels.as_ref().unwrap().max, 3);
    assert_eq!(a.outputs.add_comment.as_ref().unwrap().max, 1);
    assert_eq!(a.admission.min_interval_minutes, Some(10));
    assert_eq!(a.timeout.context_minutes, 5);
    assert_eq!(a.timeout.action_minutes, 15);
    assert!(!a.disable_concurrency);
    assert!(validate_agents(&agents).is_ok());
}

#[test]
fn parses_list_of_agents() {
    let yaml = "- name: one\n- name: two\n";
    let agents = agents_from_yaml(yaml).unwrap();
    let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = agents_from_yaml("name: a\ntrigers: {}\n").unwrap_err();
    assert!(err.to_string().contains("unknown field `trigers`"));
}

#[test]
fn unknown_output_kind_is_rejected() {
    let err = agents_from_yaml("name: a\noutputs:\n  merge_pull_request: {}\n").unwrap_err();
    assert!(err.to_string().contains("merge_pull_request"));
}

#[test]
fn slug_and_derived_ids() {
    let a = agent("Issue Triage-Bot");
    assert_eq!(a.slug(), "issue_triage_bot");
    assert_eq!(a.job_id(), "agent_issue_triage_bot");
    assert_eq!(a.verdict_output(), "verdict_issue_triage_bot");
}

#[test]
fn duplicate_names_rejected() {
    let err = validate_agents(&[agent("a"), agent("a")]).unwrap_err();
    assert!(err.to_string().contains("duplicate agent name 'a'"));
}

#[test]
fn colliding_slugs_rejected() {
    let err = validate_agents(&[agent("docs-bot"), agent("docs bot")]).unwrap_err();
    assert!(err.to_string().contains("same identifier 'docs_bot'"));
}

#[test]
fn zero_timeout_rejected() {
    let mut a = agent("a");
    a.timeout.action_minutes = 0;
    assert!(validate_agents(&[a]).is_err());
}

#[test]
fn zero_interval_rejected() {
    let mut a = agent("a");
    a.admission.min_interval_minutes = Some(0);
    assert!(validate_agents(&[a]).is_err());
}

#[test]
fn oversized_timeout_rejected() {
    let mut a = agent("a");
    a.timeout.context_minutes = u32::MAX;
    a.timeout.action_minutes = u32::MAX;
    let err = validate_agents(&[a]).unwrap_err();
    assert!(err.to_string().contains("(max 360)"));
}

#[test]
fn total_budget_saturates() {
    let budget = TimeoutBudget {
        context_minutes: u32::MAX,
        action_minutes: 10,
    };
    assert_eq!(budget.total_minutes(5), u32::MAX);
}

#[test]
fn total_budget_includes_headroom() {
    let budget = TimeoutBudget {
        context_minutes: 5,
        action_minutes: 20,
    };
    assert_eq!(budget.total_minutes(5), 30);
}

#[test]
fn loads_directory_in_file_name_order() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("b.yaml"), "name: second\n").unwrap();
    std::fs::write(dir.path().join("a.yml"), "name: first\n").unwrap();
    std::fs::write(dir.path().join("README.md"), "not an agent").unwrap();

    let agents = load_agents(dir.path()).unwrap();
    let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn loads_single_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agents.yaml");
    std::fs::write(&path, TRIAGE).unwrap();
    assert_eq!(load_agents(&path).unwrap()[0].name, "triage");
}

#[test]
fn bad_file_error_names_the_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.yaml"), "name: [").unwrap();
    let err = load_agents(dir.path()).unwrap_err();
    assert!(err.to_string().contains("broken.yaml"));
}

#[test]
fn missing_path_is_user_error() {
    let dir = TempDir::new().unwrap();
    let err = load_agents(dir.path().join("nope")).unwrap_err();
    assert_eq!(err.exit_code(), crate::exit_codes::USER_ERROR);
}
