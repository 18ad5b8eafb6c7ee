//! Tests for audit records, manifest assembly and the summary.

use super::*;
use crate::dispatch::{DispatchVerdict, SkipReason, VerdictMap};
use crate::outputs::{
    CommentConfig, ExecutionOutcome, InstanceReport, KindReport, OutputDeclaration, OutputKind,
    Registry, RejectedLine, ValidationVerdict, parse_output_lines,
};
use crate::test_support::{FakeTracker, agent, run_context};
use serde_json::json;
use tempfile::TempDir;

fn verdicts() -> VerdictMap {
    VerdictMap::from([
        ("idle".to_string(), DispatchVerdict::skip(SkipReason::NoTriggerMatch, "")),
        ("triage".to_string(), DispatchVerdict::Admit),
    ])
}

fn needs(triage: &str) -> serde_json::Value {
    json!({
        "dispatch": {"result": "success", "outputs": {}},
        "agent_triage": {"result": triage, "outputs": {}},
        "agent_idle": {"result": "skipped", "outputs": {}},
    })
}

fn applied_comment() -> KindReport {
    KindReport {
        kind: OutputKind::AddComment,
        applied: true,
        instances: vec![InstanceReport {
            ordinal: 1,
            verdict: ValidationVerdict::Pass,
            outcome: ExecutionOutcome::Applied {
                detail: "commented on #12".to_string(),
            },
        }],
    }
}

fn manifest(triage_result: &str, uploaded: Vec<AuditRecord>) -> Manifest {
    Manifest::new("issues.opened #12", "900")
        .with_debounce_key(Some("Agent Fleet-issues-12".to_string()))
        .assemble(
            &[agent("triage"), agent("idle")],
            &verdicts(),
            &needs(triage_result),
            uploaded,
        )
}

#[test]
fn every_agent_gets_a_record_in_name_order() {
    let m = manifest("success", Vec::new());
    let names: Vec<&str> = m.records.iter().map(|r| r.agent.as_str()).collect();
    assert_eq!(names, vec!["idle", "triage"]);

    let idle = m.record("idle").unwrap();
    assert_eq!(idle.execution, ExecutionResult::Skipped);
    assert_eq!(
        idle.verdict.as_ref().and_then(|v| v.reason()),
        Some(SkipReason::NoTriggerMatch)
    );
    assert!(m.platform_failure.is_none());
}

#[test]
fn uploaded_record_keeps_outputs_and_gains_verdict() {
    let mut uploaded = AuditRecord::new("triage");
    uploaded.outputs.push(applied_comment());

    let m = manifest("success", vec![uploaded]);
    let triage = m.record("triage").unwrap();
    assert_eq!(triage.verdict, Some(DispatchVerdict::Admit));
    assert_eq!(triage.execution, ExecutionResult::Success);
    assert_eq!(triage.outputs.len(), 1);
}

#[test]
fn records_for_unknown_agents_are_dropped() {
    let m = manifest("success", vec![AuditRecord::new("retired")]);
    assert!(m.record("retired").is_none());
    assert_eq!(m.records.len(), 2);
}

#[test]
fn node_failure_marks_agent_failed() {
    let m = manifest("failure", Vec::new());
    assert_eq!(m.failed_agents(), vec!["triage"]);
}

#[test]
fn tracker_failure_marks_agent_failed() {
    let mut uploaded = AuditRecord::new("triage");
    uploaded.outputs.push(KindReport {
        kind: OutputKind::AddLabels,
        applied: true,
        instances: vec![InstanceReport {
            ordinal: 1,
            verdict: ValidationVerdict::Pass,
            outcome: ExecutionOutcome::Failed {
                error: "Tracker operation failed: 502".to_string(),
            },
        }],
    });
    let m = manifest("success", vec![uploaded]);
    assert_eq!(m.failed_agents(), vec!["triage"]);
}

#[test]
fn partially_applied_kind_is_flagged() {
    let applied = |ordinal| InstanceReport {
        ordinal,
        verdict: ValidationVerdict::Pass,
        outcome: ExecutionOutcome::Applied {
            detail: "comment posted".to_string(),
        },
    };
    let mut uploaded = AuditRecord::new("triage");
    uploaded.outputs.push(KindReport {
        kind: OutputKind::AddComment,
        applied: true,
        instances: vec![
            applied(1),
            InstanceReport {
                ordinal: 2,
                verdict: ValidationVerdict::Pass,
                outcome: ExecutionOutcome::Failed {
                    error: "Tracker operation failed: 502".to_string(),
                },
            },
            InstanceReport {
                ordinal: 3,
                verdict: ValidationVerdict::Pass,
                outcome: ExecutionOutcome::Discarded {
                    reason: "not attempted".to_string(),
                },
            },
        ],
    });
    let m = manifest("success", vec![uploaded]);

    assert_eq!(m.failed_agents(), vec!["triage"]);
    assert!(m.summary_markdown().contains(
        "add_comment: 1 applied, 1 failed, 1 not attempted (partially applied)"
    ));
}

#[test]
fn validation_failures_are_reported_but_not_failures() {
    let mut uploaded = AuditRecord::new("triage");
    uploaded.rejected.push(RejectedLine {
        line: 3,
        reason: "invalid JSON: EOF".to_string(),
    });
    let m = manifest("success", vec![uploaded]);
    let triage = m.record("triage").unwrap();
    assert!(triage.has_validation_failures());
    assert!(!triage.failed());
    assert!(m.failed_agents().is_empty());
    assert!(m.summary_markdown().contains("- rejected output line 3: invalid JSON: EOF"));
}

#[test]
fn dispatch_failure_is_a_platform_failure() {
    let needs = json!({"dispatch": {"result": "failure", "outputs": {}}});
    let m = Manifest::new("issues.opened #12", "900").assemble(
        &[agent("triage")],
        &VerdictMap::new(),
        &needs,
        Vec::new(),
    );
    assert!(m.platform_failure.as_deref().unwrap().contains("result 'failure'"));
    let triage = m.record("triage").unwrap();
    assert_eq!(triage.verdict, None);
    assert_eq!(triage.execution, ExecutionResult::Unknown);

    let summary = m.summary_markdown();
    assert!(summary.contains("> **Platform failure:** dispatch finished with result 'failure'"));
    assert!(summary.contains("| triage | none | unknown | none |"));
}

#[test]
fn summary_table_shows_every_skip_reason() {
    let mut uploaded = AuditRecord::new("triage");
    uploaded.outputs.push(applied_comment());
    let summary = manifest("success", vec![uploaded]).summary_markdown();

    assert!(summary.starts_with("## Agent fleet report\n"));
    assert!(summary.contains("**Event:** issues.opened #12 · **Run:** 900"));
    assert!(summary.contains("`Agent Fleet-issues-12`"));
    assert!(summary.contains("| idle | skip (no trigger match) | skipped | none |"));
    assert!(summary.contains("| triage | admit | success | add_comment: 1 applied |"));
    assert!(summary.contains("### triage\n\n- `add_comment` #1: applied (commented on #12)"));
    assert!(!summary.contains("Failed agents"));
}

#[test]
fn scenario_two_comments_one_invalid() {
    let decl = OutputDeclaration {
        add_comment: Some(CommentConfig { max: 3 }),
        ..OutputDeclaration::default()
    };
    let tracker = FakeTracker::new();
    let parsed = parse_output_lines(
        "{\"type\": \"add_comment\", \"body\": \"Looks like a duplicate of #3.\"}\n\
         {\"type\": \"add_comment\"}\n",
    );
    let mut record = AuditRecord::new("triage");
    record.outputs =
        Registry::standard().process(&decl, &run_context("triage"), &tracker, &parsed.instances);

    let comments = &record.outputs[0];
    assert_eq!(comments.instances.len(), 2);
    assert!(comments.instances[0].verdict.is_pass());
    assert_eq!(comments.validation_failures().count(), 1);
    assert!(tracker.calls().is_empty());

    let summary = manifest("success", vec![record]).summary_markdown();
    assert!(summary.contains("add_comment: not applied (1 of 2 failed validation)"));
    assert!(summary.contains("- `add_comment` #2: failed validation: malformed payload"));
    assert!(summary.contains(
        "- `add_comment` #1: not applied (another instance of this kind failed validation)"
    ));
}

#[test]
fn table_cells_are_escaped() {
    let mut m = Manifest::new("schedule", "1");
    let mut record = AuditRecord::new("a|b");
    record.verdict = Some(DispatchVerdict::skip(SkipReason::RateLimited, "x\ny"));
    m.records.push(record);
    assert!(m.summary_markdown().contains("| a\\|b | skip (rate limited: x y) |"));
}

#[test]
fn record_and_manifest_persist_as_json() {
    let dir = TempDir::new().unwrap();
    let mut record = AuditRecord::new("triage");
    record.verdict = Some(DispatchVerdict::Admit);
    record.outputs.push(applied_comment());
    record.save(dir.path().join("records").join("triage.json")).unwrap();
    std::fs::write(dir.path().join("records").join("notes.txt"), "ignored").unwrap();

    let loaded = load_records(dir.path().join("records")).unwrap();
    assert_eq!(loaded, vec![record]);

    let m = manifest("success", loaded);
    m.save(dir.path().join("manifest.json")).unwrap();
    let saved = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
    assert_eq!(serde_json::from_str::<Manifest>(&saved).unwrap(), m);
}

#[test]
fn missing_records_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    assert!(load_records(dir.path().join("none")).unwrap().is_empty());
}

#[test]
fn corrupt_record_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.json"), "{").unwrap();
    let err = load_records(dir.path()).unwrap_err();
    assert!(err.to_string().contains("bad.json"));
}

#[test]
fn execution_result_parsing() {
    assert_eq!(ExecutionResult::from_str("failure"), ExecutionResult::Failure);
    assert_eq!(ExecutionResult::from_str("cancelled"), ExecutionResult::Cancelled);
    assert_eq!(ExecutionResult::from_str(""), ExecutionResult::Unknown);
}
