//! Human-readable rendering of a manifest.

use super::manifest::Manifest;
use super::record::AuditRecord;
use crate::outputs::{ExecutionOutcome, InstanceReport, KindReport, ValidationVerdict};
use std::fmt::Write;

impl Manifest {
    /// Markdown summary shown next to the run: one table row per agent, then
    /// details for every agent that proposed outputs.
    pub fn summary_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "## Agent fleet report\n");
        let _ = write!(out, "**Event:** {} · **Run:** {}", self.event, self.run_id);
        if let Some(key) = &self.debounce_key {
            let _ = write!(out, " · **Debounce key:** `{}`", key);
        }
        out.push_str("\n\n");

        if let Some(failure) = &self.platform_failure {
            let _ = writeln!(out, "> **Platform failure:** {}\n", failure);
        }

        if self.records.is_empty() {
            out.push_str("No agents are configured.\n");
            return out;
        }

        out.push_str("| Agent | Verdict | Execution | Outputs |\n");
        out.push_str("| --- | --- | --- | --- |\n");
        for record in &self.records {
            let verdict = record
                .verdict
                .as_ref()
                .map(|v| v.summary())
                .unwrap_or_else(|| "none".to_string());
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                cell(&record.agent),
                cell(&verdict),
                record.execution,
                cell(&outputs_cell(record))
            );
        }

        for record in &self.records {
            if record.outputs.is_empty() && record.rejected.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n### {}\n", record.agent);
            for report in &record.outputs {
                for instance in &report.instances {
                    let _ = writeln!(out, "- `{}` #{}: {}", report.kind, instance.ordinal, instance_line(instance));
                }
            }
            for line in &record.rejected {
                let _ = writeln!(out, "- rejected output line {}: {}", line.line, line.reason);
            }
        }

        let failed = self.failed_agents();
        if !failed.is_empty() {
            let _ = writeln!(out, "\n**Failed agents:** {}", failed.join(", "));
        }
        out
    }
}

fn outputs_cell(record: &AuditRecord) -> String {
    let mut parts: Vec<String> = record.outputs.iter().map(kind_summary).collect();
    if !record.rejected.is_empty() {
        parts.push(format!("{} rejected line(s)", record.rejected.len()));
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join("; ")
    }
}

fn kind_summary(report: &KindReport) -> String {
    let total = report.instances.len();
    if !report.applied {
        let failed = report.validation_failures().count();
        return format!(
            "{}: not applied ({} of {} failed validation)",
            report.kind, failed, total
        );
    }

    let mut counts = [("applied", 0), ("skipped", 0), ("failed", 0), ("not attempted", 0)];
    for instance in &report.instances {
        let slot = match instance.outcome {
            ExecutionOutcome::Applied { .. } => 0,
            ExecutionOutcome::Skipped { .. } => 1,
            ExecutionOutcome::Failed { .. } => 2,
            ExecutionOutcome::Discarded { .. } => 3,
        };
        counts[slot].1 += 1;
    }
    let parts: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{} {}", n, label))
        .collect();
    let partial = if report.is_partial() { " (partially applied)" } else { "" };
    format!("{}: {}{}", report.kind, parts.join(", "), partial)
}

fn instance_line(instance: &InstanceReport) -> String {
    if let ValidationVerdict::Fail { reasons } = &instance.verdict {
        return format!("failed validation: {}", reasons.join("; "));
    }
    match &instance.outcome {
        ExecutionOutcome::Applied { detail } => format!("applied ({})", detail),
        ExecutionOutcome::Skipped { reason } => format!("skipped ({})", reason),
        ExecutionOutcome::Failed { error } => format!("failed: {}", error),
        ExecutionOutcome::Discarded { reason } => format!("not applied ({})", reason),
    }
}

/// Escape a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
