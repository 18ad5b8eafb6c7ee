//! Provenance footers for text written back to the tracker.

use super::protocol::RunContext;

/// Marker line that starts every footer.
const FOOTER_RULE: &str = "\n\n---\n";

/// Footer identifying the run that produced a body.
pub fn provenance_footer(run: &RunContext) -> String {
    format!(
        "{}<sub>Generated by agent `{}` in run [{}]({})</sub>",
        FOOTER_RULE, run.agent, run.run_id, run.run_url
    )
}

/// Append the provenance footer to `body`.
///
/// Trailing whitespace is trimmed first so the same body always yields the
/// same output.
pub fn with_footer(body: &str, run: &RunContext) -> String {
    let mut out = body.trim_end().to_string();
    out.push_str(&provenance_footer(run));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::run_context;

    #[test]
    fn footer_names_agent_and_run() {
        let run = run_context("triage");
        let footer = provenance_footer(&run);
        assert!(footer.contains("agent `triage`"));
        assert!(footer.contains(&format!("[{}]({})", run.run_id, run.run_url)));
    }

    #[test]
    fn footer_is_deterministic() {
        let run = run_context("triage");
        assert_eq!(with_footer("Hello\n\n", &run), with_footer("Hello", &run));
        assert!(with_footer("Hello", &run).starts_with("Hello\n\n---\n"));
    }
}
