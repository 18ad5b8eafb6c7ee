//! `key=value` step outputs.

use crate::error::Result;
use crate::fs::append_text;
use std::path::Path;

const DELIMITER: &str = "FLEET_EOF";

/// Outputs collected by a command, written once at the end.
#[derive(Debug, Default)]
pub(crate) struct StepOutputs {
    entries: Vec<(String, String)>,
}

impl StepOutputs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Rendered in the substrate's output-file syntax.
    ///
    /// Multi-line values use the heredoc form.
    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            if value.contains('\n') {
                out.push_str(&format!("{}<<{}\n{}\n{}\n", key, DELIMITER, value, DELIMITER));
            } else {
                out.push_str(&format!("{}={}\n", key, value));
            }
        }
        out
    }

    /// Append to `path`, or print to stdout without one.
    pub(crate) fn write(&self, path: Option<&Path>) -> Result<()> {
        let rendered = self.render();
        match path {
            Some(path) => append_text(path, &rendered),
            None => {
                print!("{}", rendered);
                Ok(())
            }
        }
    }
}
