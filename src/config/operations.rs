//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{FleetError, Result};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            FleetError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if it exists, otherwise use defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml maps an empty document to unit, not to an empty mapping.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| FleetError::UserError(format!("failed to parse config YAML: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FleetError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - names, labels and action references must be non-empty
    /// - `setup_headroom_minutes` must be positive
    /// - `engine_command` must parse into at least one word
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("workflow_name", &self.workflow_name),
            ("agents_dir", &self.agents_dir),
            ("workflow_file", &self.workflow_file),
            ("runs_on", &self.runs_on),
            ("engine_secret", &self.engine_secret),
            ("install_command", &self.install_command),
            ("checkout_action", &self.checkout_action),
            ("upload_artifact_action", &self.upload_artifact_action),
            ("download_artifact_action", &self.download_artifact_action),
            ("failure_label", &self.failure_label),
            ("companion_label_prefix", &self.companion_label_prefix),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(FleetError::UserError(format!(
                    "config validation failed: {} must not be empty",
                    field
                )));
            }
        }

        if self.setup_headroom_minutes == 0 {
            return Err(FleetError::UserError(
                "config validation failed: setup_headroom_minutes must be greater than 0"
                    .to_string(),
            ));
        }

        if self.engine_args()?.is_empty() {
            return Err(FleetError::UserError(
                "config validation failed: engine_command must not be empty".to_string(),
            ));
        }

        if self.bot_actors.iter().any(|a| a.trim().is_empty()) {
            return Err(FleetError::UserError(
                "config validation failed: bot_actors entries must be non-empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Split `engine_command` into argv words.
    pub fn engine_args(&self) -> Result<Vec<String>> {
        shell_words::split(&self.engine_command).map_err(|e| {
            FleetError::UserError(format!(
                "config validation failed: cannot parse engine_command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.engine_command, e
            ))
        })
    }

    /// File name of the compiled document (e.g. `fleet.lock.yml`).
    pub fn workflow_file_name(&self) -> &str {
        self.workflow_file
            .rsplit('/')
            .next()
            .unwrap_or(&self.workflow_file)
    }

    /// Label that marks items opened by `agent` as its companion items.
    pub fn companion_label(&self, agent: &str) -> String {
        format!("{}:{}", self.companion_label_prefix, agent)
    }

    /// Whether `actor` is an automated identity.
    pub fn is_bot(&self, actor: &str) -> bool {
        actor.ends_with("[bot]") || self.bot_actors.iter().any(|b| b == actor)
    }
}
