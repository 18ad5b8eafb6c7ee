//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for the fleet compiler and its runtime entrypoints.
///
/// This struct represents the contents of `fleet.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Document settings
    // =========================================================================
    /// `name:` of the generated workflow document.
    #[serde(default = "default_workflow_name")]
    pub workflow_name: String,

    /// Directory (or single file) holding agent definitions.
    #[serde(default = "default_agents_dir")]
    pub agents_dir: String,

    /// Repository-relative path the document is written to.
    ///
    /// Its file name is also how run history is looked up for rate limiting.
    #[serde(default = "default_workflow_file")]
    pub workflow_file: String,

    /// Runner label used by every node.
    #[serde(default = "default_runs_on")]
    pub runs_on: String,

    // =========================================================================
    // Agent engine
    // =========================================================================
    /// Command line that runs the agent (shell-words parsed, no shell).
    #[serde(default = "default_engine_command")]
    pub engine_command: String,

    /// Name of the secret holding the engine credential.
    #[serde(default = "default_engine_secret")]
    pub engine_secret: String,

    /// Command that installs the fleet binary inside a node.
    #[serde(default = "default_install_command")]
    pub install_command: String,

    // =========================================================================
    // Action references
    // =========================================================================
    #[serde(default = "default_checkout_action")]
    pub checkout_action: String,

    #[serde(default = "default_upload_artifact_action")]
    pub upload_artifact_action: String,

    #[serde(default = "default_download_artifact_action")]
    pub download_artifact_action: String,

    // =========================================================================
    // Timeouts
    // =========================================================================
    /// Minutes added to every agent's budget for setup and teardown.
    #[serde(default = "default_setup_headroom_minutes")]
    pub setup_headroom_minutes: u32,

    // =========================================================================
    // Tracker conventions
    // =========================================================================
    /// Label carried by failure tracking items.
    #[serde(default = "default_failure_label")]
    pub failure_label: String,

    /// Prefix of the per-agent label marking companion items.
    #[serde(default = "default_companion_label_prefix")]
    pub companion_label_prefix: String,

    /// Logins treated as automated actors (besides `*[bot]`).
    #[serde(default = "default_bot_actors")]
    pub bot_actors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflow_name: default_workflow_name(),
            agents_dir: default_agents_dir(),
            workflow_file: default_workflow_file(),
            runs_on: default_runs_on(),
            engine_command: default_engine_command(),
            engine_secret: default_engine_secret(),
            install_command: default_install_command(),
            checkout_action: default_checkout_action(),
            upload_artifact_action: default_upload_artifact_action(),
            download_artifact_action: default_download_artifact_action(),
            setup_headroom_minutes: default_setup_headroom_minutes(),
            failure_label: default_failure_label(),
            companion_label_prefix: default_companion_label_prefix(),
            bot_actors: default_bot_actors(),
        }
    }
}
