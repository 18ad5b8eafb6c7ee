//! Default value functions for the Config struct.

// Default value functions for serde
pub(crate) fn default_workflow_name() -> String {
    "Agent Fleet".to_string()
}
pub(crate) fn default_agents_dir() -> String {
    ".github/agents".to_string()
}
pub(crate) fn default_workflow_file() -> String {
    ".github/workflows/fleet.lock.yml".to_string()
}
pub(crate) fn default_runs_on() -> String {
    "ubuntu-latest".to_string()
}
pub(crate) fn default_engine_command() -> String {
    "claude --print".to_string()
}
pub(crate) fn default_engine_secret() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
pub(crate) fn default_install_command() -> String {
    "cargo install fleet --locked".to_string()
}
pub(crate) fn default_checkout_action() -> String {
    "actions/checkout@v4".to_string()
}
pub(crate) fn default_upload_artifact_action() -> String {
    "actions/upload-artifact@v4".to_string()
}
pub(crate) fn default_download_artifact_action() -> String {
    "actions/download-artifact@v4".to_string()
}
pub(crate) fn default_setup_headroom_minutes() -> u32 {
    5
}
pub(crate) fn default_failure_label() -> String {
    "agent-failure".to_string()
}
pub(crate) fn default_companion_label_prefix() -> String {
    "agent-followup".to_string()
}

/// Automated identities that are always treated as bots, in addition to
/// any login ending in `[bot]`.
pub fn default_bot_actors() -> Vec<String> {
    vec!["github-actions[bot]".to_string()]
}
