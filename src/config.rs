//! Runtime configuration, read from the environment once at startup.

use std::env;

/// Knobs that change pipeline behavior. Defaults match a single-meeting,
/// stage-at-a-time deployment with the extractive backend.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Run the full batch workflow graph instead of the stage machine.
    pub batch_workflow: bool,
    /// Allow `mode=structured` to reach the structured backend.
    pub structured_enabled: bool,
    /// Enable the query-to-field shortcut on fetch/summarize results.
    pub field_shortcut: bool,
    /// Shared secret for the HTTP surface. None disables the auth check.
    pub api_key: Option<String>,
    /// Preprocessing chunk window, in words.
    pub chunk_words: usize,
    /// Days without an update before an open issue counts as stale.
    pub stale_days: i64,
    /// Bind address for the HTTP server.
    pub listen_addr: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_workflow: false,
            structured_enabled: false,
            field_shortcut: true,
            api_key: None,
            chunk_words: 1500,
            stale_days: 7,
            listen_addr: "127.0.0.1:8085".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            batch_workflow: env_flag("MEETINGFLOW_BATCH_WORKFLOW", defaults.batch_workflow),
            structured_enabled: env_flag(
                "MEETINGFLOW_STRUCTURED_ENABLED",
                defaults.structured_enabled,
            ),
            field_shortcut: env_flag("MEETINGFLOW_FIELD_SHORTCUT", defaults.field_shortcut),
            api_key: env::var("MEETINGFLOW_API_KEY").ok().filter(|k| !k.is_empty()),
            chunk_words: env_usize("MEETINGFLOW_CHUNK_WORDS", defaults.chunk_words),
            stale_days: env_usize("MEETINGFLOW_STALE_DAYS", defaults.stale_days as usize) as i64,
            listen_addr: env::var("MEETINGFLOW_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
        };
        log::info!(
            "Config loaded: batch_workflow={}, structured_enabled={}, field_shortcut={}, auth={}",
            config.batch_workflow,
            config.structured_enabled,
            config.field_shortcut,
            if config.api_key.is_some() { "on" } else { "off" }
        );
        config
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}
