use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Top-level configuration for the ITSM console.
///
/// Loaded from `~/.itsm-console/config.toml` by default. Every section is
/// optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ConsoleConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ConsoleConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Connection settings for the remote chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Scheme, host and port of the assistant backend.
    pub base_url: String,
    /// Path of the chat endpoint, appended to `base_url`.
    pub chat_path: String,
    /// Client-side request timeout. `None` leaves timing out to the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5019".to_string(),
            chat_path: "/chat".to_string(),
            timeout_secs: None,
        }
    }
}

impl BackendConfig {
    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.chat_path.starts_with('/') {
            format!("{}{}", base, self.chat_path)
        } else {
            format!("{}/{}", base, self.chat_path)
        }
    }
}

/// Canned texts used by the chat controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Display name of the session that exists at startup.
    pub default_session_name: String,
    /// Prefix for sessions created later ("ITSM Chat 2", "ITSM Chat 3", ...).
    pub session_name_prefix: String,
    /// Welcome message of the startup session.
    pub initial_greeting: String,
    /// Welcome message of every session created afterwards.
    pub session_greeting: String,
    /// Phrase sent to the backend when the operator approves a proposal.
    pub approval_phrase: String,
    /// Draft seeded when the operator wants to modify a proposal.
    pub modify_prompt: String,
    /// Draft seeded by the "new incident" quick action.
    pub incident_prompt: String,
    /// Draft seeded by the "get resolution" quick action.
    pub resolution_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_session_name: "ITSM Assistant".to_string(),
            session_name_prefix: "ITSM Chat".to_string(),
            initial_greeting: "Hello! I'm your ServiceNow ITSM AI assistant. I can help you:\n\n\
                \u{2022} Create incidents with intelligent field inference\n\
                \u{2022} Find resolution steps for problems\n\
                \u{2022} Manage change requests\n\
                \u{2022} Analyze historical data\n\n\
                How can I assist you today?"
                .to_string(),
            session_greeting: "Hello! I'm your ITSM assistant. How can I help you today?"
                .to_string(),
            approval_phrase: "Yes, create the incident with these details".to_string(),
            modify_prompt: "Change priority to ".to_string(),
            incident_prompt: "Create an incident with description: ".to_string(),
            resolution_prompt: "Get resolution steps for ".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.backend.base_url, "http://localhost:5019");
        assert_eq!(config.backend.chat_path, "/chat");
        assert!(config.backend.timeout_secs.is_none());
        assert_eq!(config.chat.default_session_name, "ITSM Assistant");
        assert_eq!(config.chat.session_name_prefix, "ITSM Chat");
        assert!(config.chat.initial_greeting.starts_with("Hello!"));
        assert_eq!(
            config.chat.approval_phrase,
            "Yes, create the incident with these details"
        );
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[backend]
base_url = "http://itsm.internal:8080"
timeout_secs = 30

[chat]
default_session_name = "Service Desk"
approval_phrase = "Confirmed"
"#;
        let file = create_temp_config(content);
        let config = ConsoleConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.backend.base_url, "http://itsm.internal:8080");
        assert_eq!(config.backend.chat_path, "/chat");
        assert_eq!(config.backend.timeout_secs, Some(30));
        assert_eq!(config.chat.default_session_name, "Service Desk");
        assert_eq!(config.chat.approval_phrase, "Confirmed");
        // Untouched keys keep their defaults.
        assert_eq!(config.chat.modify_prompt, "Change priority to ");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let file = create_temp_config("");
        let config = ConsoleConfig::load(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:5019");
        assert_eq!(config.chat.session_name_prefix, "ITSM Chat");
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let file = create_temp_config("[backend\nbase_url = ");
        let err = ConsoleConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = ConsoleConfig::load(Path::new("/nonexistent/itsm/config.toml")).unwrap_err();
        assert!(matches!(err, ConsoleError::Io(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ConsoleConfig::default();
        config.backend.base_url = "http://127.0.0.1:9000".to_string();
        config.backend.timeout_secs = Some(5);
        config.chat.session_name_prefix = "Desk".to_string();
        config.save(&path).unwrap();

        let reloaded = ConsoleConfig::load(&path).unwrap();
        assert_eq!(reloaded.backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(reloaded.backend.timeout_secs, Some(5));
        assert_eq!(reloaded.chat.session_name_prefix, "Desk");
        assert_eq!(reloaded.chat.initial_greeting, config.chat.initial_greeting);
    }

    #[test]
    fn test_chat_url_joins_slashes() {
        let mut backend = BackendConfig::default();
        assert_eq!(backend.chat_url(), "http://localhost:5019/chat");

        backend.base_url = "http://localhost:5019/".to_string();
        assert_eq!(backend.chat_url(), "http://localhost:5019/chat");

        backend.chat_path = "api/chat".to_string();
        assert_eq!(backend.chat_url(), "http://localhost:5019/api/chat");
    }
}
