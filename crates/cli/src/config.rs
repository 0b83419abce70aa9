//! Configuration loading from tether.toml.

use runtime::FallbackTool;
use runtime::providers::{DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "tether.toml";
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub server: ServerSettings,
}

/// Model provider configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub model: String,
    pub max_tokens: u32,

    /// Anthropic API key. Falls back to `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,

    pub system: Option<String>,
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            api_key: None,
            system: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub fallback_tool: String,
    pub fallback_argument: String,
    /// Write the event log.
    pub record: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let fallback = FallbackTool::default();
        Self {
            fallback_tool: fallback.name,
            fallback_argument: fallback.argument,
            record: true,
        }
    }
}

impl SessionConfig {
    pub fn fallback(&self) -> FallbackTool {
        FallbackTool {
            name: self.fallback_tool.clone(),
            argument: self.fallback_argument.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            timeout_secs: mcp::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if given, else `tether.toml` if present, else defaults.
    ///
    /// An explicitly requested file must exist.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The API key from the config file, else from the environment.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.api_key_with(|var| std::env::var(var).ok())
    }

    fn api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        self.backend
            .api_key
            .clone()
            .or_else(|| env(API_KEY_VAR))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingAuth)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("authentication not configured: set backend.api_key or ANTHROPIC_API_KEY")]
    MissingAuth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.model, DEFAULT_MODEL);
        assert_eq!(config.backend.max_tokens, 1000);
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.session.fallback(), FallbackTool::default());
        assert!(config.session.record);
        assert_eq!(config.server.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::parse(
            r#"
            [backend]
            model = "claude-3-5-haiku-latest"
            max_tokens = 2048
            api_key = "sk-ant-test"
            system = "Be brief."

            [session]
            fallback_tool = "ask_claude"
            fallback_argument = "prompt"
            record = false

            [server]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.model, "claude-3-5-haiku-latest");
        assert_eq!(config.backend.max_tokens, 2048);
        assert_eq!(config.backend.system.as_deref(), Some("Be brief."));
        assert_eq!(config.session.fallback().name, "ask_claude");
        assert_eq!(config.session.fallback().argument, "prompt");
        assert!(!config.session.record);
        assert_eq!(config.server.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::parse("[backend]\noauth_token = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn api_key_prefers_config_over_env() {
        let config = Config::parse("[backend]\napi_key = \"from-file\"").unwrap();
        let key = config.api_key_with(|_| Some("from-env".into())).unwrap();
        assert_eq!(key, "from-file");
    }

    #[test]
    fn api_key_falls_back_to_env() {
        let config = Config::default();
        let key = config
            .api_key_with(|var| (var == API_KEY_VAR).then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let config = Config::default();
        assert!(matches!(
            config.api_key_with(|_| None),
            Err(ConfigError::MissingAuth)
        ));
        assert!(matches!(
            config.api_key_with(|_| Some("  ".into())),
            Err(ConfigError::MissingAuth)
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nfallback_tool = \"lookup\"").unwrap();

        let config = Config::discover(Some(file.path())).unwrap();
        assert_eq!(config.session.fallback_tool, "lookup");
        assert_eq!(config.session.fallback_argument, "question");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
