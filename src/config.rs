//! TOML configuration with environment overrides.
//!
//! ```toml
//! [confluence]
//! base_url = "https://acme.atlassian.net/wiki"
//! space_key = "ENG"
//! page_limit = 50
//!
//! [llm]
//! model = "mistralai/Mixtral-8x7B-Instruct-v0.1"
//! temperature = 0.3
//! max_tokens = 300
//!
//! [server]
//! bind = "127.0.0.1:8501"
//! ```
//!
//! `CONFLUENCE_BASE_URL` and `CONFLUENCE_SPACE_KEY` take precedence over the
//! file. Credentials are never read from the file; see
//! [`ConfluenceCredentials`](crate::confluence::ConfluenceCredentials) and
//! [`together_api_key`](crate::answer::together_api_key).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.together.xyz/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub confluence: ConfluenceConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfluenceConfig {
    /// Wiki root, e.g. `https://yourdomain.atlassian.net/wiki`.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub space_key: String,
    /// Records requested per listing call.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            space_key: String::new(),
            page_limit: default_page_limit(),
            timeout_secs: None,
        }
    }
}

fn default_page_limit() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: None,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_CHAT_ENDPOINT.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

impl Config {
    /// All defaults; used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            confluence: ConfluenceConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Apply `CONFLUENCE_BASE_URL` / `CONFLUENCE_SPACE_KEY` from `lookup`.
    ///
    /// Empty values are ignored so a blank line in `.env` does not wipe
    /// out the file setting.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CONFLUENCE_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.confluence.base_url = url;
        }
        if let Some(key) = lookup("CONFLUENCE_SPACE_KEY").filter(|v| !v.trim().is_empty()) {
            self.confluence.space_key = key;
        }
    }

    /// Listing endpoint root with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.confluence.base_url.trim_end_matches('/')
    }
}

/// Parse and validate configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file (or defaults when it does not exist), then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    config.apply_env(|key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.confluence.page_limit == 0 {
        anyhow::bail!("confluence.page_limit must be > 0");
    }

    if config.llm.max_tokens == 0 {
        anyhow::bail!("llm.max_tokens must be > 0");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    if config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must not be empty");
    }

    Ok(())
}

/// Check that the wiki location is known before any fetch is attempted.
pub fn require_space(config: &Config) -> Result<()> {
    if config.confluence.base_url.trim().is_empty() {
        anyhow::bail!("confluence.base_url is not set (config file or CONFLUENCE_BASE_URL)");
    }
    if config.confluence.space_key.trim().is_empty() {
        anyhow::bail!("confluence.space_key is not set (config file or CONFLUENCE_SPACE_KEY)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_uses_reference_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.confluence.page_limit, 50);
        assert_eq!(cfg.llm.endpoint, DEFAULT_CHAT_ENDPOINT);
        assert_eq!(cfg.llm.model, DEFAULT_MODEL);
        assert!((cfg.llm.temperature - 0.3).abs() < 1e-9);
        assert_eq!(cfg.llm.max_tokens, 300);
        assert!(cfg.llm.timeout_secs.is_none());
    }

    #[test]
    fn file_values_are_read() {
        let cfg = parse_config(
            r#"
[confluence]
base_url = "https://acme.atlassian.net/wiki/"
space_key = "ENG"
page_limit = 25

[llm]
model = "meta-llama/Llama-3-8b-chat-hf"
max_tokens = 512
"#,
        )
        .unwrap();
        assert_eq!(cfg.base_url(), "https://acme.atlassian.net/wiki");
        assert_eq!(cfg.confluence.space_key, "ENG");
        assert_eq!(cfg.confluence.page_limit, 25);
        assert_eq!(cfg.llm.model, "meta-llama/Llama-3-8b-chat-hf");
        assert_eq!(cfg.llm.max_tokens, 512);
    }

    #[test]
    fn zero_page_limit_rejected() {
        let err = parse_config("[confluence]\npage_limit = 0\n").unwrap_err();
        assert!(err.to_string().contains("page_limit"));
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let err = parse_config("[llm]\ntemperature = 3.5\n").unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn env_overrides_file() {
        let mut cfg =
            parse_config("[confluence]\nbase_url = \"https://old\"\nspace_key = \"OLD\"\n")
                .unwrap();
        let env: HashMap<&str, &str> = [
            ("CONFLUENCE_BASE_URL", "https://new/wiki"),
            ("CONFLUENCE_SPACE_KEY", ""),
        ]
        .into_iter()
        .collect();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.confluence.base_url, "https://new/wiki");
        assert_eq!(cfg.confluence.space_key, "OLD");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config(Path::new("/definitely/not/here/cqa.toml")).unwrap();
        assert_eq!(cfg.confluence.page_limit, 50);
    }

    #[test]
    fn require_space_needs_url_and_key() {
        let mut cfg = Config::minimal();
        assert!(require_space(&cfg).is_err());
        cfg.confluence.base_url = "https://x".into();
        assert!(require_space(&cfg).is_err());
        cfg.confluence.space_key = "DOC".into();
        assert!(require_space(&cfg).is_ok());
    }
}
