//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed with `__` in env vars (`APP_RETRIEVAL__DEFAULT_K=5`).
//! Provides a helper to expand `~` and `${VAR}` in user-supplied paths.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from an explicit figment, skipping file discovery.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts the typed settings tree; absent sections fall back to defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if settings.retrieval.default_k == 0 {
            anyhow::bail!("retrieval.default_k must be at least 1");
        }
        if settings.generator.timeout_secs == 0 {
            anyhow::bail!("generator.timeout_secs must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub chunking: ChunkingSettings,
    pub agent: AgentSettings,
    pub generator: GeneratorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_k: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Paragraphs and pages must be strictly longer than this (in chars) to be indexed.
    pub min_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { min_chars: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub hil_enabled: bool,
    /// Maximum number of prior turns forwarded to the generator; `None` keeps all.
    pub history_limit: Option<usize>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { hil_enabled: true, history_limit: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    #[default]
    Offline,
    OpenAi,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub backend: GeneratorBackend,
    /// Model name; each backend has its own default when unset.
    pub model: Option<String>,
    /// Name of the env var holding the API key; each backend has its own default.
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Offline,
            model: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: 60,
            max_tokens: 2048,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
