//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`,
//! the `NVIDIA_*` credentials and `APP_*` env vars (`__` separates nesting,
//! e.g. `APP_RETRIEVAL__TOP_K=5`). A `.env` file is read into the process
//! environment first. Provides helpers to expand `~` and `${VAR}` and to
//! resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is the common case.
        let _ = dotenvy::dotenv();
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::raw().only(&["NVIDIA_API_KEY", "NVIDIA_API_URL", "NVIDIA_MODEL"]).map(|key| {
                let key = key.as_str();
                if key.eq_ignore_ascii_case("NVIDIA_API_KEY") {
                    "llm.api_key".into()
                } else if key.eq_ignore_ascii_case("NVIDIA_API_URL") {
                    "llm.api_url".into()
                } else {
                    "llm.model".into()
                }
            }))
            .merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub data: DataSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Model identifier; also the directory name under `models/` when no
    /// explicit `model_dir` is configured.
    pub model: String,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub batch_size: usize,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model: "all-MiniLM-L6-v2".to_string(), model_dir: None, max_len: 256, batch_size: 32, use_fake: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    #[default]
    Tokens,
    Sentences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub strategy: ChunkStrategy,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50, strategy: ChunkStrategy::Tokens }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub show_sources: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3, show_sources: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: "openai/gpt-oss-20b".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub raw_dir: String,
    pub index_stem: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { raw_dir: "data/raw".to_string(), index_stem: "indices/chatbot_index".to_string() }
    }
}

impl DataSettings {
    pub fn raw_dir(&self) -> PathBuf { expand_path(&self.raw_dir) }
    pub fn index_stem(&self) -> PathBuf { expand_path(&self.index_stem) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Debug-level log file; `None` disables file logging.
    pub file: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), file: Some("logs/chatbot.log".to_string()) }
    }
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be greater than zero".into()));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::InvalidConfig("llm.timeout_secs must be at least 1".into()));
        }
        if self.embedding.batch_size == 0 || self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size and embedding.max_len must be positive".into()));
        }
        Ok(())
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

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.chunking.chunk_size, 500);
        assert_eq!(s.chunking.chunk_overlap, 50);
        assert_eq!(s.retrieval.top_k, 3);
        assert!(s.retrieval.show_sources);
        assert_eq!(s.llm.model, "openai/gpt-oss-20b");
        assert_eq!(s.llm.timeout_secs, 30);
        assert_eq!(s.data.index_stem, "indices/chatbot_index");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let mut s = Settings::default();
        s.chunking.chunk_overlap = 500;
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
        s.chunking.chunk_size = 0;
        s.chunking.chunk_overlap = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_completion_timeout_is_rejected() {
        let mut s = Settings::default();
        s.llm.timeout_secs = 0;
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(msg)) if msg.contains("timeout_secs")));
        s.llm.timeout_secs = 1;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/docchat");
        assert_eq!(resolve_with_base(base, "/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(resolve_with_base(base, "indices/a"), PathBuf::from("/srv/docchat/indices/a"));
    }
}
