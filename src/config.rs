use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CartConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub synthesis: SynthesisConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Hugging Face feature-extraction model (primary provider).
    pub model: String,
    /// Base URL of the HF inference API.
    pub hf_endpoint: String,
    /// Google embedding model (secondary provider).
    pub google_model: String,
    /// Base URL of the Google generative-language API.
    pub google_endpoint: String,
    /// Per-request timeout in seconds; a timeout counts as a provider failure.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    /// Name of the index on the control plane.
    pub index_name: String,
    /// Control-plane URL used to resolve the data-plane host on first use.
    pub controller_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Generative model used for explanations, summaries, and comparisons.
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    /// Hits below this similarity score are dropped from search responses.
    pub default_min_score: f32,
    pub recommend_limit: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            synthesis: SynthesisConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            log_level: "info".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".into(),
            hf_endpoint: "https://api-inference.huggingface.co".into(),
            google_model: "text-embedding-004".into(),
            google_endpoint: "https://generativelanguage.googleapis.com".into(),
            timeout_secs: 15,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_name: "products".into(),
            controller_url: "https://api.pinecone.io".into(),
            timeout_secs: 15,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            default_min_score: 0.45,
            recommend_limit: 5,
        }
    }
}

/// Returns `~/.vectorcart/`
pub fn default_cart_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".vectorcart")
}

/// Returns the default config file path: `~/.vectorcart/config.toml`
pub fn default_config_path() -> PathBuf {
    default_cart_dir().join("config.toml")
}

impl CartConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CartConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (VECTORCART_PORT, VECTORCART_INDEX,
    /// VECTORCART_LOG_LEVEL). Provider API keys are read separately at
    /// construction time and never live in the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("VECTORCART_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("VECTORCART_INDEX") {
            self.index.index_name = val;
        }
        if let Ok(val) = std::env::var("VECTORCART_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }
}

/// Provider secrets, read from the environment at startup.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub huggingface_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            huggingface_token: std::env::var("HUGGINGFACE_API_TOKEN").ok(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            pinecone_api_key: std::env::var("PINECONE_API_KEY").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CartConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.search.default_limit, 10);
        assert!((config.search.default_min_score - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.embedding.model, "sentence-transformers/all-MiniLM-L6-v2");
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
port = 8080
log_level = "debug"

[index]
index_name = "staging-products"

[search]
default_limit = 20
"#;
        let config: CartConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.index.index_name, "staging-products");
        assert_eq!(config.search.default_limit, 20);
        // defaults still apply for unset fields
        assert_eq!(config.search.recommend_limit, 5);
        assert_eq!(config.synthesis.model, "gemini-2.5-flash");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = CartConfig::default();
        std::env::set_var("VECTORCART_PORT", "9999");
        std::env::set_var("VECTORCART_INDEX", "env-index");
        std::env::set_var("VECTORCART_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.index.index_name, "env-index");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("VECTORCART_PORT");
        std::env::remove_var("VECTORCART_INDEX");
        std::env::remove_var("VECTORCART_LOG_LEVEL");
    }
}
