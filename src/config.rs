use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ResearchError;
use crate::llm::{anthropic, gemini};
use crate::retrieval::DEFAULT_EMBEDDING_MODEL;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RESEARCHER_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub search: SearchConfig,
    pub index: IndexConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    #[default]
    Gemini,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => anthropic::DEFAULT_MODEL,
            LlmProvider::Gemini => gemini::DEFAULT_MODEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Falls back to the provider's default model
    pub model: Option<String>,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            max_tokens: 4096,
            timeout_ms: 300000,
            temperature: 0.0,
        }
    }
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(self.provider.default_model())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Supervisor calls allowed per session; `null` removes the cap
    pub max_turns: Option<u32>,
    /// Documents advertised to the model as searchable
    pub available_documents: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: Some(25),
            available_documents: vec!["Google.pdf".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub web_results: usize,
    pub academic_results: usize,
    pub academic_max_chars: usize,
    pub document_results: usize,
    pub snippet_chars: usize,
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            web_results: 3,
            academic_results: 3,
            academic_max_chars: 2000,
            document_results: 4,
            snippet_chars: 300,
            timeout_ms: 30000,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub name: String,
    pub embedding_model: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: "research-agent-index".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Conversation key; sessions are only persisted when set
    pub thread_id: Option<String>,
    pub store_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            thread_id: None,
            store_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("researcher")
                .join("sessions"),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).wrap_err(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Reject values that would make every session fail
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: &str| -> crate::error::Result<()> { Err(ResearchError::Setup(msg.to_string())) };

        if self.agent.max_turns == Some(0) {
            return invalid("agent.max_turns must be at least 1 (use null for no limit)");
        }
        if self.llm.max_tokens == 0 {
            return invalid("llm.max_tokens must be at least 1");
        }
        if self.search.web_results == 0 || self.search.academic_results == 0 || self.search.document_results == 0 {
            return invalid("search result counts must be at least 1");
        }
        if self.index.name.trim().is_empty() {
            return invalid("index.name must not be empty");
        }
        if self.session.thread_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return invalid("session.thread_id must not be blank");
        }
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).wrap_err("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).wrap_err("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// API keys read from the environment at startup
#[derive(Clone)]
pub struct Credentials {
    /// Key for the configured chat model provider
    pub llm_api_key: String,
    /// Used for query embeddings regardless of chat provider
    pub gemini_api_key: String,
    pub tavily_api_key: String,
    pub pinecone_api_key: String,
    /// `PINECONE_INDEX_NAME`, overriding `index.name`
    pub index_name: Option<String>,
}

impl Credentials {
    pub fn from_env(provider: LlmProvider) -> crate::error::Result<Self> {
        Self::from_lookup(provider, |name| std::env::var(name).ok())
    }

    fn from_lookup<F>(provider: LlmProvider, lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &str| {
            get(name).ok_or_else(|| ResearchError::MissingCredential {
                env_var: name.to_string(),
            })
        };

        let gemini_api_key = get("GEMINI_API_KEY")
            .or_else(|| get("GOOGLE_API_KEY"))
            .ok_or_else(|| ResearchError::MissingCredential {
                env_var: "GEMINI_API_KEY".to_string(),
            })?;

        let llm_api_key = match provider {
            LlmProvider::Anthropic => require("ANTHROPIC_API_KEY")?,
            LlmProvider::Gemini => gemini_api_key.clone(),
        };

        Ok(Self {
            llm_api_key,
            gemini_api_key,
            tavily_api_key: require("TAVILY_API_KEY")?,
            pinecone_api_key: require("PINECONE_API_KEY")?,
            index_name: get("PINECONE_INDEX_NAME"),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("index_name", &self.index_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.llm.model(), gemini::DEFAULT_MODEL);
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.agent.max_turns, Some(25));
        assert_eq!(config.agent.available_documents, vec!["Google.pdf".to_string()]);
        assert_eq!(config.search.web_results, 3);
        assert_eq!(config.search.academic_max_chars, 2000);
        assert_eq!(config.search.document_results, 4);
        assert_eq!(config.index.name, "research-agent-index");
        assert!(config.session.thread_id.is_none());
    }

    #[test]
    fn test_load_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("researcher.yml");
        fs::write(
            &path,
            "llm:\n  provider: anthropic\nagent:\n  max_turns: null\nsession:\n  thread_id: thread-1\n",
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.model(), anthropic::DEFAULT_MODEL);
        assert_eq!(config.llm.timeout_ms, 300000);
        assert_eq!(config.agent.max_turns, None);
        assert_eq!(config.agent.available_documents, vec!["Google.pdf".to_string()]);
        assert_eq!(config.session.thread_id.as_deref(), Some("thread-1"));
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(temp.path().join("missing.yml").as_path())).is_err());

        let path = temp.path().join("bad.yml");
        fs::write(&path, "llm:\n  provider: openai\n").unwrap();
        assert!(Config::load(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.agent.max_turns = Some(0);
        assert!(matches!(config.validate(), Err(ResearchError::Setup(_))));

        let mut config = Config::default();
        config.agent.max_turns = None;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.search.document_results = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.thread_id = Some("  ".to_string());
        assert!(matches!(config.validate(), Err(ResearchError::Setup(_))));
    }

    #[test]
    fn test_explicit_model_wins() {
        let llm = LlmConfig {
            model: Some("gemini-2.5-pro".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(llm.model(), "gemini-2.5-pro");
    }

    #[test]
    fn test_credentials_gemini() {
        let vars = env(&[
            ("GOOGLE_API_KEY", "g"),
            ("TAVILY_API_KEY", "t"),
            ("PINECONE_API_KEY", "p"),
            ("PINECONE_INDEX_NAME", "my-index"),
        ]);
        let creds = Credentials::from_lookup(LlmProvider::Gemini, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.llm_api_key, "g");
        assert_eq!(creds.gemini_api_key, "g");
        assert_eq!(creds.index_name.as_deref(), Some("my-index"));
    }

    #[test]
    fn test_credentials_anthropic() {
        let vars = env(&[
            ("ANTHROPIC_API_KEY", "a"),
            ("GEMINI_API_KEY", "g"),
            ("GOOGLE_API_KEY", "ignored"),
            ("TAVILY_API_KEY", "t"),
            ("PINECONE_API_KEY", "p"),
        ]);
        let creds = Credentials::from_lookup(LlmProvider::Anthropic, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.llm_api_key, "a");
        assert_eq!(creds.gemini_api_key, "g");
        assert!(creds.index_name.is_none());
    }

    #[test]
    fn test_credentials_missing() {
        let vars = env(&[("GEMINI_API_KEY", "g"), ("TAVILY_API_KEY", "  ")]);
        let err = Credentials::from_lookup(LlmProvider::Gemini, |k| vars.get(k).cloned()).unwrap_err();
        match err {
            ResearchError::MissingCredential { env_var } => assert_eq!(env_var, "TAVILY_API_KEY"),
            other => panic!("unexpected error: {:?}", other),
        }

        let vars = env(&[("GEMINI_API_KEY", "g"), ("TAVILY_API_KEY", "t"), ("PINECONE_API_KEY", "p")]);
        let err = Credentials::from_lookup(LlmProvider::Anthropic, |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ResearchError::MissingCredential { .. }));
    }
}
