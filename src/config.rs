use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{EuporieError, EuporieResult};
use crate::perception::debug_store::DebugStore;
use crate::perception::types::ExtractionPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub generators: GeneratorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub active_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
}

/// Without a config file the service talks to OpenAI.
impl Default for LlmConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderEntry {
                display_name: "OpenAI".to_string(),
                api_base: "https://api.openai.com/v1/chat/completions".to_string(),
                model: "gpt-4o".to_string(),
                temperature: default_temperature(),
                api_key: None,
            },
        );
        Self {
            active_provider: "openai".to_string(),
            providers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default)]
    pub display_name: String,
    /// Full chat-completions endpoint URL.
    pub api_base: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var
    /// EUPORIE_<ID>_API_KEY, then OPENAI_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_temperature() -> f64 {
    0.1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub policy: ExtractionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Draw element boxes on screenshots when both image and elements exist.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Map hierarchy coordinates onto image pixels.
    #[serde(default = "default_true")]
    pub rescale: bool,
    #[serde(default = "default_true")]
    pub persist_debug: bool,
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rescale: true,
            persist_debug: true,
            debug_dir: None,
        }
    }
}

impl AnnotationConfig {
    pub fn debug_store(&self) -> Option<DebugStore> {
        if !self.persist_debug {
            return None;
        }
        let dir = self.debug_dir.clone().unwrap_or_else(DebugStore::default_dir);
        Some(DebugStore::new(dir))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorsConfig {
    /// Generator names the resolver may call. Empty allows every built-in.
    #[serde(default)]
    pub allowed: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn resolve_config_path() -> EuporieResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(EuporieError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn parse_config(content: &str) -> EuporieResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    if !config.llm.providers.contains_key(&config.llm.active_provider) {
        return Err(EuporieError::Config(format!(
            "active provider '{}' has no [llm.providers.{}] entry",
            config.llm.active_provider, config.llm.active_provider
        )));
    }
    Ok(config)
}

/// Load `explicit` if given, otherwise search the default locations.
pub fn load_config(explicit: Option<&Path>) -> EuporieResult<AppConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => resolve_config_path()?,
    };
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(
        path = %path.display(),
        provider = %config.llm.active_provider,
        policy = ?config.extraction.policy,
        "config loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.llm.active_provider, "openai");
        assert_eq!(config.extraction.policy, ExtractionPolicy::InputFieldsOnly);
        assert!(config.annotation.enabled && config.annotation.rescale);
        assert!(config.generators.allowed.is_empty());
    }

    #[test]
    fn full_file_parses() {
        let config = parse_config(
            r#"
[llm]
active_provider = "local"

[llm.providers.local]
display_name = "Local vLLM"
api_base = "http://127.0.0.1:8000/v1/chat/completions"
model = "qwen2-vl"

[extraction]
policy = "all_clickable"

[annotation]
rescale = false
persist_debug = false

[generators]
allowed = ["email", "name"]
"#,
        )
        .unwrap();
        let local = &config.llm.providers["local"];
        assert_eq!(local.model, "qwen2-vl");
        assert!((local.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.extraction.policy, ExtractionPolicy::AllClickable);
        assert!(!config.annotation.rescale);
        assert!(config.annotation.debug_store().is_none());
        assert_eq!(config.generators.allowed, ["email", "name"]);
    }

    #[test]
    fn active_provider_must_exist() {
        let err = parse_config("[llm]\nactive_provider = \"missing\"\n").unwrap_err();
        assert!(matches!(err, EuporieError::Config(_)));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[annotation]\ndebug_dir = \"/tmp/euporie-debug\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(
            config.annotation.debug_store().unwrap().dir(),
            Path::new("/tmp/euporie-debug")
        );
    }
}
