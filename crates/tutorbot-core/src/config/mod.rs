//! Configuration module for tutorbot.
//!
//! Loads typed configuration from `~/.tutorbot/config.json`.
//! All fields use `serde` for zero-boilerplate deserialization, and API
//! keys can be supplied or overridden through environment variables.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::provider::openai::resolve_base_url;
use crate::selector::{ModelCandidate, SelectorOptions, DEFAULT_SYSTEM_PROMPT};

/// Environment variables consulted for each provider's API key, in order.
const KEY_ENV_VARS: &[(&str, &[&str])] = &[
    ("openrouter", &["OPENROUTER_API_KEY"]),
    ("huggingface", &["HF_TOKEN", "HUGGINGFACE_API_KEY"]),
    ("gemini", &["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
];

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub models: ModelsConfig,
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// Priority:
    /// 1. local `config.json` in current directory
    /// 2. `~/.tutorbot/config.json`
    ///
    /// Falls back to defaults when neither exists. Environment variables are
    /// applied on top in every case.
    pub fn load() -> anyhow::Result<Self> {
        if let Some(path) = Self::locate() {
            return Self::load_from(&path);
        }

        let mut config = Config::default();
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// The config file [`Config::load`] reads, if any exists.
    pub fn locate() -> Option<PathBuf> {
        first_existing([PathBuf::from("config.json"), Self::default_path()])
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        tracing::debug!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Get the default config file path (`~/.tutorbot/config.json`).
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Get the default config directory path.
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tutorbot")
    }

    /// Override provider API keys from the environment.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (provider, vars) in KEY_ENV_VARS {
            let key = vars
                .iter()
                .filter_map(|var| lookup(var).map(|v| (*var, v)))
                .find(|(_, v)| !v.trim().is_empty());
            if let Some((var, key)) = key {
                tracing::info!(provider, var, "Using API key from environment variable");
                self.providers.get_or_insert(provider).api_key = key;
            }
        }
    }

    /// Replace the primary and/or fallback model identifiers.
    pub fn override_models(&mut self, primary: Option<&str>, fallback: Option<&str>) {
        let overrides = [primary, fallback];
        for (index, model) in overrides.into_iter().enumerate() {
            let Some(model) = model else { continue };
            if let Some(candidate) = self.models.candidates.get_mut(index) {
                candidate.model = model.to_string();
            } else {
                let provider = self
                    .models
                    .candidates
                    .first()
                    .map(|c| c.provider.clone())
                    .unwrap_or_else(|| "openrouter".into());
                self.models.candidates.push(CandidateConfig {
                    provider,
                    model: model.to_string(),
                });
            }
        }
    }

    /// Resolve the candidate list into bindable model candidates.
    ///
    /// A candidate whose provider has no key or no known endpoint resolves
    /// with an empty field; the selector reports it when it is skipped.
    pub fn candidates(&self) -> Vec<ModelCandidate> {
        self.models
            .candidates
            .iter()
            .map(|c| {
                let entry = self.providers.get(&c.provider);
                let endpoint = resolve_base_url(
                    &c.provider,
                    entry.and_then(|e| e.api_base.as_deref()),
                )
                .unwrap_or_default();
                let credential = entry.map(|e| e.api_key.as_str()).unwrap_or_default();
                let mut headers = entry.map(|e| e.extra_headers.clone()).unwrap_or_default();
                if c.provider == "openrouter" {
                    // OpenRouter attributes traffic by app title.
                    headers
                        .entry("X-Title".to_string())
                        .or_insert_with(|| "tutorbot".to_string());
                }
                ModelCandidate::new(&c.provider, &endpoint, &c.model, credential)
                    .with_extra_headers(headers)
            })
            .collect()
    }

    /// Request options for the model selector.
    pub fn selector_options(&self) -> SelectorOptions {
        SelectorOptions {
            max_tokens: self.chat.max_tokens,
            temperature: self.chat.temperature,
            system_prompt: Some(self.chat.system_prompt.clone()).filter(|p| !p.trim().is_empty()),
            max_history_turns: self.chat.max_history_turns,
            fallback_on_quota: self.chat.fallback_on_quota,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.chat.timeout_seconds)
    }

    /// Write the default config template to disk.
    pub fn write_default_template() -> anyhow::Result<PathBuf> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::json!({
            "providers": {
                "openrouter": {
                    "apiKey": "sk-or-v1-YOUR_KEY_HERE"
                }
            },
            "models": {
                "candidates": [
                    { "provider": "openrouter", "model": "google/gemini-pro" },
                    { "provider": "openrouter", "model": "google/gemini-flash-1.5" }
                ]
            }
        });

        std::fs::write(&path, serde_json::to_string_pretty(&template)?)?;
        Ok(path)
    }

    /// Validate configuration and return actionable error messages.
    ///
    /// Checks that:
    /// - At least one model candidate is configured
    /// - Every candidate names a model and a reachable provider endpoint
    /// - At least one candidate's provider has a real (non-placeholder) API key
    /// - The request timeout is non-zero
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.models.candidates.is_empty() {
            errors.push("models.candidates is empty. Add at least one model.".into());
        }

        for (i, c) in self.models.candidates.iter().enumerate() {
            if c.model.trim().is_empty() {
                errors.push(format!("models.candidates[{i}].model is empty. Specify a model name."));
            }
            let api_base = self.providers.get(&c.provider).and_then(|e| e.api_base.as_deref());
            if resolve_base_url(&c.provider, api_base).is_none() {
                errors.push(format!(
                    "Unknown provider '{}' in models.candidates[{i}]. \
                     Use openrouter, huggingface or gemini, or set providers.{}.apiBase.",
                    c.provider, c.provider
                ));
            }
        }

        let has_key = self.models.candidates.iter().any(|c| {
            self.providers
                .get(&c.provider)
                .is_some_and(|e| e.has_real_key())
        });
        if !self.models.candidates.is_empty() && !has_key {
            errors.push(
                "No API key configured for any model provider. \
                 Edit config.json and replace the placeholder key, \
                 or set OPENROUTER_API_KEY / HF_TOKEN / GEMINI_API_KEY."
                    .into(),
            );
        }

        if self.chat.timeout_seconds == 0 {
            errors.push("chat.timeoutSeconds must be greater than zero.".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn first_existing(paths: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    paths.into_iter().find(|p| p.exists())
}

// ── Provider Configuration ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderEntry {
    pub api_key: String,
    pub api_base: Option<String>,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl ProviderEntry {
    pub fn has_real_key(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.contains("YOUR_")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openrouter: Option<ProviderEntry>,
    pub huggingface: Option<ProviderEntry>,
    pub gemini: Option<ProviderEntry>,
    /// Any other OpenAI-compatible provider, keyed by name. These need an
    /// `apiBase`.
    #[serde(flatten)]
    pub custom: HashMap<String, ProviderEntry>,
}

impl ProvidersConfig {
    pub fn get(&self, name: &str) -> Option<&ProviderEntry> {
        match name {
            "openrouter" => self.openrouter.as_ref(),
            "huggingface" => self.huggingface.as_ref(),
            "gemini" => self.gemini.as_ref(),
            other => self.custom.get(other),
        }
    }

    /// Get a provider entry, creating an empty one if it is missing.
    fn get_or_insert(&mut self, name: &str) -> &mut ProviderEntry {
        let slot = match name {
            "openrouter" => &mut self.openrouter,
            "huggingface" => &mut self.huggingface,
            "gemini" => &mut self.gemini,
            other => return self.custom.entry(other.to_string()).or_default(),
        };
        slot.get_or_insert_with(ProviderEntry::default)
    }

    /// All providers with a real API key.
    pub fn find_all_active(&self) -> Vec<(&str, &ProviderEntry)> {
        let mut custom: Vec<(&str, &ProviderEntry)> =
            self.custom.iter().map(|(name, e)| (name.as_str(), e)).collect();
        custom.sort_by_key(|(name, _)| *name);

        [
            ("openrouter", self.openrouter.as_ref()),
            ("huggingface", self.huggingface.as_ref()),
            ("gemini", self.gemini.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, entry)| entry.map(|e| (name, e)))
        .chain(custom)
        .filter(|(_, e)| e.has_real_key())
        .collect()
    }
}

// ── Model Configuration ─────────────────────────────────────────────

/// One model preference: which provider to call, and which model on it.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateConfig {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Highest preference first.
    pub candidates: Vec<CandidateConfig>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            candidates: vec![
                CandidateConfig {
                    provider: "openrouter".into(),
                    model: "google/gemini-pro".into(),
                },
                CandidateConfig {
                    provider: "openrouter".into(),
                    model: "google/gemini-flash-1.5".into(),
                },
            ],
        }
    }
}

// ── Chat Configuration ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_history_turns: usize,
    pub fallback_on_quota: bool,
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            timeout_seconds: 60,
            max_history_turns: 40,
            fallback_on_quota: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        let models: Vec<&str> = config.models.candidates.iter().map(|c| c.model.as_str()).collect();
        assert_eq!(models, vec!["google/gemini-pro", "google/gemini-flash-1.5"]);
        assert_eq!(config.chat.timeout_seconds, 60);
        assert!(config.chat.fallback_on_quota);
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{"providers": {"openrouter": {"apiKey": "test-key"}}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.providers.openrouter.unwrap().api_key, "test-key");
        assert_eq!(config.models.candidates.len(), 2);
    }

    #[test]
    fn test_candidates_resolve_endpoint_and_key() {
        let json = r#"{
            "providers": {
                "openrouter": {"apiKey": "sk-or"},
                "gemini": {"apiKey": "g-key", "extraHeaders": {"x-trace": "1"}}
            },
            "models": {"candidates": [
                {"provider": "gemini", "model": "gemini-1.5-pro"},
                {"provider": "openrouter", "model": "google/gemini-flash-1.5"}
            ]}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let candidates = config.candidates();

        assert_eq!(
            candidates[0].endpoint,
            "https://generativelanguage.googleapis.com/v1beta/openai"
        );
        assert_eq!(candidates[0].credential, "g-key");
        assert_eq!(candidates[0].extra_headers.get("x-trace").map(String::as_str), Some("1"));
        assert_eq!(candidates[1].endpoint, "https://openrouter.ai/api/v1");
        assert_eq!(
            candidates[1].extra_headers.get("X-Title").map(String::as_str),
            Some("tutorbot")
        );
    }

    #[test]
    fn test_env_overrides_file_key() {
        let mut config: Config =
            serde_json::from_str(r#"{"providers": {"openrouter": {"apiKey": "from-file"}}}"#).unwrap();
        config.apply_env_overrides(env(&[
            ("OPENROUTER_API_KEY", "from-env"),
            ("HF_TOKEN", ""),
            ("HUGGINGFACE_API_KEY", "hf-key"),
        ]));

        assert_eq!(config.providers.openrouter.as_ref().unwrap().api_key, "from-env");
        assert_eq!(config.providers.huggingface.as_ref().unwrap().api_key, "hf-key");
        assert!(config.providers.gemini.is_none());
    }

    #[test]
    fn test_validate_requires_a_key() {
        let config = Config::default();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("No API key")));

        let mut config = Config::default();
        config.apply_env_overrides(env(&[("OPENROUTER_API_KEY", "sk-or-v1-real")]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_placeholder_and_unknown_provider() {
        let json = r#"{
            "providers": {"openrouter": {"apiKey": "sk-or-v1-YOUR_KEY_HERE"}},
            "models": {"candidates": [{"provider": "mystery", "model": "m"}]}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Unknown provider 'mystery'")));
        assert!(errors.iter().any(|e| e.contains("No API key")));
    }

    #[test]
    fn test_custom_provider_with_api_base() {
        let json = r#"{
            "providers": {
                "ollama": {"apiKey": "k", "apiBase": "http://localhost:11434/v1/"}
            },
            "models": {"candidates": [{"provider": "ollama", "model": "llama3"}]}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert!(config.validate().is_ok());
        let candidates = config.candidates();
        assert_eq!(candidates[0].endpoint, "http://localhost:11434/v1");
        assert_eq!(candidates[0].credential, "k");
        assert!(candidates[0].extra_headers.is_empty());
        let active: Vec<&str> = config.providers.find_all_active().iter().map(|(n, _)| *n).collect();
        assert_eq!(active, vec!["ollama"]);
    }

    #[test]
    fn test_custom_provider_without_api_base_is_unknown() {
        let json = r#"{
            "providers": {"ollama": {"apiKey": "k"}},
            "models": {"candidates": [{"provider": "ollama", "model": "llama3"}]}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Unknown provider 'ollama'")));
    }

    #[test]
    fn test_override_models() {
        let mut config = Config::default();
        config.override_models(Some("openai/gpt-4o"), None);
        assert_eq!(config.models.candidates[0].model, "openai/gpt-4o");
        assert_eq!(config.models.candidates[1].model, "google/gemini-flash-1.5");

        config.models.candidates.truncate(1);
        config.override_models(None, Some("google/gemini-flash-1.5-8b"));
        assert_eq!(config.models.candidates.len(), 2);
        assert_eq!(config.models.candidates[1].provider, "openrouter");
    }

    #[test]
    fn test_selector_options_from_chat_config() {
        let json = r#"{"chat": {"maxTokens": 512, "systemPrompt": "", "fallbackOnQuota": false}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let options = config.selector_options();
        assert_eq!(options.max_tokens, 512);
        assert!(options.system_prompt.is_none());
        assert!(!options.fallback_on_quota);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"providers": {{"gemini": {{"apiKey": "g"}}}}, "chat": {{"timeoutSeconds": 5}}}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.providers.gemini.is_some());
    }

    #[test]
    fn test_first_existing_prefers_earlier_path() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("config.json");
        let home = dir.path().join("home.json");
        std::fs::write(&home, "{}").unwrap();

        assert_eq!(first_existing([local.clone(), home.clone()]), Some(home.clone()));
        std::fs::write(&local, "{}").unwrap();
        assert_eq!(first_existing([local.clone(), home]), Some(local));
        assert_eq!(first_existing([dir.path().join("missing.json")]), None);
    }

    #[test]
    fn test_load_from_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
