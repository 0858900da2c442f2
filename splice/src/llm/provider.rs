use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{Result, SpliceError};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// The reasoning capability seam. The orchestration loop only depends on this
/// trait, so tests can drive it with a scripted backend.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
    options: CompletionOptions,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    LlmBackend::Unavailable {
                        reason: format!("Unknown provider in model: {}", config.model),
                    }
                }
            }
        };

        Self {
            backend,
            config: Some(Arc::new(config.clone())),
            options: CompletionOptions::default(),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
            options: CompletionOptions::default(),
        }
    }

    /// Same provider with fixed completion options applied to every call.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM completion is not available".to_string(),
        }
    }
}

#[async_trait]
impl ReasoningBackend for LlmProvider {
    async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        if !self.is_available() {
            return Err(SpliceError::LlmUnavailable(self.unavailable_reason()));
        }

        let config = self
            .config()
            .ok_or_else(|| SpliceError::LlmUnavailable("No config available".to_string()))?;

        let client = LlmApiClient::new(config)?;
        client
            .complete(prompt, system_prompt, Some(&self.options))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(model: &str) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: Some("test-key".to_string()),
            base_url: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }

    #[test]
    fn test_backend_detection() {
        let provider = LlmProvider::new(Some(&llm_config("openai/gpt-4o")));
        assert!(matches!(provider.backend(), LlmBackend::OpenAI));

        let provider = LlmProvider::new(Some(&llm_config("ollama/llama3")));
        assert!(matches!(provider.backend(), LlmBackend::Ollama));

        let provider = LlmProvider::new(Some(&llm_config("openrouter/openai/gpt-4o")));
        assert!(matches!(provider.backend(), LlmBackend::OpenRouter));
    }

    #[test]
    fn test_unknown_provider_without_base_url_is_unavailable() {
        let provider = LlmProvider::new(Some(&llm_config("mystery-model")));
        assert!(!provider.is_available());
    }

    #[test]
    fn test_unknown_provider_with_base_url_is_compatible() {
        let mut config = llm_config("mystery-model");
        config.base_url = Some("http://localhost:9999/v1".to_string());
        let provider = LlmProvider::new(Some(&config));
        assert!(matches!(
            provider.backend(),
            LlmBackend::OpenAICompatible { .. }
        ));
    }

    #[test]
    fn test_no_config_is_unavailable() {
        let provider = LlmProvider::new(None);
        assert!(!provider.is_available());
    }
}
