use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub artifacts: ArtifactsConfig,
    pub agent: AgentConfig,
    pub llm: Option<LlmConfig>,
    pub response_llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub busy_timeout_ms: u64,
}

/// Output locations for rendered charts and exported reports.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    pub plots_dir: String,
    pub reports_dir: String,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Bounds and bookkeeping knobs for the orchestration loop.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Maximum reasoning/tool-call round trips per user turn.
    pub max_steps: u32,
    /// Wall-clock budget per user turn in seconds.
    pub max_turn_secs: u64,
    /// Maximum age of the cached result set still valid for plotting/export.
    pub cache_freshness_secs: i64,
    /// Conversation memory is cleared wholesale every this many completed turns.
    pub memory_reset_interval: u64,
    /// Character budget for the memory rendered into prompts.
    pub memory_char_budget: usize,
    /// Rows shown in the query tool's tabular preview.
    pub preview_rows: usize,
    /// Bounded attempts for capacity/rate-limit retries around the reasoning call.
    pub capacity_max_attempts: u32,
    /// Cap on a single capacity backoff delay in seconds.
    pub capacity_max_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SPLICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("SPLICE_PORT", 3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:data/rnaseq.db".to_string()),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
            },
            artifacts: ArtifactsConfig {
                plots_dir: env::var("PLOTS_DIR").unwrap_or_else(|_| "assets/plots".to_string()),
                reports_dir: env::var("REPORTS_DIR")
                    .unwrap_or_else(|_| "assets/reports".to_string()),
            },
            agent: AgentConfig {
                max_steps: parse_env_or("AGENT_MAX_STEPS", 15),
                max_turn_secs: parse_env_or("AGENT_MAX_TURN_SECS", 75),
                cache_freshness_secs: parse_env_or("AGENT_CACHE_FRESHNESS_SECS", 120),
                memory_reset_interval: parse_env_or("AGENT_MEMORY_RESET_INTERVAL", 25),
                memory_char_budget: parse_env_or("AGENT_MEMORY_CHAR_BUDGET", 16000),
                preview_rows: parse_env_or("AGENT_PREVIEW_ROWS", 15),
                capacity_max_attempts: parse_env_or("AGENT_CAPACITY_MAX_ATTEMPTS", 5),
                capacity_max_delay_secs: parse_env_or("AGENT_CAPACITY_MAX_DELAY_SECS", 30),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 3),
            }),
            // The response model writes the final natural-language answer; it
            // falls back to the action model when not configured.
            response_llm: env::var("RESPONSE_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("RESPONSE_API_KEY")
                    .ok()
                    .or_else(|| env::var("LLM_API_KEY").ok()),
                base_url: env::var("RESPONSE_BASE_URL")
                    .ok()
                    .or_else(|| env::var("LLM_BASE_URL").ok()),
                timeout_secs: parse_env_or("RESPONSE_TIMEOUT", 60),
                max_retries: parse_env_or("RESPONSE_MAX_RETRIES", 2),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.max_steps, 15);
        assert_eq!(config.agent.max_turn_secs, 75);
        assert_eq!(config.agent.cache_freshness_secs, 120);
        assert_eq!(config.agent.memory_reset_interval, 25);
    }

    #[test]
    fn test_parse_llm_provider_model() {
        assert_eq!(
            parse_llm_provider_model("openai/gpt-4o"),
            ("openai", "gpt-4o")
        );
        assert_eq!(
            parse_llm_provider_model("ollama/llama3"),
            ("ollama", "llama3")
        );
        assert_eq!(
            parse_llm_provider_model("my-local-model"),
            ("local", "my-local-model")
        );
        assert_eq!(
            parse_llm_provider_model("openrouter/openai/gpt-4o"),
            ("openrouter", "openai/gpt-4o")
        );
    }
}
