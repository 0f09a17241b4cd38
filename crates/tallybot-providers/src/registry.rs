//! Provider selection — maps the configured backend name (or the model name)
//! to a concrete client.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use tallybot_core::config::Config;

use crate::error::ProviderError;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use crate::traits::LlmProvider;

/// The backends Tallybot can talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    /// Internal name, as used in config (`"gemini"`, `"openai"`).
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Parse a configured provider name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(ProviderKind::Gemini),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    /// Guess the backend from a model identifier.
    pub fn infer(model: &str) -> Self {
        if model.to_ascii_lowercase().contains("gemini") {
            ProviderKind::Gemini
        } else {
            ProviderKind::OpenAi
        }
    }

    /// Resolve from config: explicit `agent.provider`, else inferred from the model.
    pub fn resolve(config: &Config) -> Result<Self, ProviderError> {
        let name = config.agent.provider.trim();
        if name.is_empty() {
            return Ok(Self::infer(&config.agent.model));
        }
        Self::from_name(name).ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }
}

/// Build the provider selected by `config`.
///
/// This is the main entry point for the CLI: credentials, base URL, retry
/// policy, and timeout are all taken from the loaded config.
pub fn create_provider(config: &Config) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let kind = ProviderKind::resolve(config)?;
    let model = &config.agent.model;
    let timeout = Duration::from_secs(config.timeout_secs);
    let retry = config.retry.clone();

    let provider_config = config
        .providers
        .get_by_name(kind.name())
        .ok_or_else(|| ProviderError::UnknownProvider(kind.name().to_string()))?;

    debug!(
        provider = kind.name(),
        model = %model,
        api_base = provider_config.api_base.as_deref().unwrap_or("default"),
        "Creating LLM provider"
    );

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::Gemini => {
            Arc::new(GeminiProvider::new(provider_config, model, retry, timeout)?)
        }
        ProviderKind::OpenAi => {
            Arc::new(OpenAiProvider::new(provider_config, model, retry, timeout)?)
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_model() {
        assert_eq!(ProviderKind::infer("gemini-2.5-flash"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::infer("models/Gemini-1.5-pro"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::infer("gpt-4o-mini"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::infer("llama3.1"), ProviderKind::OpenAi);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ProviderKind::from_name("Gemini"), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::from_name(" openai "), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::from_name("anthropic"), None);
    }

    #[test]
    fn test_explicit_provider_wins_over_model() {
        let mut config = Config::default();
        config.agent.provider = "openai".into();
        config.agent.model = "gemini-2.5-flash".into();
        assert_eq!(ProviderKind::resolve(&config).unwrap(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_unknown_provider_name() {
        let mut config = Config::default();
        config.agent.provider = "anthropic".into();
        let err = ProviderKind::resolve(&config).unwrap_err();
        assert_eq!(err, ProviderError::UnknownProvider("anthropic".into()));
    }

    #[test]
    fn test_create_gemini_provider() {
        let mut config = Config::default();
        config.providers.gemini.api_key = "g-key".into();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.display_name(), "Gemini");
        assert_eq!(provider.default_model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_create_openai_provider() {
        let mut config = Config::default();
        config.agent.model = "gpt-4o-mini".into();
        config.providers.openai.api_key = "sk-key".into();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.display_name(), "OpenAI");
    }

    #[test]
    fn test_create_provider_without_key() {
        let config = Config::default();
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, ProviderError::ApiKeyMissing(_)));
    }
}
