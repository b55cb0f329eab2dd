use std::sync::Arc;

use ap_core::{Error, GenerativeModel, Result};

pub mod canned;
pub mod gemini;

pub use canned::CannedModel;
pub use gemini::GeminiModel;

#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    /// `gemini` (default) or `canned`
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
    /// Fixed answer for the canned provider
    pub canned_response: Option<String>,
}

pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn GenerativeModel>> {
    let provider = config.provider.as_deref().unwrap_or("gemini").to_lowercase();
    match provider.as_str() {
        "gemini" => {
            let mut model = GeminiModel::new(config.api_key.clone())?;
            if let Some(name) = &config.model_name {
                model = model.with_model_name(name);
            }
            if let Some(url) = &config.base_url {
                model = model.with_base_url(url);
            }
            tracing::info!("🧠 Using Gemini model {}", config.model_name.as_deref().unwrap_or(gemini::DEFAULT_GEMINI_MODEL));
            Ok(Arc::new(model))
        }
        "canned" => {
            let response = config.canned_response.clone().unwrap_or_default();
            Ok(Arc::new(CannedModel::new(response)))
        }
        other => Err(Error::Config(format!(
            "Unknown model provider: {}. Available providers: gemini, canned",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model() {
        let config = ModelConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert_eq!(create_model(&config).unwrap().name(), "Gemini");

        let config = ModelConfig {
            provider: Some("Canned".to_string()),
            ..Default::default()
        };
        assert_eq!(create_model(&config).unwrap().name(), "Canned");

        let config = ModelConfig {
            provider: Some("gpt".to_string()),
            ..Default::default()
        };
        assert!(create_model(&config).is_err());
    }

    #[test]
    fn test_gemini_without_key_is_config_error() {
        let result = create_model(&ModelConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
