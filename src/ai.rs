//! Stateless client for remote tag/title suggestions. Failures come back as
//! error values; nothing here ever touches the entry being edited.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::{AiConfig, AiProvider, HierarchicalTag};
use crate::taxonomy::{CategoryId, Locale, UNCATEGORIZED_SUBCATEGORY};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TEMPERATURE: f64 = 0.3;
const MAX_SUGGESTED_TAGS: usize = 8;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI suggestions are disabled for this provider")]
    Disabled,
    #[error("AI configuration is incomplete: missing {0}")]
    MissingConfig(&'static str),
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI endpoint returned an unexpected response shape")]
    UnexpectedResponse,
    #[error("AI endpoint returned no usable text")]
    EmptyCompletion,
}

pub struct SuggestionClient {
    http: Client,
}

impl Default for SuggestionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionClient {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    /// Ask the configured provider for up to eight tag labels describing
    /// `content`. Suggestions come back as custom tags under `category_hint`
    /// (or the uncategorized bucket).
    pub fn suggest_tags(
        &self,
        content: &str,
        config: &AiConfig,
        locale: Locale,
        category_hint: Option<CategoryId>,
    ) -> Result<Vec<HierarchicalTag>, AiError> {
        validate(config)?;
        let prompt = tag_prompt(content, locale);
        let raw = self.complete(&prompt, config)?;

        let category = category_hint.unwrap_or(CategoryId::Uncategorized);
        let tags: Vec<HierarchicalTag> = raw
            .split(',')
            .map(|label| label.trim().trim_matches('"').trim())
            .filter(|label| !label.is_empty())
            .take(MAX_SUGGESTED_TAGS)
            .map(|label| HierarchicalTag::custom(category, UNCATEGORIZED_SUBCATEGORY, label))
            .collect();
        if tags.is_empty() {
            return Err(AiError::EmptyCompletion);
        }
        Ok(tags)
    }

    /// Ask the configured provider for a short title for `content`.
    pub fn suggest_title(
        &self,
        content: &str,
        config: &AiConfig,
        locale: Locale,
    ) -> Result<String, AiError> {
        validate(config)?;
        let prompt = title_prompt(content, locale);
        let raw = self.complete(&prompt, config)?;
        let title = raw
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .trim_matches('"')
            .trim()
            .to_string();
        if title.is_empty() {
            return Err(AiError::EmptyCompletion);
        }
        Ok(title)
    }

    fn complete(&self, prompt: &str, config: &AiConfig) -> Result<String, AiError> {
        match config.provider {
            AiProvider::Gemini => self.complete_gemini(prompt, config),
            AiProvider::LmStudio => self.complete_lm_studio(prompt, config),
        }
    }

    fn complete_gemini(&self, prompt: &str, config: &AiConfig) -> Result<String, AiError> {
        let url = format!(
            "{GEMINI_BASE_URL}/{}:generateContent?key={}",
            config.model_name, config.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": TEMPERATURE },
        });
        let response: Value = self
            .http
            .post(&url)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;
        response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(AiError::UnexpectedResponse)
    }

    fn complete_lm_studio(&self, prompt: &str, config: &AiConfig) -> Result<String, AiError> {
        // chat vs. plain completion is inferred from the endpoint path
        let chat = config.completion_endpoint.contains("/chat/completions");
        let body = if chat {
            json!({
                "model": config.model_name,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": TEMPERATURE,
            })
        } else {
            json!({
                "model": config.model_name,
                "prompt": prompt,
                "temperature": TEMPERATURE,
            })
        };

        let mut request = self.http.post(&config.completion_endpoint).json(&body);
        if !config.api_key.is_empty() {
            request = request.bearer_auth(&config.api_key);
        }
        let response: Value = request.send()?.error_for_status()?.json()?;

        let text = if chat {
            response["choices"][0]["message"]["content"].as_str()
        } else {
            response["choices"][0]["text"].as_str()
        };
        text.map(str::to_string).ok_or(AiError::UnexpectedResponse)
    }
}

/// Reject incomplete configs before any network I/O happens.
fn validate(config: &AiConfig) -> Result<(), AiError> {
    if !config.enabled {
        return Err(AiError::Disabled);
    }
    if config.model_name.is_empty() {
        return Err(AiError::MissingConfig("model name"));
    }
    match config.provider {
        AiProvider::Gemini if config.api_key.is_empty() => Err(AiError::MissingConfig("API key")),
        AiProvider::LmStudio if config.completion_endpoint.is_empty() => {
            Err(AiError::MissingConfig("completion endpoint"))
        }
        _ => Ok(()),
    }
}

fn tag_prompt(content: &str, locale: Locale) -> String {
    match locale {
        Locale::En => format!(
            "Suggest up to {MAX_SUGGESTED_TAGS} short tags (1-2 words each) describing the \
             themes of this dream. Reply with a comma-separated list only, no numbering.\n\n\
             Dream:\n{content}"
        ),
        Locale::PtBr => format!(
            "Sugira até {MAX_SUGGESTED_TAGS} tags curtas (1-2 palavras cada) descrevendo os \
             temas deste sonho. Responda apenas com uma lista separada por vírgulas, sem \
             numeração.\n\nSonho:\n{content}"
        ),
    }
}

fn title_prompt(content: &str, locale: Locale) -> String {
    match locale {
        Locale::En => format!(
            "Suggest a short, evocative title (max 6 words) for this dream. Reply with the \
             title only, no quotes.\n\nDream:\n{content}"
        ),
        Locale::PtBr => format!(
            "Sugira um título curto e evocativo (máximo 6 palavras) para este sonho. Responda \
             apenas com o título, sem aspas.\n\nSonho:\n{content}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_fails_without_network() {
        let client = SuggestionClient::new();
        let config = AiConfig::default_for(AiProvider::Gemini);
        assert!(matches!(
            client.suggest_tags("a dream", &config, Locale::En, None),
            Err(AiError::Disabled)
        ));
    }

    #[test]
    fn provider_specific_fields_are_required() {
        let client = SuggestionClient::new();

        let mut gemini = AiConfig::default_for(AiProvider::Gemini);
        gemini.enabled = true;
        assert!(matches!(
            client.suggest_title("a dream", &gemini, Locale::En),
            Err(AiError::MissingConfig("API key"))
        ));

        let mut lmstudio = AiConfig::default_for(AiProvider::LmStudio);
        lmstudio.enabled = true;
        lmstudio.completion_endpoint.clear();
        assert!(matches!(
            client.suggest_title("a dream", &lmstudio, Locale::En),
            Err(AiError::MissingConfig("completion endpoint"))
        ));

        lmstudio.completion_endpoint = "http://localhost:1234/v1/completions".into();
        lmstudio.model_name.clear();
        assert!(matches!(
            client.suggest_title("a dream", &lmstudio, Locale::En),
            Err(AiError::MissingConfig("model name"))
        ));
    }
}
