use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Failure of a single model call.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("{provider} request failed: {message}")]
    Request { provider: &'static str, message: String },

    #[error("{provider} API returned {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} returned a malformed response: {message}")]
    MalformedResponse { provider: &'static str, message: String },
}

impl ModelError {
    fn request(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            ModelError::MalformedResponse {
                provider,
                message: err.to_string(),
            }
        } else {
            ModelError::Request {
                provider,
                message: err.to_string(),
            }
        }
    }
}

/// A text-completion backend: one prompt in, one completion out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Common message structure for chat-style requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

/// Enum-based provider so the configured backend can be chosen at runtime
#[derive(Debug, Clone)]
pub enum LLMProvider {
    OpenAI(OpenAIProvider),
    Gemini(GeminiProvider),
}

#[async_trait]
impl ModelClient for LLMProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        match self {
            LLMProvider::OpenAI(provider) => provider.make_request(prompt).await,
            LLMProvider::Gemini(provider) => provider.make_request(prompt).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI(_) => OpenAIProvider::NAME,
            LLMProvider::Gemini(_) => GeminiProvider::NAME,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            LLMProvider::OpenAI(provider) => &provider.model,
            LLMProvider::Gemini(provider) => &provider.model,
        }
    }
}

fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to build HTTP client with timeout, using defaults");
            Client::new()
        })
}

/// OpenAI-compatible chat completions provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<LLMMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChoice {
    message: LLMMessage,
}

impl OpenAIProvider {
    const NAME: &'static str = "OpenAI";

    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }

    pub async fn make_request(&self, prompt: &str) -> Result<String, ModelError> {
        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        info!(
            provider = Self::NAME,
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ModelError::request(Self::NAME, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = Self::NAME,
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(ModelError::Api {
                provider: Self::NAME,
                status: status.as_u16(),
                message: error_text,
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ModelError::request(Self::NAME, e))?;

        let content = openai_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyResponse { provider: Self::NAME })?;

        info!(
            provider = Self::NAME,
            response_length = content.len(),
            "Successfully received LLM response"
        );

        Ok(content)
    }
}

/// Google Gemini `generateContent` provider
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: i32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiProvider {
    const NAME: &'static str = "Gemini";

    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| "gemini-2.5-flash".to_string()),
        }
    }

    pub async fn make_request(&self, prompt: &str) -> Result<String, ModelError> {
        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.9,
                max_output_tokens: 4096,
            },
        };

        info!(
            provider = Self::NAME,
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ModelError::request(Self::NAME, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = Self::NAME,
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(ModelError::Api {
                provider: Self::NAME,
                status: status.as_u16(),
                message: error_text,
            });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::request(Self::NAME, e))?;

        let content = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyResponse { provider: Self::NAME })?;

        info!(
            provider = Self::NAME,
            response_length = content.len(),
            "Successfully received LLM response"
        );

        Ok(content)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LLMProviderType {
    OpenAI,
    Gemini,
}

impl LLMProviderType {
    /// Parse a provider name, defaulting to Gemini for unknown values.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => LLMProviderType::Gemini,
            "openai" | "chatgpt" | "gpt" => LLMProviderType::OpenAI,
            _ => {
                info!("Unknown LLM provider '{}', defaulting to Gemini", value);
                LLMProviderType::Gemini
            }
        }
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> LLMProvider {
        match provider_type {
            LLMProviderType::OpenAI => {
                LLMProvider::OpenAI(OpenAIProvider::new(api_key, base_url, model, timeout))
            }
            LLMProviderType::Gemini => {
                LLMProvider::Gemini(GeminiProvider::new(api_key, base_url, model, timeout))
            }
        }
    }
}
