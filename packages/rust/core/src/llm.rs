//! Generative-text capability.
//!
//! Stages talk to a [`TextGenerator`]; the production implementation is
//! [`OpenAiCompatGenerator`], which speaks the OpenAI chat-completions wire
//! format and therefore works with any compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use leadgen_shared::{LeadGenError, PipelineConfig, Result};

/// Upper bound for one completion call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One prompt: a system instruction plus the user message.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
}

/// Produces free text from a prompt.
///
/// Implementations return [`LeadGenError::Unavailable`] when the backend
/// cannot be used at all (missing or rejected credential) and
/// [`LeadGenError::Generation`] for a failure scoped to one call, including
/// a connection that could not be opened.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

/// Connection settings for [`OpenAiCompatGenerator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl From<&PipelineConfig> for GeneratorConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and API-compatible providers.
pub struct OpenAiCompatGenerator {
    config: GeneratorConfig,
    http: Client,
}

impl OpenAiCompatGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LeadGenError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LeadGenError::Unavailable("no API key configured".into()))
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        "openai-compat"
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self.api_key()?;
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadGenError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LeadGenError::Unavailable(format!(
                    "credential rejected: HTTP {status}: {text}"
                )));
            }
            return Err(LeadGenError::Generation(format!("HTTP {status}: {text}")));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| LeadGenError::Generation(format!("failed to parse response: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LeadGenError::Generation("empty completion".into()))?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}
