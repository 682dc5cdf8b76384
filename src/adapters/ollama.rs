use crate::domain::model::RawModelResponse;
use crate::domain::ports::{ConfigProvider, InferenceService};
use crate::utils::error::{InferenceError, Result, TaggerError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Ollama `/api/chat` 用戶端，非串流模式
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f64,
    seed: Option<u64>,
    json_format: bool,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, temperature: f64) -> Result<Self> {
        Self::build(base_url, model, temperature, None, None, true)
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::build(
            config.base_url(),
            config.model(),
            config.temperature(),
            config.seed(),
            config.request_timeout_secs(),
            config.json_format(),
        )
    }

    fn build(
        base_url: &str,
        model: &str,
        temperature: f64,
        seed: Option<u64>,
        timeout_secs: Option<u64>,
        json_format: bool,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| TaggerError::ConfigError {
            message: format!("cannot build HTTP client: {}", e),
        })?;

        let endpoint = format!("{}/api/chat", base_url.trim_end_matches('/'));
        tracing::info!("✓ Initialized Ollama client with model '{}' at {}", model, base_url);

        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            temperature,
            seed,
            json_format,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl InferenceService for OllamaClient {
    async fn complete(&self, prompt: &str) -> std::result::Result<RawModelResponse, InferenceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            format: self.json_format.then_some("json"),
            options: ChatOptions {
                temperature: self.temperature,
                seed: self.seed,
            },
        };

        tracing::debug!("Making inference request to: {}", self.endpoint);
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        tracing::debug!("Inference response status: {}", status);

        let text = response.text().await?;

        if !status.is_success() {
            // Ollama 的錯誤訊息放在 {"error": "..."}
            let body = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse =
            serde_json::from_str(&text).map_err(|e| InferenceError::MalformedReply {
                message: e.to_string(),
            })?;

        match (reply.message, reply.error) {
            (_, Some(error)) => Err(InferenceError::MalformedReply { message: error }),
            (Some(message), None) => Ok(RawModelResponse::Text(message.content)),
            (None, None) => Err(InferenceError::MalformedReply {
                message: "reply has no message".to_string(),
            }),
        }
    }
}
