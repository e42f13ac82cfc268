// Model Gateway
// Issues one completion request to a local-chat (Ollama) or OpenAI-compatible endpoint

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use super::config_store::{AppConfig, Dialect};

const SAMPLING_TEMPERATURE: f64 = 0.3;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Could not connect to model endpoint at {endpoint}. Is the model server running?")]
    Connect { endpoint: String },
    #[error("Model endpoint {endpoint} did not answer within {secs}s")]
    Timeout { endpoint: String, secs: u64 },
    #[error("Model API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Unreadable response envelope from model endpoint: {0}")]
    InvalidEnvelope(String),
    #[error("Model produced no content. The model server may not be running or the model may not be available.")]
    EmptyReply,
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct LocalChatOptions {
    temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
struct LocalChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: LocalChatOptions,
}

#[derive(Debug, Clone, Deserialize)]
struct LocalChatResponse {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    choices: Option<Vec<CompletionChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ModelGateway {
    client: Client,
    api_base: String,
    endpoint: String,
    model: String,
    dialect: Dialect,
    timeout_secs: u64,
}

impl ModelGateway {
    pub fn new(config: &AppConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            endpoint: config.endpoint_url(),
            model: config.model_name.clone(),
            dialect: config.dialect,
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    /// Returns the reply text. Missing or blank content is an error, never "no issues".
    pub async fn complete(&self, system: &str, user: &str) -> Result<ChatResult, ProviderError> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user.to_string(),
            },
        ];

        let start = Instant::now();
        let content = match self.dialect {
            Dialect::LocalChat => self.call_local_chat(messages).await,
            Dialect::OpenAiCompatible => self.call_openai_compatible(messages).await,
        };
        let latency_ms = start.elapsed().as_millis() as i64;

        let content = match content {
            Ok(Some(c)) if !c.trim().is_empty() => c,
            Ok(_) => {
                warn!(
                    "[GATEWAY] empty reply dialect={} model={} latency_ms={}",
                    self.dialect.as_str(),
                    self.model,
                    latency_ms
                );
                return Err(ProviderError::EmptyReply);
            }
            Err(e) => {
                warn!(
                    "[GATEWAY] call failed dialect={} model={} latency_ms={} : {}",
                    self.dialect.as_str(),
                    self.model,
                    latency_ms,
                    e
                );
                return Err(e);
            }
        };

        info!(
            "[GATEWAY] ok dialect={} model={} latency_ms={} reply_chars={}",
            self.dialect.as_str(),
            self.model,
            latency_ms,
            content.chars().count()
        );

        Ok(ChatResult {
            content,
            latency_ms,
        })
    }

    async fn call_local_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<Option<String>, ProviderError> {
        let request = LocalChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            options: LocalChatOptions {
                temperature: SAMPLING_TEMPERATURE,
            },
        };

        let response = self.post_json(&request).await?;
        let data: LocalChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidEnvelope(e.to_string()))?;

        Ok(data.message.and_then(|m| m.content))
    }

    async fn call_openai_compatible(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<Option<String>, ProviderError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: SAMPLING_TEMPERATURE,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
        };

        let response = self.post_json(&request).await?;
        let data: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidEnvelope(e.to_string()))?;

        Ok(data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content))
    }

    async fn post_json<T: Serialize>(&self, body: &T) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }

    fn classify(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                endpoint: self.endpoint(),
                secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            ProviderError::Connect {
                endpoint: self.api_base.clone(),
            }
        } else {
            ProviderError::HttpError(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        local_chat_stub, openai_stub, refused_base, serve, status_stub,
    };
    use axum::routing::post;
    use axum::Router;

    fn config_for(base: &str, dialect: Dialect) -> AppConfig {
        AppConfig {
            api_base: base.to_string(),
            dialect,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_endpoint_per_dialect() {
        let local = ModelGateway::new(&config_for("http://localhost:11434/", Dialect::LocalChat))
            .unwrap();
        assert_eq!(local.endpoint(), "http://localhost:11434/api/chat");

        let openai =
            ModelGateway::new(&config_for("http://localhost:8080", Dialect::OpenAiCompatible))
                .unwrap();
        assert_eq!(openai.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_local_chat_reply() {
        let base = local_chat_stub(r#"{"has_fallacies": false, "fallacies": []}"#).await;
        let gateway = ModelGateway::new(&config_for(&base, Dialect::LocalChat)).unwrap();

        let result = gateway.complete("system", "user").await.unwrap();
        assert_eq!(result.content, r#"{"has_fallacies": false, "fallacies": []}"#);
    }

    #[tokio::test]
    async fn test_openai_compatible_reply() {
        let base = openai_stub(r#"{"has_fallacies": false}"#).await;
        let gateway = ModelGateway::new(&config_for(&base, Dialect::OpenAiCompatible)).unwrap();

        let result = gateway.complete("system", "user").await.unwrap();
        assert_eq!(result.content, r#"{"has_fallacies": false}"#);
    }

    #[tokio::test]
    async fn test_status_error_echoes_body() {
        let base = status_stub(500, "model 'llama3.2' not found").await;
        let gateway = ModelGateway::new(&config_for(&base, Dialect::LocalChat)).unwrap();

        match gateway.complete("system", "user").await {
            Err(ProviderError::ApiError { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.contains("not found"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_reply_is_error() {
        let base = local_chat_stub("   \n").await;
        let gateway = ModelGateway::new(&config_for(&base, Dialect::LocalChat)).unwrap();
        assert!(matches!(
            gateway.complete("system", "user").await,
            Err(ProviderError::EmptyReply)
        ));

        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { axum::Json(serde_json::json!({"choices": []})) }),
        );
        let base = serve(router).await;
        let gateway = ModelGateway::new(&config_for(&base, Dialect::OpenAiCompatible)).unwrap();
        assert!(matches!(
            gateway.complete("system", "user").await,
            Err(ProviderError::EmptyReply)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_names_endpoint() {
        let base = refused_base().await;
        let gateway = ModelGateway::new(&config_for(&base, Dialect::LocalChat)).unwrap();

        let err = gateway.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, ProviderError::Connect { .. }));
        assert!(err.to_string().contains(&base));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;
        let config = AppConfig {
            request_timeout_secs: 1,
            ..config_for(&base, Dialect::LocalChat)
        };
        let gateway = ModelGateway::new(&config).unwrap();

        match gateway.complete("system", "user").await {
            Err(ProviderError::Timeout { secs, endpoint }) => {
                assert_eq!(secs, 1);
                assert!(endpoint.ends_with("/api/chat"));
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }
}
