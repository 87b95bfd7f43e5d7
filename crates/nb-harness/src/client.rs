//! Claude Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::caller::TextGenerator;

/// Default model when `NB_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Default endpoint when `NB_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// API key (`ANTHROPIC_API_KEY`)
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Messages endpoint
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Optional system prompt sent with every request
    pub system: Option<String>,
}

impl ClaudeConfig {
    /// Config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(120),
            system: None,
        }
    }

    /// Read `ANTHROPIC_API_KEY`, `NB_MODEL` and `NB_API_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ClientError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("NB_MODEL") {
            config.model = model;
        }
        if let Ok(url) = std::env::var("NB_API_URL") {
            config.api_url = url;
        }
        Ok(config)
    }
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Thin client over the Messages endpoint.
pub struct ClaudeClient {
    http: reqwest::Client,
    config: ClaudeConfig,
}

impl ClaudeClient {
    /// Build a client.
    pub fn new(config: ClaudeConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Build a client from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClaudeConfig::from_env()?)
    }

    /// Current configuration.
    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }

    /// Send a conversation and return the concatenated text reply.
    pub async fn complete_with_system(
        &self,
        messages: &[Message],
        system: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ClientError> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens,
            system,
            messages,
        };

        let response = self
            .http
            .post(self.config.api_url.as_str())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_response_text(&body)
    }
}

#[async_trait]
impl TextGenerator for ClaudeClient {
    async fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, ClientError> {
        let messages = [Message::user(prompt)];
        self.complete_with_system(&messages, self.config.system.as_deref(), max_output_tokens)
            .await
    }
}

/// Concatenate every text block of a Messages response body.
fn parse_response_text(body: &str) -> Result<String, ClientError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| ClientError::Malformed(e.to_string()))?;

    let texts: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if texts.is_empty() {
        return Err(ClientError::Malformed("no text content in response".to_string()));
    }
    Ok(texts.join(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let messages = [Message::user("hi")];
        let request = MessagesRequest {
            model: "m",
            max_tokens: 64,
            system: None,
            messages: &messages,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_parse_response_text() {
        let body = r#"{"id":"msg_1","content":[{"type":"text","text":"a"},{"type":"tool_use","id":"t"},{"type":"text","text":"b"}]}"#;
        assert_eq!(parse_response_text(body).unwrap(), "ab");
    }

    #[test]
    fn test_parse_response_without_text() {
        let body = r#"{"content":[]}"#;
        assert!(matches!(parse_response_text(body), Err(ClientError::Malformed(_))));
        assert!(matches!(parse_response_text("not json"), Err(ClientError::Malformed(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config = ClaudeConfig::new("sk-test");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.system.is_none());
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("x").role, Role::User);
        assert_eq!(Message::assistant("y").role, Role::Assistant);
    }
}
