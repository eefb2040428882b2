//! Model collaborator
//!
//! [`ModelClient`] is the seam between the conversation driver and the
//! language model. [`OpenAiClient`] speaks the chat-completions protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::types::{Message, QueryParams, Role, StrapsConfig, Transcript};

/// A language model that answers a transcript with one assistant message
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the full transcript and wait for the reply
    ///
    /// # Errors
    /// Any [`ModelError`]; the driver treats all of them as fatal
    async fn query(
        &self,
        transcript: &Transcript,
        params: &QueryParams,
    ) -> Result<Message, ModelError>;
}

#[async_trait]
impl<M: ModelClient + ?Sized> ModelClient for &M {
    async fn query(
        &self,
        transcript: &Transcript,
        params: &QueryParams,
    ) -> Result<Message, ModelError> {
        (**self).query(transcript, params).await
    }
}

#[async_trait]
impl<M: ModelClient + ?Sized> ModelClient for Box<M> {
    async fn query(
        &self,
        transcript: &Transcript,
        params: &QueryParams,
    ) -> Result<Message, ModelError> {
        (**self).query(transcript, params).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a Transcript,
    temperature: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default = "assistant_role")]
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

fn assistant_role() -> Role {
    Role::Assistant
}

/// Chat-completions client over HTTP
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Create client with an explicit key
    #[must_use]
    pub fn new(api_key: impl Into<String>, config: &StrapsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Create client, reading the key from the configured environment variable
    ///
    /// # Errors
    /// [`ModelError::CredentialMissing`] if the variable is unset or blank
    pub fn from_config(config: &StrapsConfig) -> Result<Self, ModelError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::CredentialMissing {
                var: config.api_key_env.clone(),
            })?;
        Ok(Self::new(api_key, config))
    }

    /// Model identifier sent with each request
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn query(
        &self,
        transcript: &Transcript,
        params: &QueryParams,
    ) -> Result<Message, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: transcript,
            temperature: params.temperature,
            stop: &params.stop,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, messages = transcript.len(), "querying model");

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;

        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::MalformedResponse("no choices in reply".to_string()))?;

        Ok(Message::new(
            choice.message.role,
            choice.message.content.unwrap_or_default(),
        ))
    }
}

/// Drop every line that opens or closes a markdown code fence
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fences_are_removed() {
        let reply = "create f\n```python\ndef f():\n    return 1\n```";
        assert_eq!(strip_code_fences(reply), "create f\ndef f():\n    return 1");
    }

    #[test]
    fn indented_backticks_survive() {
        assert_eq!(strip_code_fences("list\n  ```"), "list\n  ```");
    }

    #[test]
    fn request_shape() {
        let transcript: Transcript = [Message::system("s"), Message::assistant("list")]
            .into_iter()
            .collect();
        let request = ChatRequest {
            model: "m",
            messages: &transcript,
            temperature: 1.0,
            stop: &[],
            max_tokens: 2048,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][1]["content"], "list");
        assert_eq!(json["max_tokens"], 2048);
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn response_shape() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"list"}}]}"#;
        let reply: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(reply.choices[0].message.content.as_deref(), Some("list"));
        assert_eq!(reply.choices[0].message.role, Role::Assistant);
    }

    #[test]
    fn missing_credential_is_reported() {
        let config = StrapsConfig {
            api_key_env: "STRAPS_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..StrapsConfig::default()
        };
        let err = OpenAiClient::from_config(&config).unwrap_err();
        assert!(err.is_credential());
    }
}
