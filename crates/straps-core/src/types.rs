//! Core types for straps
//!
//! Transcript messages and session configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use straps_engine::{EngineConfig, ModifyStrategy, MultiMatch};

use crate::error::ConfigError;

/// Speaker of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One transcript message; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Create message
    #[inline]
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// System instruction
    #[inline]
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// User turn (command results)
    #[inline]
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant turn (model output)
    #[inline]
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Speaker
    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Text
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Append-only conversation history, resent in full on every query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create empty transcript
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Messages in conversation order
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Message count
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FromIterator<Message> for Transcript {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

/// Sampling parameters sent with every query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Stop sequences
    pub stop: Vec<String>,
}

/// Default preamble of the system instruction
pub const DEFAULT_PERSONA: &str = "You are a senior programmer with a lot of expertise in Python \
and you are tasked to read, understand and then modify the source code of a Python program.";

/// Session configuration
///
/// Loaded from TOML; every field has a default so partial files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrapsConfig {
    /// Model identifier
    pub model: String,
    /// Chat-completions endpoint
    pub api_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Reply length limit
    pub max_tokens: u32,
    /// Stop sequences
    pub stop: Vec<String>,
    /// Per-request timeout
    pub request_timeout_secs: Option<u64>,
    /// Model turns before the session is cut off
    pub max_turns: Option<usize>,
    /// How `modify` interprets its payload
    pub strategy: ModifyStrategy,
    /// Multi-match policy for `modify`
    pub multi_match: MultiMatch,
    /// Patch fuzz
    pub fuzz: u32,
    /// Patch program
    pub patch_program: String,
    /// Where generations are written (default: next to the source)
    pub output_dir: Option<PathBuf>,
    /// Preamble of the system instruction
    pub persona: String,
}

impl StrapsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Toml`] on syntax errors or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With model identifier
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With modify strategy
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: ModifyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// With turn limit
    #[inline]
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// With output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Engine settings derived from this configuration
    #[inline]
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_strategy(self.strategy)
            .with_multi_match(self.multi_match)
            .with_fuzz(self.fuzz)
    }

    /// Sampling parameters derived from this configuration
    #[inline]
    #[must_use]
    pub fn query_params(&self) -> QueryParams {
        QueryParams {
            temperature: self.temperature,
            stop: self.stop.clone(),
        }
    }

    /// Request timeout, if any
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for StrapsConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4-1106-preview".to_string(),
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 1.0,
            max_tokens: 2048,
            stop: Vec::new(),
            request_timeout_secs: None,
            max_turns: None,
            strategy: ModifyStrategy::Replace,
            multi_match: MultiMatch::Reject,
            fuzz: 3,
            patch_program: "patch".to_string(),
            output_dir: None,
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_lowercase_role() {
        let json = serde_json::to_string(&Message::assistant("list")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"list"}"#);
    }

    #[test]
    fn transcript_serializes_as_array() {
        let transcript: Transcript = [Message::system("s"), Message::user("u")]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[1]["role"], "user");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = StrapsConfig::from_toml_str(
            r#"
            model = "local-model"
            strategy = "patch"
            multi_match = "replace-all"
            max_turns = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.model, "local-model");
        assert_eq!(config.strategy, ModifyStrategy::Patch);
        assert_eq!(config.multi_match, MultiMatch::ReplaceAll);
        assert_eq!(config.max_turns, Some(20));
        assert_eq!(config.fuzz, 3);
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(StrapsConfig::from_toml_str("colour = \"blue\"").is_err());
    }

    #[test]
    fn builders_feed_engine_config() {
        let config = StrapsConfig::new()
            .with_strategy(ModifyStrategy::Patch)
            .with_timeout_secs(30);
        assert_eq!(config.engine_config().strategy, ModifyStrategy::Patch);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }
}
