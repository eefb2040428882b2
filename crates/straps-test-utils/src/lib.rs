//! Testing utilities for straps workspace
//!
//! Shared test helpers, fixtures, and a scripted model client.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use straps_artifact::DeclarationStore;
use straps_core::{Message, ModelClient, ModelError, QueryParams, StrapsConfig, Transcript};
use tokio::sync::Mutex;

/// Small Python module used across tests
pub const SAMPLE_SOURCE: &str = r#"import sys

VERSION = "1.0"


def add(a, b):
    """Add two numbers."""
    return a + b


def main():
    print(add(1, 2))


if __name__ == "__main__":
    main()
"#;

/// Model that replays canned replies and records what it was sent
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    received: Mutex<Vec<Transcript>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            received: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Transcripts received so far, one per query
    pub async fn received(&self) -> Vec<Transcript> {
        self.received.lock().await.clone()
    }

    /// Replies not yet consumed
    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn query(
        &self,
        transcript: &Transcript,
        _params: &QueryParams,
    ) -> Result<Message, ModelError> {
        self.received.lock().await.push(transcript.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .await
            .pop_front()
            .map(Message::assistant)
            .ok_or_else(|| ModelError::Transport("script exhausted".to_string()))
    }
}

pub fn sample_store() -> DeclarationStore {
    DeclarationStore::parse(SAMPLE_SOURCE).unwrap()
}

/// Write [`SAMPLE_SOURCE`] as `base.py` in `dir`
pub fn write_sample(dir: &Path) -> PathBuf {
    let path = dir.join("base.py");
    std::fs::write(&path, SAMPLE_SOURCE).unwrap();
    path
}

/// Configuration for tests: no network, default engine settings
pub fn test_config() -> StrapsConfig {
    StrapsConfig {
        api_key_env: "STRAPS_TEST_API_KEY".to_string(),
        ..StrapsConfig::default()
    }
}
