use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use ureq::Agent;

use crate::config::Config;

/// Failure talking to the language model. Never recovered by the pipeline;
/// the caller decides whether to retry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("request to language model failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("language model returned no text")]
    EmptyCompletion,
}

/// A black-box text completion service: one prompt in, one completion out.
pub trait CompletionModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, TransportError>;
}

// ---------------------------------------------------------------------------
// Gemini generateContent over HTTP
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    agent: Agent,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        GeminiClient {
            agent,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl CompletionModel for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String, TransportError> {
        let api_key = self.api_key.as_deref().ok_or(TransportError::MissingApiKey)?;
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        debug!("Calling {} ({} prompt bytes)", self.url(), prompt.len());
        let mut response = self
            .agent
            .post(&self.url())
            .header("x-goog-api-key", api_key)
            .send_json(&body)?;
        let reply: GenerateResponse = response.body_mut().read_json()?;

        completion_text(reply).ok_or(TransportError::EmptyCompletion)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Text of the first candidate, all parts concatenated.
fn completion_text(reply: GenerateResponse) -> Option<String> {
    let content = reply.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::Mutex;

    use super::{CompletionModel, TransportError};

    /// Fixed-response model that records every prompt it was given.
    pub struct StubModel {
        reply: String,
        pub seen: Mutex<Vec<String>>,
    }

    impl StubModel {
        pub fn new(reply: &str) -> Self {
            StubModel {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionModel for StubModel {
        fn complete(&self, prompt: &str) -> Result<String, TransportError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }
}
