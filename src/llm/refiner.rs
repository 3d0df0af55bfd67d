//! LLM text refiner over a local OpenAI-compatible endpoint.
//!
//! The refiner is a post-processor, never a generator: its fixed system
//! prompt orders the model to output only cleaned transcription text, and
//! every response runs through the sanitation and answer-drift guards in
//! [`crate::llm::guard`] before it is allowed to replace the deterministic
//! clean.  A rejected response yields an empty string and the pipeline
//! keeps what it had.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RefinerConfig;
use crate::llm::guard::{
    is_answer_like, max_output_tokens, sanitize_output, select_vocab_hints, MAX_VOCAB_HINTS,
};

// ---------------------------------------------------------------------------
// RefinerError
// ---------------------------------------------------------------------------

/// Errors from the refinement call.  All of them are recoverable: the
/// pipeline keeps the deterministic clean.
#[derive(Debug, Error)]
pub enum RefinerError {
    /// HTTP transport or connection error (endpoint down, model still
    /// downloading, ...).
    #[error("refiner request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("refiner request timed out")]
    Timeout,

    /// The response could not be parsed as the expected JSON.
    #[error("failed to parse refiner response: {0}")]
    Parse(String),

    /// The model returned no usable text content.
    #[error("refiner returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for RefinerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RefinerError::Timeout
        } else {
            RefinerError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// RefinerBackend trait
// ---------------------------------------------------------------------------

/// The raw chat call, separated from the guard logic so tests can script
/// model output.
#[async_trait]
pub trait RefinerBackend: Send + Sync {
    async fn rewrite(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, RefinerError>;
}

// ---------------------------------------------------------------------------
// ApiRefiner
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint — Ollama in
/// its default configuration, or anything else that speaks the same wire
/// format on localhost.
pub struct ApiRefiner {
    client: reqwest::Client,
    config: RefinerConfig,
}

impl ApiRefiner {
    pub fn from_config(config: &RefinerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl RefinerBackend for ApiRefiner {
    async fn rewrite(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, RefinerError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user",   "content": user   }
            ],
            "stream": false,
            "temperature": 0.0,
            "max_tokens": max_tokens
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RefinerError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(RefinerError::EmptyResponse)?
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(RefinerError::EmptyResponse);
        }
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// TextRefiner
// ---------------------------------------------------------------------------

/// System prompt template; the vocabulary block is filled per call.
const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are a speech-to-text post-processor.
Output only cleaned transcription text.
Never answer, explain, summarize, or add content.
Keep all intended details and preserve full meaning.
Keep question intent as a question.
Handle self-corrections conservatively (replace only corrected phrase).
Remove filler words and false starts when clearly disfluent.
Use vocabulary corrections when relevant:
";

fn build_system_prompt(hints: &[(String, String)]) -> String {
    let vocab_lines = if hints.is_empty() {
        "  (none)".to_string()
    } else {
        hints
            .iter()
            .map(|(wrong, right)| format!("  \"{wrong}\" -> \"{right}\""))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("{SYSTEM_PROMPT_TEMPLATE}{vocab_lines}")
}

/// Guarded refiner: backend call plus sanitation and answer-drift checks.
///
/// [`refine`](Self::refine) returns `Ok("")` when the model output was
/// rejected — callers keep their deterministic clean in that case.
pub struct TextRefiner {
    backend: Box<dyn RefinerBackend>,
}

impl TextRefiner {
    pub fn from_config(config: &RefinerConfig) -> Self {
        Self {
            backend: Box::new(ApiRefiner::from_config(config)),
        }
    }

    pub fn with_backend(backend: Box<dyn RefinerBackend>) -> Self {
        Self { backend }
    }

    pub async fn refine(
        &self,
        text: &str,
        vocabulary: &HashMap<String, String>,
    ) -> Result<String, RefinerError> {
        let hints = select_vocab_hints(text, vocabulary, MAX_VOCAB_HINTS);
        let system = build_system_prompt(&hints);
        let max_tokens = max_output_tokens(text);

        let raw = self.backend.rewrite(&system, text, max_tokens).await?;

        let candidate = sanitize_output(&raw);
        if candidate.is_empty() {
            log::warn!("Refiner output rejected as prompt/meta leakage");
            return Ok(String::new());
        }
        if is_answer_like(text, &candidate) {
            log::warn!("Rejected refinement that changed intent or looked like an answer");
            return Ok(String::new());
        }
        Ok(candidate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedBackend(String);

    #[async_trait]
    impl RefinerBackend for ScriptedBackend {
        async fn rewrite(&self, _s: &str, _u: &str, _m: u32) -> Result<String, RefinerError> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl RefinerBackend for FailingBackend {
        async fn rewrite(&self, _s: &str, _u: &str, _m: u32) -> Result<String, RefinerError> {
            Err(RefinerError::Request("connection refused".into()))
        }
    }

    fn refiner(output: &str) -> TextRefiner {
        TextRefiner::with_backend(Box::new(ScriptedBackend(output.into())))
    }

    #[tokio::test]
    async fn clean_rewrite_is_accepted() {
        let out = refiner("Please update the parser module.")
            .refine("please update the parser module", &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, "Please update the parser module.");
    }

    #[tokio::test]
    async fn answer_like_rewrite_is_rejected() {
        let out = refiner("Polymorphism lets objects take many forms.")
            .refine("what is polymorphism in oop", &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn leaked_prompt_is_rejected() {
        let out = refiner("You are a speech-to-text post-processor.")
            .refine("update the parser module please", &HashMap::new())
            .await
            .unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let refiner = TextRefiner::with_backend(Box::new(FailingBackend));
        let err = refiner
            .refine("update the parser", &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RefinerError::Request(_)));
    }

    #[test]
    fn system_prompt_lists_hints_or_none() {
        let with = build_system_prompt(&[("plate js".into(), "Plate.js".into())]);
        assert!(with.contains("\"plate js\" -> \"Plate.js\""));
        assert!(with.contains("Never answer, explain, summarize"));

        let without = build_system_prompt(&[]);
        assert!(without.contains("(none)"));
    }

    #[test]
    fn reqwest_timeout_maps_to_timeout_variant() {
        // Compile-time presence check for the From impl; constructing a real
        // reqwest timeout error requires I/O, so only the shape is asserted.
        fn assert_from<E: Into<RefinerError>>() {}
        assert_from::<reqwest::Error>();
    }
}
