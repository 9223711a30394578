//! Outbound completion call.
//!
//! The gateway owns the prompt policy (token guard, fixed instruction, minimum
//! answer length) and delegates transport to a [`CompletionBackend`]. Exactly
//! one backend call is made per request; there is no retry.

pub mod gemini;
pub mod prompt;

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FixError;
pub use gemini::{interpret_reply, GeminiBackend, GeminiConfig};
pub use prompt::{build_prompt, TokenGuard, TRUNCATION_MARKER};

/// Replies shorter than this are treated as cut off.
pub const MIN_ANSWER_CHARS: usize = 20;

/// Transport to a text-completion service.
///
/// Implementations return the service's literal text, or one of
/// `ServiceUnavailable`, `UpstreamError`, `IncompleteAnswer`.
#[async_trait]
pub trait CompletionBackend: Send + Sync + 'static {
    async fn generate(&self, prompt: &str) -> Result<String, FixError>;
}

#[derive(Clone)]
pub struct CompletionGateway {
    backend: Arc<dyn CompletionBackend>,
    guard: TokenGuard,
}

impl CompletionGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>, guard: TokenGuard) -> Self {
        Self { backend, guard }
    }

    /// Builds the prompt for `text`, calls the backend once, and returns the
    /// raw, unparsed reply.
    pub async fn complete(&self, text: &str) -> Result<String, FixError> {
        let fitted = self.guard.fit(text);
        if matches!(fitted, Cow::Owned(_)) {
            debug!(
                event = "prompt_truncated",
                estimated_tokens = self.guard.estimate_tokens(text),
                kept_words = self.guard.max_words(),
            );
        }

        let prompt = build_prompt(&fitted);
        let raw = self.backend.generate(&prompt).await?;

        let chars = raw.trim().chars().count();
        if chars < MIN_ANSWER_CHARS {
            warn!(event = "completion_too_short", chars);
            return Err(FixError::IncompleteAnswer);
        }

        Ok(raw)
    }
}

impl std::fmt::Debug for CompletionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGateway")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every prompt and answers with a canned result.
    struct Recording {
        reply: Result<String, FixError>,
        prompts: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(reply: Result<String, FixError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for Recording {
        async fn generate(&self, prompt: &str) -> Result<String, FixError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn gateway(backend: Arc<Recording>) -> CompletionGateway {
        CompletionGateway::new(backend, TokenGuard::default())
    }

    #[tokio::test]
    async fn empty_reply_is_incomplete() {
        let backend = Recording::new(Ok(String::new()));
        let err = gateway(backend).complete("KeyError: 'id'").await.unwrap_err();
        assert_eq!(err, FixError::IncompleteAnswer);
    }

    #[tokio::test]
    async fn reply_under_twenty_chars_is_incomplete() {
        let backend = Recording::new(Ok("{\"language\":\"Go\"}".to_string()));
        let err = gateway(backend).complete("panic: nil map").await.unwrap_err();
        assert_eq!(err, FixError::IncompleteAnswer);
    }

    #[tokio::test]
    async fn raw_reply_is_returned_unparsed() {
        let raw = "```json\n{\"language\":\"Python\",\"error_type\":\"KeyError\"}\n```";
        let backend = Recording::new(Ok(raw.to_string()));
        let out = gateway(backend.clone()).complete("KeyError: 'id'").await.unwrap();
        assert_eq!(out, raw);

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("KeyError: 'id'"));
    }

    #[tokio::test]
    async fn backend_errors_pass_through() {
        let backend = Recording::new(Err(FixError::UpstreamError(503)));
        let err = gateway(backend).complete("segfault").await.unwrap_err();
        assert_eq!(err, FixError::UpstreamError(503));
    }

    #[tokio::test]
    async fn oversized_text_reaches_backend_truncated() {
        let backend = Recording::new(Ok("x".repeat(40)));
        let text = vec!["frame"; 2500].join(" ");
        gateway(backend.clone()).complete(&text).await.unwrap();

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].ends_with(TRUNCATION_MARKER));
    }
}
