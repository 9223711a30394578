use std::borrow::Cow;

pub const DEFAULT_TOKENS_PER_WORD: f32 = 1.5;
pub const DEFAULT_MAX_PROMPT_TOKENS: usize = 3000;
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Token-aware cut applied right before the prompt is built.
///
/// Word count and token cost diverge (stack traces are token-dense), so this
/// runs on top of the word bound with a rough tokens-per-word estimate.
#[derive(Debug, Clone, Copy)]
pub struct TokenGuard {
    tokens_per_word: f32,
    max_prompt_tokens: usize,
}

impl Default for TokenGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROMPT_TOKENS)
    }
}

impl TokenGuard {
    pub fn new(max_prompt_tokens: usize) -> Self {
        Self {
            tokens_per_word: DEFAULT_TOKENS_PER_WORD,
            max_prompt_tokens,
        }
    }

    pub fn estimate_tokens(&self, text: &str) -> f32 {
        text.split_whitespace().count() as f32 * self.tokens_per_word
    }

    pub fn max_words(&self) -> usize {
        (self.max_prompt_tokens as f32 / self.tokens_per_word).floor() as usize
    }

    /// Returns the text untouched when it fits, otherwise the first
    /// [`max_words`](Self::max_words) words followed by [`TRUNCATION_MARKER`].
    pub fn fit<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.estimate_tokens(text) <= self.max_prompt_tokens as f32 {
            return Cow::Borrowed(text);
        }
        let kept: Vec<&str> = text.split_whitespace().take(self.max_words()).collect();
        Cow::Owned(format!("{}{}", kept.join(" "), TRUNCATION_MARKER))
    }
}

/// The fixed instruction sent with every analysis request.
pub fn build_prompt(error_text: &str) -> String {
    format!(
        r#"You are a professional software engineer. Analyze the following code error.

1. Detect the programming language.
2. Detect the type of error (syntax, runtime, missing package, configuration, etc.).
3. Explain the cause in simple terms.
4. Provide a step-by-step guide to fix it.
5. Add short notes on how to prevent it.

Respond with ONLY one JSON object and nothing else: no prose, no markdown, no code fences.
Use exactly these keys, each with a string value:

{{"language": "...", "error_type": "...", "cause": "...", "fix": "1. ...\n2. ...", "notes": "..."}}

Error:
{error_text}"#
    )
}
