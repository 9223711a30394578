use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::decoder::AnalysisRecord;
use crate::error::{ErrorClass, FixError};
use crate::interceptor::extract::Channel;
use crate::interceptor::normalization::Normalizer;

pub const GREETING_REPLY: &str = "👋 Hello! I am *ErrorFixer*.

Send me *any code error* and I will:
• Detect the language
• Identify the error
• Explain the cause
• Provide the correct fix

Example:
```
PHP Fatal error: Call to undefined method User::fullname()
```";

/// How a request ended, independent of who asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Analysis(AnalysisRecord),
    Greeting,
    Failed(FixError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResponse {
    pub status: StatusCode,
    pub body: Body,
}

impl RenderedResponse {
    fn text(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            body: Body::Text(body),
        }
    }

    fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: Body::Json(body),
        }
    }
}

impl IntoResponse for RenderedResponse {
    fn into_response(self) -> Response {
        match self.body {
            Body::Text(text) => (
                self.status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                text,
            )
                .into_response(),
            Body::Json(value) => (self.status, Json(value)).into_response(),
        }
    }
}

pub struct ResponseRenderer;

impl ResponseRenderer {
    /// Conversational replies are always transport-level 200 so the chat
    /// platform shows the text instead of treating the call as failed.
    pub fn render(outcome: &Outcome, channel: Channel) -> RenderedResponse {
        match (outcome, channel) {
            (Outcome::Analysis(record), Channel::Conversational) => {
                RenderedResponse::text(analysis_text(record))
            }
            (Outcome::Analysis(record), Channel::Direct) => RenderedResponse::json(
                StatusCode::OK,
                serde_json::to_value(record).unwrap_or_else(|_| json!({})),
            ),
            (Outcome::Greeting, Channel::Conversational) => {
                RenderedResponse::text(GREETING_REPLY.to_string())
            }
            (Outcome::Greeting, Channel::Direct) => RenderedResponse::json(
                StatusCode::OK,
                json!({ "message": Normalizer::strip_tags(GREETING_REPLY) }),
            ),
            (Outcome::Failed(err), Channel::Conversational) => {
                RenderedResponse::text(apology(err).to_string())
            }
            (Outcome::Failed(err), Channel::Direct) => {
                RenderedResponse::json(status_for(err), json!({ "error": err.to_string() }))
            }
        }
    }
}

pub fn status_for(err: &FixError) -> StatusCode {
    match err.class() {
        ErrorClass::BadInput => StatusCode::BAD_REQUEST,
        ErrorClass::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::Upstream => StatusCode::BAD_GATEWAY,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn apology(err: &FixError) -> &'static str {
    match err {
        FixError::InputEmpty => "⚠️ Send me an error message to analyze.",
        FixError::InputMalicious => "❌ Unsafe code detected. Try again.",
        FixError::InputNonMeaningful => "⚠️ Please send a real error message.",
        FixError::ServiceUnavailable => {
            "❗ The analysis service is unreachable right now. Try again later."
        }
        FixError::UpstreamError(_) => "❗ The analysis service returned an error. Try again later.",
        FixError::IncompleteAnswer => {
            "❗ The analysis came back incomplete. Try a shorter error message."
        }
        FixError::UnparsableAnswer => "❗ I couldn't understand the error.",
        FixError::UnexpectedFault(_) => "❗ Server error. Try again later.",
    }
}

fn analysis_text(record: &AnalysisRecord) -> String {
    format!(
        "🧠 *Code Analysis*

🔹 Language: {}
🔹 Error Type: {}

💡 Cause:
{}

🔧 Fix:
{}

📌 Notes:
{}",
        record.language, record.error_type, record.cause, record.fix, record.notes
    )
}
