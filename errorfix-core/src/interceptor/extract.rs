//! Canonical text extraction.
//!
//! Callers nest the error text at different places: the chat webhook posts an
//! event envelope, API clients post a flat object, some tools post the bare
//! text. Extraction walks a fixed priority list of named extractors and keeps
//! the first non-empty hit. Structured sources are trusted over generic ones,
//! and the raw body is the last resort for callers that post bare text.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use serde_json::{Map, Value};

/// Header the chat platform attaches to webhook deliveries.
pub const EVENT_HEADER: &str = "x-telex-event";

/// Which kind of caller sent the request. Decides the response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Chat/webhook consumer: wants a human-readable plain-text reply.
    Conversational,
    /// Programmatic caller: wants a JSON object and meaningful status codes.
    Direct,
}

impl Channel {
    pub fn is_conversational(self) -> bool {
        matches!(self, Channel::Conversational)
    }
}

/// Read-only view of an inbound request.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    payload: Map<String, Value>,
    raw_body: String,
    /// Body parsed as a JSON object; its raw text is then not a candidate.
    structured: bool,
    headers: HeaderMap,
}

impl IncomingRequest {
    /// Builds a request view from transport parts.
    ///
    /// A JSON object or form-encoded body becomes the payload; query
    /// parameters fill in keys the body does not set. Other bodies only feed
    /// the raw-body fallback.
    pub fn new(headers: HeaderMap, query: HashMap<String, String>, body: &[u8]) -> Self {
        let raw_body = String::from_utf8_lossy(body).into_owned();

        let (mut payload, structured) = if is_form_encoded(&headers) {
            match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
                Ok(pairs) => (form_payload(pairs), true),
                Err(_) => (Map::new(), false),
            }
        } else {
            match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(map)) => (map, true),
                _ => (Map::new(), false),
            }
        };
        for (key, value) in query {
            payload.entry(key).or_insert(Value::String(value));
        }

        Self {
            payload,
            raw_body,
            structured,
            headers,
        }
    }

    pub fn from_json(value: Value) -> Self {
        let raw_body = value.to_string();
        let (payload, structured) = match value {
            Value::Object(map) => (map, true),
            _ => (Map::new(), false),
        };
        Self {
            payload,
            raw_body,
            structured,
            headers: HeaderMap::new(),
        }
    }

    pub fn from_raw_body(body: &str) -> Self {
        Self::new(HeaderMap::new(), HashMap::new(), body.as_bytes())
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Follows `path` through nested objects and returns the leaf as text.
    fn text_at(&self, path: &[&str]) -> Option<String> {
        let (first, rest) = path.split_first()?;
        let mut node = self.payload.get(*first)?;
        for key in rest {
            node = node.get(*key)?;
        }
        value_as_text(node)
    }
}

/// Result of extraction: the canonical text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedInput {
    pub text: String,
    pub source: &'static str,
    pub channel: Channel,
}

type Extractor = fn(&IncomingRequest) -> Option<String>;

fn event_message_text(req: &IncomingRequest) -> Option<String> {
    req.text_at(&["event", "message", "text"])
}

fn event_text(req: &IncomingRequest) -> Option<String> {
    req.text_at(&["event", "text"])
}

fn plain_text(req: &IncomingRequest) -> Option<String> {
    req.text_at(&["text"])
}

fn error_field(req: &IncomingRequest) -> Option<String> {
    req.text_at(&["error"])
}

fn message_field(req: &IncomingRequest) -> Option<String> {
    req.text_at(&["message"])
}

fn raw_body(req: &IncomingRequest) -> Option<String> {
    if req.structured {
        return None;
    }
    non_empty(req.raw_body.trim())
}

/// Priority order, most specific first.
const EXTRACTORS: [(&str, Extractor); 6] = [
    ("event.message.text", event_message_text),
    ("event.text", event_text),
    ("text", plain_text),
    ("error", error_field),
    ("message", message_field),
    ("body", raw_body),
];

pub struct TextExtractor;

impl TextExtractor {
    /// Returns the first non-empty candidate, trimmed. An empty `text` with
    /// source `"none"` means nothing usable was sent.
    pub fn extract(req: &IncomingRequest) -> ExtractedInput {
        let channel = Self::channel(req);

        for (source, extractor) in EXTRACTORS {
            if let Some(text) = extractor(req) {
                return ExtractedInput {
                    text,
                    source,
                    channel,
                };
            }
        }

        ExtractedInput {
            text: String::new(),
            source: "none",
            channel,
        }
    }

    /// Webhook deliveries carry the event header or an `event` envelope.
    pub fn channel(req: &IncomingRequest) -> Channel {
        if req.headers.contains_key(EVENT_HEADER) || req.payload.contains_key("event") {
            Channel::Conversational
        } else {
            Channel::Direct
        }
    }
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("application/x-www-form-urlencoded"))
}

/// First occurrence of a repeated key wins.
fn form_payload(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut payload = Map::new();
    for (key, value) in pairs {
        payload.entry(key).or_insert(Value::String(value));
    }
    payload
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s.trim()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn nested_event_message_wins_over_everything() {
        let req = IncomingRequest::from_json(json!({
            "event": { "message": { "text": "  NameError: x  " }, "text": "flat" },
            "text": "generic",
            "error": "err",
        }));
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "NameError: x");
        assert_eq!(out.source, "event.message.text");
        assert_eq!(out.channel, Channel::Conversational);
    }

    #[test]
    fn flat_event_text_is_second() {
        let req = IncomingRequest::from_json(json!({
            "event": { "text": "segfault" },
            "message": "other",
        }));
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "segfault");
        assert_eq!(out.source, "event.text");
    }

    #[test]
    fn generic_fields_follow_priority() {
        let req = IncomingRequest::from_json(json!({ "error": "E1", "message": "M1" }));
        assert_eq!(TextExtractor::extract(&req).source, "error");

        let req = IncomingRequest::from_json(json!({ "message": "M1" }));
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "M1");
        assert_eq!(out.channel, Channel::Direct);
    }

    #[test]
    fn blank_candidates_are_skipped() {
        let req = IncomingRequest::from_json(json!({ "text": "   ", "error": "real one" }));
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "real one");
        assert_eq!(out.source, "error");
    }

    #[test]
    fn non_json_body_falls_back_to_raw_text() {
        let req = IncomingRequest::from_raw_body("\n  Fatal error: Allowed memory size exhausted \n");
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "Fatal error: Allowed memory size exhausted");
        assert_eq!(out.source, "body");
        assert_eq!(out.channel, Channel::Direct);
    }

    #[test]
    fn json_object_without_known_fields_extracts_nothing() {
        let req = IncomingRequest::from_json(json!({ "stack": "trace" }));
        let out = TextExtractor::extract(&req);
        assert_eq!(out.source, "none");
        assert_eq!(out.text, "");
    }

    #[test]
    fn blank_chat_message_does_not_fall_back_to_envelope_text() {
        let req = IncomingRequest::from_json(json!({ "event": { "message": { "text": "  " } } }));
        assert_eq!(TextExtractor::extract(&req).text, "");
    }

    #[test]
    fn empty_request_extracts_nothing() {
        let out = TextExtractor::extract(&IncomingRequest::from_raw_body("   "));
        assert_eq!(out.text, "");
        assert_eq!(out.source, "none");
    }

    #[test]
    fn numbers_are_accepted_and_objects_are_not() {
        let req = IncomingRequest::from_json(json!({ "text": { "nested": true }, "error": 404 }));
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "404");
        assert_eq!(out.source, "error");
    }

    #[test]
    fn query_parameters_fill_missing_keys_only() {
        let mut query = HashMap::new();
        query.insert("text".to_string(), "from query".to_string());
        query.insert("error".to_string(), "query error".to_string());

        let req = IncomingRequest::new(HeaderMap::new(), query, br#"{"error":"body error"}"#);
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "from query");

        let mut query = HashMap::new();
        query.insert("error".to_string(), "query error".to_string());
        let req = IncomingRequest::new(HeaderMap::new(), query, br#"{"error":"body error"}"#);
        assert_eq!(TextExtractor::extract(&req).text, "body error");
    }

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        headers
    }

    #[test]
    fn form_body_fields_are_decoded() {
        let req = IncomingRequest::new(
            form_headers(),
            HashMap::new(),
            b"text=NameError%3A+name+%27x%27+is+not+defined",
        );
        let out = TextExtractor::extract(&req);
        assert_eq!(out.text, "NameError: name 'x' is not defined");
        assert_eq!(out.source, "text");
        assert_eq!(out.channel, Channel::Direct);
    }

    #[test]
    fn form_body_keys_win_over_query() {
        let mut query = HashMap::new();
        query.insert("error".to_string(), "query error".to_string());
        query.insert("message".to_string(), "query message".to_string());

        let req = IncomingRequest::new(form_headers(), query, b"error=form+error");
        assert_eq!(TextExtractor::extract(&req).text, "form error");

        let req = IncomingRequest::new(form_headers(), HashMap::new(), b"other=1");
        let out = TextExtractor::extract(&req);
        assert_eq!(out.source, "none");
    }

    #[test]
    fn event_header_marks_conversational_channel() {
        let mut headers = HeaderMap::new();
        headers.insert(EVENT_HEADER, HeaderValue::from_static("message"));
        let req = IncomingRequest::from_json(json!({ "text": "panic at main.rs:3" }))
            .with_headers(headers);
        assert_eq!(TextExtractor::channel(&req), Channel::Conversational);
    }

    #[test]
    fn event_envelope_without_text_is_still_conversational() {
        let req = IncomingRequest::from_json(json!({ "event": {} }));
        let out = TextExtractor::extract(&req);
        assert!(out.channel.is_conversational());
        assert_eq!(out.source, "none");
    }
}
