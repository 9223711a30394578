//! Request lifecycle:
//! `Received -> Extracted -> Classified -> {ShortCircuited | Bounded -> Sent -> Decoded} -> Rendered`.
//!
//! The pipeline is immutable after construction and shared across requests.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::manifest_loader::load_policy;
use crate::config::settings::Settings;
use crate::config::ConfigError;
use crate::decoder::ResponseDecoder;
use crate::error::FixError;
use crate::gateway::{CompletionBackend, CompletionGateway, TokenGuard};
use crate::interceptor::bounder::{word_count, InputBounder};
use crate::interceptor::classifier::{Classification, ContentPolicy, SafetyClassifier};
use crate::interceptor::extract::{Channel, IncomingRequest, TextExtractor};
use crate::render::{Outcome, RenderedResponse, ResponseRenderer};

#[derive(Debug, Clone)]
pub struct ErrorFixPipeline {
    classifier: SafetyClassifier,
    bounder: InputBounder,
    gateway: CompletionGateway,
}

/// Outcome of one request plus the channel it must be rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub channel: Channel,
    pub outcome: Outcome,
}

impl ErrorFixPipeline {
    pub fn new(
        classifier: SafetyClassifier,
        bounder: InputBounder,
        gateway: CompletionGateway,
    ) -> Self {
        Self {
            classifier,
            bounder,
            gateway,
        }
    }

    /// Wires the pipeline from loaded settings around an existing backend.
    pub fn from_settings(
        settings: &Settings,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, ConfigError> {
        let policy = match &settings.policy_path {
            Some(path) => load_policy(path)?,
            None => ContentPolicy::default(),
        };
        let gateway = CompletionGateway::new(backend, TokenGuard::new(settings.max_prompt_tokens));
        Ok(Self::new(
            SafetyClassifier::new(policy),
            InputBounder::new(settings.max_words),
            gateway,
        ))
    }

    pub async fn respond(&self, req: &IncomingRequest) -> RenderedResponse {
        let processed = self.process(req).await;
        ResponseRenderer::render(&processed.outcome, processed.channel)
    }

    pub async fn process(&self, req: &IncomingRequest) -> Processed {
        let span = info_span!("fix_request", request_id = %Uuid::new_v4());
        async {
            let extracted = TextExtractor::extract(req);
            debug!(
                event = "extracted",
                source = extracted.source,
                chars = extracted.text.chars().count(),
                conversational = extracted.channel.is_conversational(),
            );

            let outcome = self.evaluate(&extracted.text).await;
            info!(event = "rendered", outcome = outcome_label(&outcome));

            Processed {
                channel: extracted.channel,
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    /// Gates, bounds, sends and decodes one canonical input.
    pub async fn evaluate(&self, text: &str) -> Outcome {
        let classified = self.classifier.inspect(text);
        debug!(
            event = "classified",
            classification = classified.classification.as_str()
        );

        match classified.classification {
            Classification::Empty => return Outcome::Failed(FixError::InputEmpty),
            Classification::Greeting => return Outcome::Greeting,
            Classification::Malicious => {
                warn!(
                    event = "input_rejected_malicious",
                    pattern = classified.matched_pattern.as_deref().unwrap_or("unknown"),
                );
                return Outcome::Failed(FixError::InputMalicious);
            }
            Classification::NonMeaningful => {
                return Outcome::Failed(FixError::InputNonMeaningful)
            }
            Classification::Valid => {}
        }

        let bounded = self.bounder.bound(text.trim());
        debug!(event = "bounded", words = word_count(bounded));

        let reply = self.gateway.complete(bounded).await;
        match ResponseDecoder::decode(reply) {
            Ok(record) => Outcome::Analysis(record),
            Err(err) => {
                warn!(event = "analysis_failed", error = %err);
                Outcome::Failed(err)
            }
        }
    }
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Analysis(_) => "analysis",
        Outcome::Greeting => "greeting",
        Outcome::Failed(err) if err.is_input_rejection() => "short_circuited",
        Outcome::Failed(_) => "failed",
    }
}
