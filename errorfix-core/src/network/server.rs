use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::error;

use crate::error::FixError;
use crate::interceptor::extract::{IncomingRequest, TextExtractor};
use crate::pipeline::ErrorFixPipeline;
use crate::render::{Outcome, ResponseRenderer};

pub fn router(pipeline: Arc<ErrorFixPipeline>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/fix", post(fix))
        .route("/", post(fix))
        .with_state(pipeline)
}

async fn health_check() -> &'static str {
    "errorfix: ONLINE"
}

/// Runs the pipeline on its own task so a panic anywhere inside it becomes a
/// generic server error instead of a dropped connection.
async fn fix(
    State(pipeline): State<Arc<ErrorFixPipeline>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = IncomingRequest::new(headers, query, &body);
    let channel = TextExtractor::channel(&req);

    let task = tokio::spawn(async move { pipeline.respond(&req).await });

    match task.await {
        Ok(rendered) => rendered.into_response(),
        Err(join_err) => {
            error!(event = "pipeline_fault", error = %join_err);
            let fault = FixError::UnexpectedFault(join_err.to_string());
            ResponseRenderer::render(&Outcome::Failed(fault), channel).into_response()
        }
    }
}
