use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::{counter, histogram};
use serde_json::{json, Value};
use signal_intake_core::NormalizeOptions;
use thiserror::Error;
use tracing::{info, warn};

use crate::problem::ProblemResponse;
use crate::router::AppState;

/// Out-of-band event type sent by GitHub; used as the routing hint.
const HEADER_GITHUB_EVENT: &str = "X-GitHub-Event";

/// Request-level failures. Unrecognized payloads are not errors.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("header {0} must be visible ASCII")]
    InvalidHeader(&'static str),
    #[error("failed to parse payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl WebhookError {
    fn problem_type(&self) -> &'static str {
        match self {
            Self::InvalidHeader(_) => "invalid_header",
            Self::InvalidJson(_) => "invalid_json",
        }
    }
}

impl From<WebhookError> for ProblemResponse {
    fn from(err: WebhookError) -> Self {
        ProblemResponse::new(StatusCode::BAD_REQUEST, err.problem_type(), err.to_string())
    }
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProblemResponse> {
    let start = Instant::now();
    let result = ingest(&state, &headers, &body);
    let outcome = match &result {
        Ok(response) if response.status() == StatusCode::OK => "matched",
        Ok(_) => "ignored",
        Err(_) => "rejected",
    };
    histogram!("webhook_ack_latency_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());

    result.map_err(|err| {
        counter!("signal_invalid_payload_total", "reason" => err.problem_type()).increment(1);
        warn!(stage = "ingress", error = %err, body_len = body.len(), "rejected webhook request");
        err.into()
    })
}

fn ingest(state: &AppState, headers: &HeaderMap, body: &Bytes) -> Result<Response, WebhookError> {
    let source_event_type = headers
        .get(HEADER_GITHUB_EVENT)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| WebhookError::InvalidHeader(HEADER_GITHUB_EVENT))
        })
        .transpose()?;
    let payload = parse_payload(body)?;

    let options = NormalizeOptions {
        source_event_type,
        metrics_label_filters: state.label_filters().clone(),
    };

    let Some(signal) = state.normalizer().normalize(payload, &options) else {
        counter!("signal_unmatched_total").increment(1);
        info!(
            stage = "ingress",
            body_len = body.len(),
            "payload did not match any known source"
        );
        return Ok((StatusCode::ACCEPTED, Json(json!({"status": "ignored"}))).into_response());
    };

    counter!("signal_ingress_total", "trigger" => signal.trigger().as_str()).increment(1);
    info!(
        stage = "ingress",
        signal_id = signal.id(),
        trigger = %signal.trigger(),
        starts_at = %signal.starts_at_iso(),
        labels = signal.labels().len(),
        "incident signal normalized"
    );

    Ok((StatusCode::OK, Json(signal)).into_response())
}

/// An empty body is treated as an absent payload.
fn parse_payload(body: &[u8]) -> Result<Value, WebhookError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}
