use serde_json::Value;

use super::{first_timestamp, parse_rfc3339, Extraction};
use crate::types::TriggerKind;

const FIELDS: [(&str, &[&str]); 5] = [
    ("action", &["/action"]),
    ("repository", &["/repository/full_name"]),
    ("actor", &["/sender/login"]),
    ("ref", &["/ref", "/pull_request/head/ref"]),
    (
        "conclusion",
        &["/workflow_run/conclusion", "/check_run/conclusion"],
    ),
];

const START_TIME_FIELDS: [&str; 3] = [
    "/head_commit/timestamp",
    "/pull_request/updated_at",
    "/workflow_run/run_started_at",
];

/// Extracts a source-control event routed by `event_type` (the value of the
/// `X-GitHub-Event` header).
///
/// The hint alone identifies the source, so any payload is accepted; fields
/// that are missing, or a payload that is not an object, only shrink the
/// label set.
pub fn extract(payload: &Value, event_type: &str) -> Option<Extraction> {
    let mut extraction = Extraction::new(TriggerKind::Github);
    extraction
        .labels
        .insert("event".to_string(), event_type.to_string());

    if payload.is_object() {
        for (label, pointers) in FIELDS {
            extraction.label_first(label, payload, pointers);
        }
        extraction.label_scalar("pull_request", payload.pointer("/pull_request/number"));
        extraction.starts_at = first_timestamp(payload, &START_TIME_FIELDS, parse_rfc3339);
    }

    Some(extraction)
}
