use serde_json::{Map, Value};

use super::{first_timestamp, parse_timestamp, Extraction};
use crate::types::TriggerKind;

pub const SOURCE_TAG: &str = "deploy";

/// Label name and the payload fields it is read from, in order of preference.
const FIELDS: [(&str, &[&str]); 7] = [
    ("deployment_id", &["/deployment_id", "/id"]),
    ("environment", &["/environment"]),
    ("status", &["/status"]),
    ("actor", &["/actor", "/user"]),
    ("service", &["/service"]),
    ("version", &["/version"]),
    ("commit", &["/commit"]),
];

pub fn is_deploy(body: &Map<String, Value>) -> bool {
    body.get("source").and_then(Value::as_str) == Some(SOURCE_TAG)
}

/// Extracts a deployment pipeline event.
pub fn extract(payload: &Value) -> Option<Extraction> {
    let body = payload.as_object()?;
    if !is_deploy(body) {
        return None;
    }

    let mut extraction = Extraction::new(TriggerKind::Deploy);
    for (label, pointers) in FIELDS {
        extraction.label_first(label, payload, pointers);
    }
    extraction.starts_at =
        first_timestamp(payload, &["/started_at", "/timestamp"], parse_timestamp);

    Some(extraction)
}
