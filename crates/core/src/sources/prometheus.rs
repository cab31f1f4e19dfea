//! Alertmanager webhook payloads.
//!
//! A single notification may group several alerts while a signal carries one
//! label set. Alerts are first narrowed by the configured label filters; the
//! retained alerts are then merged in payload order and the first alert to
//! set a key wins. `commonLabels` and `commonAnnotations` only fill keys no
//! retained alert provided.

use serde_json::{Map, Value};

use super::{parse_rfc3339, scalar_to_string, Extraction};
use crate::types::{Labels, TriggerKind};

/// Alertmanager sends this for alerts without a known start time.
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// Returns `true` when the payload carries both alerting envelope keys.
pub fn is_alert_envelope(body: &Map<String, Value>) -> bool {
    body.contains_key("version") && body.contains_key("alerts")
}

/// Extracts an alerting notification, keeping only alerts that match every
/// entry in `label_filters`.
pub fn extract(payload: &Value, label_filters: &Labels) -> Option<Extraction> {
    let body = payload.as_object()?;
    if !is_alert_envelope(body) {
        return None;
    }
    let alerts = body.get("alerts").and_then(Value::as_array)?;
    let common_labels = body.get("commonLabels").and_then(Value::as_object);

    let retained: Vec<&Map<String, Value>> = alerts
        .iter()
        .filter_map(Value::as_object)
        .filter(|alert| matches_filters(alert, common_labels, label_filters))
        .collect();
    if retained.is_empty() {
        return None;
    }

    let mut extraction = Extraction::new(TriggerKind::Prometheus);
    extraction.labels.extend(
        label_filters
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    for alert in &retained {
        merge_missing(&mut extraction.labels, alert.get("labels"));
        merge_missing(&mut extraction.annotations, alert.get("annotations"));
    }
    merge_missing(&mut extraction.labels, body.get("commonLabels"));
    merge_missing(&mut extraction.annotations, body.get("commonAnnotations"));

    for (label, field) in [("alert_status", "status"), ("receiver", "receiver")] {
        if let Some(text) = body.get(field).and_then(scalar_to_string) {
            extraction.labels.entry(label.to_string()).or_insert(text);
        }
    }
    extraction
        .labels
        .entry("alert_count".to_string())
        .or_insert_with(|| retained.len().to_string());

    extraction.starts_at = retained
        .first()
        .and_then(|alert| alert.get("startsAt"))
        .filter(|value| value.as_str() != Some(ZERO_TIME))
        .and_then(parse_rfc3339);

    Some(extraction)
}

fn matches_filters(
    alert: &Map<String, Value>,
    common_labels: Option<&Map<String, Value>>,
    label_filters: &Labels,
) -> bool {
    let own_labels = alert.get("labels").and_then(Value::as_object);
    label_filters.iter().all(|(key, expected)| {
        own_labels
            .and_then(|labels| labels.get(key))
            .or_else(|| common_labels.and_then(|labels| labels.get(key)))
            .and_then(scalar_to_string)
            .is_some_and(|actual| &actual == expected)
    })
}

fn merge_missing(target: &mut Labels, source: Option<&Value>) {
    let Some(entries) = source.and_then(Value::as_object) else {
        return;
    };
    for (key, value) in entries {
        if let Some(text) = scalar_to_string(value) {
            target.entry(key.clone()).or_insert(text);
        }
    }
}
