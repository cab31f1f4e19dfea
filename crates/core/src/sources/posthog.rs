use serde_json::{Map, Value};

use super::{parse_timestamp, scalar_to_string, Extraction};
use crate::types::TriggerKind;

pub const SOURCE_TAG: &str = "posthog";

/// Prefix for custom event properties copied into labels.
const PROPERTY_PREFIX: &str = "prop_";

pub fn is_posthog(body: &Map<String, Value>) -> bool {
    body.get("source").and_then(Value::as_str) == Some(SOURCE_TAG)
}

/// Extracts an analytics event.
///
/// PostHog reserves `$`-prefixed property names for its own bookkeeping; only
/// `$current_url` is kept (as `url`). Custom scalar properties are copied as
/// `prop_<name>`.
pub fn extract(payload: &Value) -> Option<Extraction> {
    let body = payload.as_object()?;
    if !is_posthog(body) {
        return None;
    }

    let mut extraction = Extraction::new(TriggerKind::Posthog);
    extraction.label_scalar("event", body.get("event"));
    extraction.label_scalar("distinct_id", body.get("distinct_id"));
    extraction.label_scalar("event_id", body.get("uuid"));

    if let Some(properties) = body.get("properties").and_then(Value::as_object) {
        extraction.label_scalar("url", properties.get("$current_url"));
        for (key, value) in properties {
            if key.starts_with('$') {
                continue;
            }
            if let Some(text) = scalar_to_string(value) {
                extraction
                    .labels
                    .insert(format!("{PROPERTY_PREFIX}{key}"), text);
            }
        }
    }

    extraction.starts_at = body.get("timestamp").and_then(parse_timestamp);
    Some(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_event_user_and_custom_properties() {
        let payload = json!({
            "source": "posthog",
            "event": "checkout_failed",
            "distinct_id": "user-42",
            "uuid": "0190a1b2-0000-7000-8000-000000000001",
            "timestamp": "2024-05-02T08:30:00.250Z",
            "properties": {
                "$current_url": "https://shop.example/checkout",
                "$browser": "Firefox",
                "plan": "pro",
                "cart_value": 129.5,
                "retry": false,
                "items": ["a", "b"]
            }
        });

        let extraction = extract(&payload).expect("posthog event");
        assert_eq!(extraction.trigger, TriggerKind::Posthog);
        assert_eq!(extraction.labels["event"], "checkout_failed");
        assert_eq!(extraction.labels["distinct_id"], "user-42");
        assert_eq!(
            extraction.labels["event_id"],
            "0190a1b2-0000-7000-8000-000000000001"
        );
        assert_eq!(extraction.labels["url"], "https://shop.example/checkout");
        assert_eq!(extraction.labels["prop_plan"], "pro");
        assert_eq!(extraction.labels["prop_cart_value"], "129.5");
        assert_eq!(extraction.labels["prop_retry"], "false");
        assert!(!extraction.labels.contains_key("prop_items"));
        assert!(!extraction.labels.contains_key("prop_$browser"));
        assert_eq!(
            extraction.starts_at.expect("timestamp").timestamp_millis(),
            1_714_638_600_250
        );
    }

    #[test]
    fn numeric_distinct_id_is_stringified() {
        let payload = json!({"source": "posthog", "event": "signup", "distinct_id": 7});
        let extraction = extract(&payload).expect("posthog event");
        assert_eq!(extraction.labels["distinct_id"], "7");
        assert!(extraction.starts_at.is_none());
    }

    #[test]
    fn other_sources_are_rejected() {
        assert!(extract(&json!({"source": "deploy"})).is_none());
        assert!(extract(&json!({"source": ["posthog"]})).is_none());
        assert!(extract(&json!("posthog")).is_none());
    }
}
