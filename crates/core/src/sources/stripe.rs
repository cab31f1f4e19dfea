use serde_json::{Map, Value};

use super::{parse_unix_seconds, scalar_to_string, truthy_scalar_to_string, Extraction};
use crate::types::TriggerKind;

/// `data.object` fields copied when they are strings, with their label names.
const STRING_FIELDS: [(&str, &str); 4] = [
    ("id", "resource_id"),
    ("status", "status"),
    ("customer", "customer"),
    ("currency", "currency"),
];

/// Returns `true` when the payload looks like a Stripe event envelope.
pub fn is_event_envelope(body: &Map<String, Value>) -> bool {
    body.get("object").and_then(Value::as_str) == Some("event")
        && body
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|event_type| event_type.contains('.'))
}

/// Extracts a billing event.
///
/// Resource fields are only copied when they carry the expected JSON type;
/// an `amount` sent as a string is skipped rather than coerced.
pub fn extract(payload: &Value) -> Option<Extraction> {
    let body = payload.as_object()?;
    if !is_event_envelope(body) {
        return None;
    }
    let event_type = body.get("type").and_then(Value::as_str)?;

    let mut extraction = Extraction::new(TriggerKind::Stripe);
    extraction
        .labels
        .insert("event_type".to_string(), event_type.to_string());
    if let Some(event_id) = body.get("id").and_then(truthy_scalar_to_string) {
        extraction.labels.insert("event_id".to_string(), event_id);
    }

    if let Some(resource) = payload.pointer("/data/object").and_then(Value::as_object) {
        for (field, label) in STRING_FIELDS {
            if let Some(text) = resource.get(field).and_then(Value::as_str) {
                extraction.labels.insert(label.to_string(), text.to_string());
            }
        }
        if let Some(amount) = resource
            .get("amount")
            .filter(|value| value.is_number())
            .and_then(scalar_to_string)
        {
            extraction.labels.insert("amount".to_string(), amount);
        }
    }

    extraction.starts_at = body.get("created").and_then(parse_unix_seconds);
    Some(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Labels;
    use serde_json::json;

    fn charge_event() -> Value {
        json!({
            "object": "event",
            "type": "charge.succeeded",
            "id": "evt_1",
            "created": 1_700_000_000,
            "data": {
                "object": {
                    "id": "ch_1",
                    "status": "succeeded",
                    "customer": "cus_1",
                    "amount": 500,
                    "currency": "usd"
                }
            }
        })
    }

    #[test]
    fn extracts_charge_fields() {
        let extraction = extract(&charge_event()).expect("stripe event");
        let expected: Labels = [
            ("event_type", "charge.succeeded"),
            ("event_id", "evt_1"),
            ("resource_id", "ch_1"),
            ("status", "succeeded"),
            ("customer", "cus_1"),
            ("amount", "500"),
            ("currency", "usd"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(extraction.trigger, TriggerKind::Stripe);
        assert_eq!(extraction.labels, expected);
        assert!(extraction.annotations.is_empty());
        assert_eq!(
            extraction.starts_at.expect("created").timestamp_millis(),
            1_700_000_000_000
        );
    }

    #[test]
    fn skips_fields_with_unexpected_types() {
        let mut payload = charge_event();
        payload["data"]["object"]["amount"] = json!("500");
        payload["data"]["object"]["customer"] = json!({"id": "cus_1"});
        payload["data"]["object"]["status"] = json!(null);

        let extraction = extract(&payload).expect("stripe event");
        assert!(!extraction.labels.contains_key("amount"));
        assert!(!extraction.labels.contains_key("customer"));
        assert!(!extraction.labels.contains_key("status"));
        assert_eq!(extraction.labels["resource_id"], "ch_1");
    }

    #[test]
    fn tolerates_missing_data_object_and_id() {
        let payload = json!({"object": "event", "type": "invoice.paid", "id": ""});
        let extraction = extract(&payload).expect("stripe event");
        assert_eq!(extraction.labels.len(), 1);
        assert_eq!(extraction.labels["event_type"], "invoice.paid");
        assert!(extraction.starts_at.is_none());
    }

    #[test]
    fn truthy_non_string_id_becomes_event_id() {
        let payload = json!({"object": "event", "type": "charge.failed", "id": 42});
        let extraction = extract(&payload).expect("stripe event");
        assert_eq!(extraction.labels["event_id"], "42");

        for falsy in [json!(0), json!(false), json!(null), json!("")] {
            let payload = json!({"object": "event", "type": "charge.failed", "id": falsy});
            let extraction = extract(&payload).expect("stripe event");
            assert!(!extraction.labels.contains_key("event_id"));
        }
    }

    #[test]
    fn integral_float_amount_renders_without_fraction() {
        let mut payload = charge_event();
        payload["data"]["object"]["amount"] = json!(500.0);
        let extraction = extract(&payload).expect("stripe event");
        assert_eq!(extraction.labels["amount"], "500");
    }

    #[test]
    fn fractional_created_truncates_to_milliseconds() {
        let mut payload = charge_event();
        payload["created"] = json!(1.0005);
        let extraction = extract(&payload).expect("stripe event");
        assert_eq!(extraction.starts_at.expect("created").timestamp_millis(), 1_000);
    }

    #[test]
    fn non_numeric_created_is_ignored() {
        let mut payload = charge_event();
        payload["created"] = json!("1700000000");
        let extraction = extract(&payload).expect("stripe event");
        assert!(extraction.starts_at.is_none());
    }

    #[test]
    fn rejects_payloads_without_event_envelope() {
        let mut missing_type = charge_event();
        missing_type.as_object_mut().unwrap().remove("type");
        assert!(extract(&missing_type).is_none());

        let mut wrong_object = charge_event();
        wrong_object["object"] = json!("charge");
        assert!(extract(&wrong_object).is_none());

        let mut undotted = charge_event();
        undotted["type"] = json!("charge");
        assert!(extract(&undotted).is_none());

        assert!(extract(&json!(["event"])).is_none());
    }
}
