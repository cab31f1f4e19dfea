use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::sources::{deploy, github, posthog, prometheus, stripe, Extraction};
use crate::types::{IncidentSignal, NormalizeOptions, TriggerKind};

/// Source of the fallback `startsAt` for payloads without their own time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
/// Produces a fresh signal identifier on every call.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// A shape-sniffing rule: a discriminant over the top-level object and the
/// extractor invoked when it holds.
struct ShapeRule {
    trigger: TriggerKind,
    sniff: fn(&Map<String, Value>) -> bool,
    extract: fn(&Value, &NormalizeOptions) -> Option<Extraction>,
}

/// Evaluated in order; the first rule whose discriminant holds is used.
const SHAPE_RULES: [ShapeRule; 4] = [
    ShapeRule {
        trigger: TriggerKind::Prometheus,
        sniff: prometheus::is_alert_envelope,
        extract: extract_prometheus,
    },
    ShapeRule {
        trigger: TriggerKind::Posthog,
        sniff: posthog::is_posthog,
        extract: extract_posthog,
    },
    ShapeRule {
        trigger: TriggerKind::Deploy,
        sniff: deploy::is_deploy,
        extract: extract_deploy,
    },
    ShapeRule {
        trigger: TriggerKind::Stripe,
        sniff: stripe::is_event_envelope,
        extract: extract_stripe,
    },
];

fn extract_prometheus(payload: &Value, options: &NormalizeOptions) -> Option<Extraction> {
    prometheus::extract(payload, &options.metrics_label_filters)
}

fn extract_posthog(payload: &Value, _: &NormalizeOptions) -> Option<Extraction> {
    posthog::extract(payload)
}

fn extract_deploy(payload: &Value, _: &NormalizeOptions) -> Option<Extraction> {
    deploy::extract(payload)
}

fn extract_stripe(payload: &Value, _: &NormalizeOptions) -> Option<Extraction> {
    stripe::extract(payload)
}

/// Routes raw webhook payloads to the matching extractor and assembles
/// [`IncidentSignal`] values.
///
/// Routing order:
/// 1. a non-empty `source_event_type` hint always selects the GitHub
///    extractor, whatever the payload looks like;
/// 2. non-object payloads are not recognized;
/// 3. otherwise the shape rules are tried in order: Alertmanager envelope,
///    PostHog, deploy, Stripe event.
///
/// An unrecognized payload yields `None`; that is an expected outcome, not an
/// error. The normalizer keeps no state between calls.
#[derive(Clone)]
pub struct Normalizer {
    clock: Clock,
    id_generator: IdGenerator,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(Utc::now),
            id_generator: Arc::new(|| Uuid::new_v4().to_string()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, id_generator: IdGenerator) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Converts `raw` into a signal, or returns `None` when no source matches.
    ///
    /// `raw` is moved into the signal unchanged. Callers with no body should
    /// pass [`Value::Null`].
    pub fn normalize(&self, raw: Value, options: &NormalizeOptions) -> Option<IncidentSignal> {
        let extraction = classify(&raw, options)?;
        let starts_at = extraction.starts_at.unwrap_or_else(|| (self.clock)());

        Some(IncidentSignal::new(
            (self.id_generator)(),
            extraction.trigger,
            starts_at,
            extraction.labels,
            extraction.annotations,
            raw,
        ))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer").finish_non_exhaustive()
    }
}

/// Normalizes with the system clock and random identifiers.
pub fn normalize(raw: Value, options: &NormalizeOptions) -> Option<IncidentSignal> {
    Normalizer::new().normalize(raw, options)
}

fn classify(raw: &Value, options: &NormalizeOptions) -> Option<Extraction> {
    if let Some(hint) = options.event_type_hint() {
        debug!(stage = "normalize", trigger = %TriggerKind::Github, event_type = hint, "routed by event type hint");
        return github::extract(raw, hint);
    }

    let Some(body) = raw.as_object() else {
        debug!(stage = "normalize", kind = json_kind(raw), "payload is not an object");
        return None;
    };

    let Some(rule) = SHAPE_RULES.iter().find(|rule| (rule.sniff)(body)) else {
        debug!(stage = "normalize", "no source matched payload shape");
        return None;
    };

    let extraction = (rule.extract)(raw, options);
    match &extraction {
        Some(found) => debug!(
            stage = "normalize",
            trigger = %rule.trigger,
            labels = found.labels.len(),
            "payload classified"
        ),
        None => debug!(
            stage = "normalize",
            trigger = %rule.trigger,
            "extractor declined payload"
        ),
    }
    extraction
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
