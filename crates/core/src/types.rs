use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// String-keyed, string-valued facts attached to a signal.
pub type Labels = BTreeMap<String, String>;

/// Source that produced an [`IncidentSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Alertmanager-style metrics alert.
    Prometheus,
    /// Product analytics event.
    Posthog,
    /// Deployment pipeline event.
    Deploy,
    /// Source-control webhook, routed by an explicit event-type hint.
    Github,
    /// Billing event.
    Stripe,
}

impl TriggerKind {
    /// Returns the canonical name used across telemetry and serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prometheus => "prometheus",
            Self::Posthog => "posthog",
            Self::Deploy => "deploy",
            Self::Github => "github",
            Self::Stripe => "stripe",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing hints supplied by the transport alongside the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Out-of-band event type (e.g. the `X-GitHub-Event` header value).
    pub source_event_type: Option<String>,
    /// Label filters applied to metrics alerts.
    pub metrics_label_filters: Labels,
}

impl NormalizeOptions {
    pub fn with_source_event_type(mut self, value: impl Into<String>) -> Self {
        self.source_event_type = Some(value.into());
        self
    }

    pub fn with_metrics_label_filters(mut self, filters: Labels) -> Self {
        self.metrics_label_filters = filters;
        self
    }

    /// Returns the routing hint, treating an empty string as absent.
    pub fn event_type_hint(&self) -> Option<&str> {
        self.source_event_type
            .as_deref()
            .filter(|value| !value.is_empty())
    }
}

/// Canonical record produced for every recognized payload.
///
/// Instances are only built by the normalizer and are read through accessors,
/// so a signal never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSignal {
    id: String,
    trigger: TriggerKind,
    #[serde(with = "iso_millis")]
    starts_at: DateTime<Utc>,
    labels: Labels,
    annotations: Labels,
    raw: Value,
}

impl IncidentSignal {
    pub(crate) fn new(
        id: String,
        trigger: TriggerKind,
        starts_at: DateTime<Utc>,
        labels: Labels,
        annotations: Labels,
        raw: Value,
    ) -> Self {
        Self {
            id,
            trigger,
            starts_at,
            labels,
            annotations,
            raw,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    /// Returns `startsAt` in its wire form, e.g. `2023-11-14T22:13:20.000Z`.
    pub fn starts_at_iso(&self) -> String {
        format_iso_millis(self.starts_at)
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn annotations(&self) -> &Labels {
        &self.annotations
    }

    /// The payload exactly as it was received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }
}

fn format_iso_millis(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso_millis(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
