use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{
    BuildError as PrometheusBuildError, PrometheusBuilder, PrometheusHandle,
};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::UtcTime},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use signal_intake_util::{AppConfig, Environment};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to initialize tracing: {0}")]
    Tracing(#[from] TryInitError),
    #[error("failed to initialize prometheus recorder: {0}")]
    Metrics(#[from] PrometheusBuildError),
}

static TRACING_INIT: OnceLock<()> = OnceLock::new();
static METRICS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);
static START_TIME: OnceLock<Instant> = OnceLock::new();

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

const METRICS: [(MetricKind, &str, &str); 6] = [
    (
        MetricKind::Gauge,
        "app_build_info",
        "Build metadata for the running binary",
    ),
    (
        MetricKind::Gauge,
        "app_uptime_seconds",
        "Seconds since the process started",
    ),
    (
        MetricKind::Counter,
        "signal_ingress_total",
        "Count of webhook payloads normalized into incident signals, labelled by trigger",
    ),
    (
        MetricKind::Counter,
        "signal_unmatched_total",
        "Count of webhook payloads that matched no known source",
    ),
    (
        MetricKind::Counter,
        "signal_invalid_payload_total",
        "Count of webhook requests rejected before normalization, labelled by reason",
    ),
    (
        MetricKind::Histogram,
        "webhook_ack_latency_seconds",
        "Latency in seconds to acknowledge webhook requests, labelled by outcome",
    ),
];

fn build_git_sha() -> &'static str {
    option_env!("GIT_SHA").unwrap_or("unknown")
}

/// Default filter when `RUST_LOG` is unset. Outside production the
/// normalizer's per-payload classification events are shown as well.
fn default_directives(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "info",
        Environment::Development | Environment::Test => "info,signal_intake_core=debug",
    }
}

pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryError> {
    if TRACING_INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.environment)));
    let production = config.environment == Environment::Production;

    let json_layer = production.then(|| {
        tracing_fmt::layer()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .json()
            .flatten_event(true)
    });
    let pretty_layer = (!production).then(|| {
        tracing_fmt::layer()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .pretty()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()?;

    TRACING_INIT.set(()).ok();
    tracing::info!(
        stage = "telemetry",
        env = config.environment.as_str(),
        version = BUILD_VERSION,
        git_sha = build_git_sha(),
        "tracing initialized"
    );
    Ok(())
}

/// Installs the Prometheus recorder once per process and returns its handle.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    let mut slot = METRICS_HANDLE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    for (kind, name, description) in METRICS {
        match kind {
            MetricKind::Counter => describe_counter!(name, description),
            MetricKind::Gauge => describe_gauge!(name, description),
            MetricKind::Histogram => describe_histogram!(name, description),
        }
    }
    gauge!("app_build_info", "version" => BUILD_VERSION, "git" => build_git_sha()).set(1.0);
    START_TIME.get_or_init(Instant::now);

    *slot = Some(handle.clone());
    Ok(handle)
}

/// Renders the Prometheus exposition, refreshing the uptime gauge first.
pub fn render_metrics(handle: &PrometheusHandle) -> String {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs_f64())
        .unwrap_or_default();
    gauge!("app_uptime_seconds").set(uptime);
    handle.render()
}
