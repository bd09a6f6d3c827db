//! Prometheus metrics recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Call once at startup before any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// Chat turns (counter, labels: source).
pub const CHAT_TURNS_TOTAL: &str = "chat_turns_total";
/// Safety bypasses (counter, labels: reason).
pub const SAFETY_BYPASS_TOTAL: &str = "safety_bypass_total";
/// Rule interceptions (counter, labels: engine, rule).
pub const RULE_INTERCEPTS_TOTAL: &str = "rule_intercepts_total";
/// Failed chat turns (counter, labels: kind).
pub const CHAT_ERRORS_TOTAL: &str = "chat_errors_total";
/// Provider requests (counter, labels: provider, status).
pub const PROVIDER_REQUESTS_TOTAL: &str = "provider_requests_total";
/// Provider request duration seconds (histogram, labels: provider).
pub const PROVIDER_REQUEST_DURATION_SECONDS: &str = "provider_request_duration_seconds";
/// Push subscription registrations (counter).
pub const PUSH_SUBSCRIPTIONS_TOTAL: &str = "push_subscriptions_total";
/// Push delivery attempts (counter, labels: status = sent | failed | pruned).
pub const PUSH_DELIVERIES_TOTAL: &str = "push_deliveries_total";
