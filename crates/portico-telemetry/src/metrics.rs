//! Invocation metrics behind the `metrics` facade.
//!
//! The pipeline records one counter and one histogram per invocation when
//! metrics are enabled. Which recorder consumes them is the host's concern;
//! this crate installs none.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Invocation counter name.
pub const INVOCATIONS: &str = "portico_invocations_total";
/// Invocation latency histogram name.
pub const INVOCATION_SECONDS: &str = "portico_invocation_duration_seconds";

/// Metrics emission options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsOptions {
    /// Namespace label attached to every emitted metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl MetricsOptions {
    /// The effective namespace label.
    #[must_use]
    pub fn namespace(&self) -> String {
        self.namespace.clone().unwrap_or_else(|| "portico".to_owned())
    }
}

/// Records the per-invocation counter and latency histogram.
pub fn record_invocation(options: &MetricsOptions, status_code: u16, elapsed: Duration) {
    let namespace = options.namespace();
    metrics::counter!(
        INVOCATIONS,
        "namespace" => namespace.clone(),
        "status" => status_code.to_string()
    )
    .increment(1);
    metrics::histogram!(INVOCATION_SECONDS, "namespace" => namespace)
        .record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_defaults() {
        assert_eq!(MetricsOptions::default().namespace(), "portico");
        let named = MetricsOptions {
            namespace: Some("orders".to_owned()),
        };
        assert_eq!(named.namespace(), "orders");
    }

    #[test]
    fn options_deserialize_from_config_shape() {
        let options: MetricsOptions =
            serde_json::from_value(serde_json::json!({"namespace": "orders"})).unwrap();
        assert_eq!(options.namespace.as_deref(), Some("orders"));
    }

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        record_invocation(&MetricsOptions::default(), 200, Duration::from_millis(5));
    }
}
