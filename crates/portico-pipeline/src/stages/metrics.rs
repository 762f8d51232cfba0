//! Invocation metrics.
//!
//! Assembled first so its `after` hook runs last, observing the final
//! status and the full wall-clock latency of the invocation.

use portico_core::{BoxFuture, Exchange, Fault, Stage};
use portico_telemetry::{record_invocation, MetricsOptions};

/// Emits the invocation counter and latency histogram.
#[derive(Debug, Clone)]
pub struct MetricsStage {
    options: MetricsOptions,
}

impl MetricsStage {
    /// Creates the stage from its configuration section.
    #[must_use]
    pub fn new(options: MetricsOptions) -> Self {
        Self { options }
    }
}

impl Stage for MetricsStage {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let status = exchange
                .response()
                .map_or(500, |response| response.status_code);
            record_invocation(&self.options, status, exchange.elapsed());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::{Event, FunctionContext};

    #[tokio::test]
    async fn records_without_a_response_too() {
        let stage = MetricsStage::new(MetricsOptions::default());
        let mut exchange = Exchange::new(Event::default(), FunctionContext::default());
        stage.after(&mut exchange).await.unwrap();
    }
}
