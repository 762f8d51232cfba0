//! Warmup short-circuit.
//!
//! Scheduled warmers keep function instances hot by sending synthetic
//! events. When the configured predicate recognizes one, this stage
//! answers with an empty 200 before the handler (and before any schema
//! validation) runs, and invokes the optional callback.

use portico_config::WarmupOptions;
use portico_core::{BoxFuture, Exchange, Fault, Response, Stage};
use portico_telemetry::SharedLogger;

/// Short-circuits warmup probe events.
pub struct WarmupStage {
    options: WarmupOptions,
    logger: SharedLogger,
}

impl WarmupStage {
    /// Creates the stage from its configuration section.
    #[must_use]
    pub fn new(options: WarmupOptions, logger: SharedLogger) -> Self {
        Self { options, logger }
    }
}

impl Stage for WarmupStage {
    fn name(&self) -> &'static str {
        "warmup"
    }

    fn before<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            if self.options.is_warming_up(exchange.event()) {
                self.logger.info("warmup event detected, skipping handler");
                self.options.notify(exchange.event());
                exchange.set_response(Response::new(200));
            }
            Ok(())
        })
    }
}
