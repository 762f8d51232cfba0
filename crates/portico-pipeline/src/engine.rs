//! The invocation engine.
//!
//! Drives one request through the assembled pipeline:
//!
//! - `before` hooks run in list order; the first one to set a response (or
//!   to fault) stops the rest, and the handler is not invoked;
//! - the handler runs with the typed view of the exchange and its result
//!   becomes the in-flight response;
//! - every stage's `after` hook then runs in reverse assembly order,
//!   regardless of how the response came to be, so entered stages get to
//!   observe and decorate the final response;
//! - faults from any hook or the handler are caught here - logged,
//!   reported to the configured error callback, and converted into their
//!   terminal response. They never escape [`Engine::invoke`].
//!
//! The whole run executes on its own task. When the platform deadline
//! fires first, a synthesized 408 wins the race and the task is left to
//! settle on its own; its eventual result is discarded, never awaited. The
//! task boundary is also what turns a panicking handler into a 500 instead
//! of a crashed harness.

use crate::assemble::assemble;
use portico_config::{Config, ErrorCallback};
use portico_core::{Event, Exchange, Fault, FunctionContext, Handler, Response, Stage};
use portico_telemetry::{
    LevelFilter, LogLevel, LoggerFactory, Profiler, SharedLogger,
};
use std::sync::Arc;

/// Executes assembled pipelines. Cheap to clone; all state is shared and
/// immutable.
#[derive(Clone)]
pub struct Engine {
    stages: Arc<Vec<Arc<dyn Stage>>>,
    handler: Arc<dyn Handler>,
    logger_factory: LoggerFactory,
    log_level: LogLevel,
    profiling: bool,
    on_error: Option<ErrorCallback>,
}

impl Engine {
    /// Assembles the pipeline for a resolved configuration and binds the
    /// handler.
    ///
    /// # Errors
    ///
    /// Configuration fault when assembly fails; the caller decides how to
    /// surface it (the facade converts it into a 500 per invocation).
    pub fn from_config(config: &Config, handler: Arc<dyn Handler>) -> Result<Self, Fault> {
        let logger_factory = config
            .logger_factory()?
            .unwrap_or_else(LoggerFactory::tracing);
        let log_level = config.log_level();
        // Definition-scoped logger for the stages themselves; each
        // invocation still gets its own logger for engine output.
        let stage_logger: SharedLogger =
            Arc::new(LevelFilter::new(log_level, logger_factory.make()));
        let stages = assemble(config, &stage_logger)?;
        Ok(Self {
            stages: Arc::new(stages),
            handler,
            logger_factory,
            log_level,
            profiling: config.profiling_enabled(),
            on_error: config.on_error()?,
        })
    }

    /// The assembled stage names, in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    fn invocation_logger(&self) -> SharedLogger {
        Arc::new(LevelFilter::new(self.log_level, self.logger_factory.make()))
    }

    /// Runs one invocation to completion, racing the platform deadline
    /// when the context carries one. Always produces a well-formed
    /// response.
    pub async fn invoke(&self, event: Event, context: FunctionContext) -> Response {
        let deadline = context.deadline();
        let engine = self.clone();
        let mut task = tokio::spawn(async move { engine.run(event, context).await });

        let joined = match deadline {
            Some(deadline) => {
                let timer = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                tokio::pin!(timer);
                tokio::select! {
                    joined = &mut task => joined,
                    () = &mut timer => {
                        self.invocation_logger()
                            .warn("deadline elapsed before the invocation settled");
                        return Fault::Timeout.to_response();
                    }
                }
            }
            None => task.await,
        };

        match joined {
            Ok(response) => response,
            Err(join_error) => {
                let logger = self.invocation_logger();
                logger.error(&format!("invocation aborted: {join_error}"));
                let fault = Fault::from(anyhow::anyhow!("invocation panicked: {join_error}"));
                if let Some(on_error) = &self.on_error {
                    on_error.call(&fault);
                }
                fault.to_response()
            }
        }
    }

    async fn run(&self, event: Event, context: FunctionContext) -> Response {
        let logger = self.invocation_logger();
        let profiler = Profiler::new(Arc::clone(&logger), self.profiling);
        if self.log_level == LogLevel::Debug {
            logger.debug(&format!(
                "event: {}",
                serde_json::to_string(&event).unwrap_or_default()
            ));
        }

        let mut exchange = Exchange::new(event, context);

        for stage in self.stages.iter() {
            if exchange.response().is_some() {
                break;
            }
            let watch = profiler.start(format!("before:{}", stage.name()));
            let outcome = stage.before(&mut exchange).await;
            watch.finish();
            if let Err(fault) = outcome {
                self.fail(&mut exchange, &fault, &logger);
                break;
            }
        }

        if exchange.response().is_none() {
            let watch = profiler.start("handler");
            let outcome = self.handler.call(exchange.to_invocation()).await;
            watch.finish();
            match outcome {
                Ok(response) => exchange.set_handler_response(response),
                Err(source) => self.fail(&mut exchange, &Fault::Handler { source }, &logger),
            }
        }

        for stage in self.stages.iter().rev() {
            let watch = profiler.start(format!("after:{}", stage.name()));
            let outcome = stage.after(&mut exchange).await;
            watch.finish();
            if let Err(fault) = outcome {
                self.fail(&mut exchange, &fault, &logger);
            }
        }

        let response = exchange.take_response().unwrap_or_else(|| {
            logger.error("pipeline finished without a response");
            Fault::configuration("pipeline produced no response").to_response()
        });
        if self.log_level == LogLevel::Debug {
            logger.debug(&format!(
                "response: {}",
                serde_json::to_string(&response).unwrap_or_default()
            ));
        }
        response
    }

    fn fail(&self, exchange: &mut Exchange, fault: &Fault, logger: &SharedLogger) {
        logger.error(&fault.to_string());
        if let Some(on_error) = &self.on_error {
            on_error.call(fault);
        }
        exchange.set_response(fault.to_response());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_config::ConfigLayer;
    use portico_core::response::res;
    use portico_core::{BoxFuture, HandlerResult, Invocation};
    use portico_telemetry::MemoryLogger;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn engine_with(layer: ConfigLayer, handler: impl Handler + 'static) -> Engine {
        Engine::from_config(&Config::resolve([layer]), Arc::new(handler)).unwrap()
    }

    async fn ok_handler(_invocation: Invocation) -> HandlerResult {
        Ok(res::ok(json!({"ok": true})))
    }

    #[tokio::test]
    async fn plain_invocation_returns_the_handler_response() {
        let engine = engine_with(ConfigLayer::new(), ok_handler);
        let response = engine
            .invoke(Event::default(), FunctionContext::default())
            .await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn handler_error_becomes_an_opaque_500() {
        async fn failing(_invocation: Invocation) -> HandlerResult {
            Err(anyhow::anyhow!("secret detail"))
        }
        let engine = engine_with(ConfigLayer::new(), failing);
        let response = engine
            .invoke(Event::default(), FunctionContext::default())
            .await;
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, Some(json!({"message": "Internal Server Error"})));
    }

    #[tokio::test]
    async fn handler_panic_becomes_a_500_and_the_engine_survives() {
        async fn panicking(_invocation: Invocation) -> HandlerResult {
            panic!("boom");
        }
        let engine = engine_with(ConfigLayer::new(), panicking);
        let response = engine
            .invoke(Event::default(), FunctionContext::default())
            .await;
        assert_eq!(response.status_code, 500);

        // The engine keeps serving after a panic.
        let engine = engine_with(ConfigLayer::new(), ok_handler);
        let response = engine
            .invoke(Event::default(), FunctionContext::default())
            .await;
        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn deadline_race_synthesizes_a_408() {
        async fn sleepy(_invocation: Invocation) -> HandlerResult {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(res::ok(json!({"too": "late"})))
        }
        let engine = engine_with(ConfigLayer::new(), sleepy);
        let context = FunctionContext::default().with_remaining(Duration::from_millis(50));
        let response = engine.invoke(Event::default(), context).await;
        assert_eq!(response.status_code, 408);
        assert!(response.body.is_none());
    }

    #[tokio::test]
    async fn handler_that_settles_in_time_beats_the_deadline() {
        let engine = engine_with(ConfigLayer::new(), ok_handler);
        let context = FunctionContext::default().with_remaining(Duration::from_secs(5));
        let response = engine.invoke(Event::default(), context).await;
        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn before_short_circuit_skips_the_handler_but_not_the_afters() {
        struct Gate;
        impl Stage for Gate {
            fn name(&self) -> &'static str {
                "gate"
            }
            fn before<'a>(
                &'a self,
                exchange: &'a mut Exchange,
            ) -> BoxFuture<'a, Result<(), Fault>> {
                Box::pin(async move {
                    exchange.set_response(res::status(401, json!({"message": "denied"})));
                    Ok(())
                })
            }
        }
        struct Tag;
        impl Stage for Tag {
            fn name(&self) -> &'static str {
                "tag"
            }
            fn after<'a>(
                &'a self,
                exchange: &'a mut Exchange,
            ) -> BoxFuture<'a, Result<(), Fault>> {
                Box::pin(async move {
                    if let Some(response) = exchange.response_mut() {
                        response.set_header("X-Seen", true);
                    }
                    Ok(())
                })
            }
        }

        let handled = Arc::new(AtomicUsize::new(0));
        let handled_by_handler = Arc::clone(&handled);
        let handler = move |_invocation: Invocation| {
            let handled = Arc::clone(&handled_by_handler);
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(res::ok(json!({})))
            }
        };

        let layer = ConfigLayer::new()
            .extend(Arc::new(Tag))
            .extend(Arc::new(Gate));
        let engine = engine_with(layer, handler);
        let response = engine
            .invoke(Event::default(), FunctionContext::default())
            .await;

        assert_eq!(response.status_code, 401);
        assert_eq!(handled.load(Ordering::SeqCst), 0);
        // Tag ran even though Gate short-circuited before it... Tag is
        // earlier in the list, and afters run in reverse over every stage.
        assert!(response.header("X-Seen").is_some());
    }

    #[tokio::test]
    async fn after_hooks_run_in_reverse_assembly_order() {
        struct Recorder(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl Stage for Recorder {
            fn name(&self) -> &'static str {
                self.0
            }
            fn before<'a>(
                &'a self,
                _exchange: &'a mut Exchange,
            ) -> BoxFuture<'a, Result<(), Fault>> {
                let order = Arc::clone(&self.1);
                let name = self.0;
                Box::pin(async move {
                    order.lock().unwrap().push(name);
                    Ok(())
                })
            }
            fn after<'a>(
                &'a self,
                _exchange: &'a mut Exchange,
            ) -> BoxFuture<'a, Result<(), Fault>> {
                let order = Arc::clone(&self.1);
                let name = self.0;
                Box::pin(async move {
                    order.lock().unwrap().push(name);
                    Ok(())
                })
            }
        }

        let order = Arc::new(Mutex::new(Vec::new()));
        let layer = ConfigLayer::new()
            .extend(Arc::new(Recorder("one", Arc::clone(&order))))
            .extend(Arc::new(Recorder("two", Arc::clone(&order))));
        let engine = engine_with(layer, ok_handler);
        engine
            .invoke(Event::default(), FunctionContext::default())
            .await;

        // Unconditional stages have no recording hooks, so the trace is
        // exactly the extensions: forward before, reverse after.
        assert_eq!(*order.lock().unwrap(), vec!["one", "two", "two", "one"]);
    }

    #[tokio::test]
    async fn faults_are_reported_to_the_error_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_callback = Arc::clone(&seen);
        let layer = ConfigLayer::new().on_error(move |fault| {
            seen_by_callback.lock().unwrap().push(fault.to_string());
        });

        async fn failing(_invocation: Invocation) -> HandlerResult {
            Err(anyhow::anyhow!("broken pipe"))
        }
        let engine = engine_with(layer, failing);
        engine
            .invoke(Event::default(), FunctionContext::default())
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("broken pipe"));
    }

    #[tokio::test]
    async fn faults_are_logged_through_the_injected_logger() {
        let memory = Arc::new(MemoryLogger::new());
        let shared: SharedLogger = memory.clone();
        let layer = ConfigLayer::new().logger(LoggerFactory::shared(shared));

        async fn failing(_invocation: Invocation) -> HandlerResult {
            Err(anyhow::anyhow!("cause of it all"))
        }
        let engine = engine_with(layer, failing);
        engine
            .invoke(Event::default(), FunctionContext::default())
            .await;

        let errors = memory.entries_at(portico_telemetry::LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cause of it all"));
    }

    #[tokio::test]
    async fn profiling_logs_stage_timings_at_debug() {
        let memory = Arc::new(MemoryLogger::new());
        let shared: SharedLogger = memory.clone();
        let layer = ConfigLayer::new()
            .logger(LoggerFactory::shared(shared))
            .log_level(LogLevel::Debug)
            .enable_profiling(true);
        let engine = engine_with(layer, ok_handler);
        engine
            .invoke(Event::default(), FunctionContext::default())
            .await;

        let debug = memory.entries_at(portico_telemetry::LogLevel::Debug);
        assert!(debug.iter().any(|entry| entry.starts_with("handler ")));
        assert!(debug.iter().any(|entry| entry.starts_with("before:normalize ")));
    }
}
