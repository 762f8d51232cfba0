//! Wall-time profiling of pipeline stages.
//!
//! When profiling is enabled, the engine wraps every hook and the handler
//! call in a [`Stopwatch`] and reports elapsed milliseconds through the
//! invocation's logger at debug level. Disabled profilers hand out inert
//! stopwatches, so the instrumentation costs nothing in the common case.

use crate::logging::SharedLogger;
use std::time::Instant;

/// Hands out stopwatches for one invocation.
pub struct Profiler {
    enabled: bool,
    logger: SharedLogger,
}

impl Profiler {
    /// Creates a profiler reporting through `logger` when `enabled`.
    #[must_use]
    pub fn new(logger: SharedLogger, enabled: bool) -> Self {
        Self { enabled, logger }
    }

    /// Starts timing one labeled step.
    #[must_use]
    pub fn start(&self, label: impl Into<String>) -> Stopwatch {
        Stopwatch {
            label: label.into(),
            started: Instant::now(),
            logger: self.enabled.then(|| SharedLogger::clone(&self.logger)),
        }
    }
}

/// A single timed step. Reports on [`Stopwatch::finish`].
pub struct Stopwatch {
    label: String,
    started: Instant,
    logger: Option<SharedLogger>,
}

impl Stopwatch {
    /// Stops the watch and reports the elapsed time.
    pub fn finish(self) {
        if let Some(logger) = self.logger {
            let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
            logger.debug(&format!("{} {elapsed_ms:.3} ms", self.label));
        }
    }
}
