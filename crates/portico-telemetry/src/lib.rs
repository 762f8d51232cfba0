//! # Portico Telemetry
//!
//! Observability primitives for the Portico pipeline: an injected logger
//! abstraction, metrics emission, and a wall-time profiler.
//!
//! Nothing here reaches for ambient global state. Components that log
//! receive a [`SharedLogger`] at construction; the default sink forwards to
//! the `tracing` ecosystem, and a no-op sink exists for callers that want
//! silence. When the configuration supplies a [`LoggerFactory`], every
//! invocation gets its own logger instance.

#![doc(html_root_url = "https://docs.rs/portico-telemetry/0.1.0")]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod profiling;

pub use logging::{
    LevelFilter, LogLevel, Logger, LoggerFactory, MemoryLogger, NoopLogger, SharedLogger,
    TracingLogger,
};
pub use metrics::{record_invocation, MetricsOptions};
pub use profiling::{Profiler, Stopwatch};
