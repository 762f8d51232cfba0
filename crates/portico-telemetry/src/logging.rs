//! The injected logger abstraction.
//!
//! Every component that logs receives a [`SharedLogger`] through its
//! construction. The configuration selects the implementation once, at
//! resolution time: [`TracingLogger`] (the default) forwards to the
//! `tracing` macros, [`NoopLogger`] swallows everything, and
//! [`MemoryLogger`] captures entries for assertions in tests. A
//! [`LoggerFactory`] produces a fresh logger per invocation, so concurrent
//! invocations never share logger state.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// The four log levels, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Events, responses, per-stage detail.
    Debug,
    /// Lifecycle messages.
    Info,
    /// Recoverable problems (for example response validation under the
    /// `warn` policy).
    Warn,
    /// Faults.
    Error,
}

impl LogLevel {
    /// The lowercase level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Whether a message at `level` passes a threshold of `self`.
    #[must_use]
    pub fn enables(self, level: Self) -> bool {
        level >= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(UnknownLogLevel(s.to_owned())),
        }
    }
}

/// Error returned when parsing an unrecognized level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogLevel(pub String);

impl fmt::Display for UnknownLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level: {}", self.0)
    }
}

impl std::error::Error for UnknownLogLevel {}

/// A level-tagged message sink.
pub trait Logger: Send + Sync {
    /// Logs a message at a level.
    fn log(&self, level: LogLevel, message: &str);

    /// Logs at [`LogLevel::Debug`].
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs at [`LogLevel::Info`].
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Logs at [`LogLevel::Warn`].
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Logs at [`LogLevel::Error`].
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// A shareable logger handle.
pub type SharedLogger = Arc<dyn Logger>;

/// Forwards messages to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// Swallows every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Applies a minimum-level threshold in front of another logger.
pub struct LevelFilter {
    threshold: LogLevel,
    inner: SharedLogger,
}

impl LevelFilter {
    /// Wraps `inner`, dropping messages below `threshold`.
    #[must_use]
    pub fn new(threshold: LogLevel, inner: SharedLogger) -> Self {
        Self { threshold, inner }
    }
}

impl Logger for LevelFilter {
    fn log(&self, level: LogLevel, message: &str) {
        if self.threshold.enables(level) {
            self.inner.log(level, message);
        }
    }
}

/// Captures log entries in memory. Test double.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    /// Creates an empty capturing logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the captured entries.
    #[must_use]
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    /// The captured entries at one level.
    #[must_use]
    pub fn entries_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_owned()));
        }
    }
}

/// Produces a fresh [`SharedLogger`] per invocation.
#[derive(Clone)]
pub struct LoggerFactory(Arc<dyn Fn() -> SharedLogger + Send + Sync>);

impl LoggerFactory {
    /// Wraps a factory function.
    pub fn new(factory: impl Fn() -> SharedLogger + Send + Sync + 'static) -> Self {
        Self(Arc::new(factory))
    }

    /// The default factory: every invocation shares a [`TracingLogger`].
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(|| Arc::new(TracingLogger) as SharedLogger)
    }

    /// A factory producing silent loggers.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| Arc::new(NoopLogger) as SharedLogger)
    }

    /// A factory that always hands out the same logger instance.
    #[must_use]
    pub fn shared(logger: SharedLogger) -> Self {
        Self::new(move || Arc::clone(&logger))
    }

    /// Produces a logger for one invocation.
    #[must_use]
    pub fn make(&self) -> SharedLogger {
        (self.0)()
    }
}

impl fmt::Debug for LoggerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoggerFactory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_and_thresholds() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);

        assert!(LogLevel::Info.enables(LogLevel::Error));
        assert!(LogLevel::Info.enables(LogLevel::Info));
        assert!(!LogLevel::Info.enables(LogLevel::Debug));
    }

    #[test]
    fn level_parsing() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn filter_drops_messages_below_threshold() {
        let memory = Arc::new(MemoryLogger::new());
        let filtered = LevelFilter::new(LogLevel::Warn, memory.clone());
        filtered.debug("dropped");
        filtered.info("dropped");
        filtered.warn("kept");
        filtered.error("kept");
        assert_eq!(memory.entries().len(), 2);
    }

    #[test]
    fn factory_hands_out_fresh_loggers() {
        let factory = LoggerFactory::new(|| Arc::new(MemoryLogger::new()) as SharedLogger);
        let first = factory.make();
        let second = factory.make();
        first.info("only in first");
        // The two handles point at different instances.
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn tracing_logger_forwards_under_a_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let logger = TracingLogger;
            logger.debug("debug line");
            logger.info("info line");
            logger.warn("warn line");
            logger.error("error line");
        });
    }

    #[test]
    fn memory_logger_captures_by_level() {
        let logger = MemoryLogger::new();
        logger.warn("careful");
        logger.error("broken");
        assert_eq!(logger.entries_at(LogLevel::Warn), vec!["careful".to_owned()]);
        assert_eq!(logger.entries_at(LogLevel::Error), vec!["broken".to_owned()]);
    }
}
