//! Per-invocation platform context.
//!
//! [`FunctionContext`] models what the hosting runtime tells the function
//! about itself and the current invocation: identity, resource limits, and
//! the deadline by which the invocation must settle. The deadline is the
//! only cancellation signal in the system; the engine races the run against
//! it and synthesizes a timeout response when it fires first.

use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Unique identifier for one invocation.
///
/// Time-ordered (UUID v7), so identifiers sort by creation time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the hosting runtime provides for one invocation.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    invocation_id: InvocationId,
    function_name: String,
    function_version: String,
    memory_limit_mb: u32,
    deadline: Option<Instant>,
}

impl FunctionContext {
    /// Creates a context for the named function with a fresh invocation id
    /// and no deadline.
    #[must_use]
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            invocation_id: InvocationId::new(),
            function_name: function_name.into(),
            function_version: "$LATEST".to_owned(),
            memory_limit_mb: 128,
            deadline: None,
        }
    }

    /// Sets the function version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.function_version = version.into();
        self
    }

    /// Sets the memory limit, in megabytes.
    #[must_use]
    pub const fn with_memory_limit_mb(mut self, limit: u32) -> Self {
        self.memory_limit_mb = limit;
        self
    }

    /// Sets the absolute deadline for this invocation.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline as a duration from now.
    #[must_use]
    pub fn with_remaining(self, remaining: Duration) -> Self {
        self.with_deadline(Instant::now() + remaining)
    }

    /// The invocation identifier.
    #[must_use]
    pub const fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// The function name.
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// The function version.
    #[must_use]
    pub fn function_version(&self) -> &str {
        &self.function_version
    }

    /// The memory limit, in megabytes.
    #[must_use]
    pub const fn memory_limit_mb(&self) -> u32 {
        self.memory_limit_mb
    }

    /// The absolute deadline, when the platform imposed one.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, when one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl Default for FunctionContext {
    fn default() -> Self {
        Self::new("function")
    }
}
