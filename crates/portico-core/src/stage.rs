//! The pipeline stage contract.
//!
//! A stage is a pair of optional hooks around the handler. `before` hooks
//! run front-to-back and may short-circuit the run by setting the
//! exchange's response; `after` hooks run back-to-front over the final
//! response. A hook that returns a [`Fault`] hands control to the engine's
//! single conversion point.
//!
//! The executor semantics live in `portico-pipeline`; this trait only fixes
//! the shape so configuration can carry caller-supplied stages.

use crate::error::Fault;
use crate::exchange::Exchange;
use std::future::Future;
use std::pin::Pin;

/// A boxed future, the return type of stage hooks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One stage in the invocation pipeline.
///
/// Both hooks default to no-ops, so a stage implements only the sides it
/// cares about.
///
/// # Example
///
/// ```
/// use portico_core::{BoxFuture, Exchange, Fault, Stage};
///
/// struct AttachRegion;
///
/// impl Stage for AttachRegion {
///     fn name(&self) -> &'static str {
///         "attach_region"
///     }
///
///     fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
///         Box::pin(async move {
///             if let Some(response) = exchange.response_mut() {
///                 response.set_header("X-Region", "eu-west-1");
///             }
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Stage: Send + Sync {
    /// The stage name, used in logs and profiling output.
    fn name(&self) -> &'static str;

    /// Runs before the handler. Set a response on the exchange to
    /// short-circuit: later `before` hooks and the handler are skipped.
    fn before<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        let _ = exchange;
        Box::pin(async { Ok(()) })
    }

    /// Runs after the handler (or after a short-circuit), in reverse
    /// assembly order. May observe or rewrite the final response.
    fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        let _ = exchange;
        Box::pin(async { Ok(()) })
    }
}
