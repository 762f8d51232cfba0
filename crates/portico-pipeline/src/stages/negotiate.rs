//! Request content negotiation.
//!
//! Matches the client's `Accept` header against the media types the
//! configuration says the handler can produce, and records the winner on
//! the exchange for the serialization stage. A failed negotiation either
//! short-circuits with a 406 (`fail_on_mismatch`) or falls through to the
//! serializer's default content type.

use crate::stages::accept::{media_matches, parse_weighted};
use portico_config::RequestContentOptions;
use portico_core::response::res;
use portico_core::{BoxFuture, Exchange, Fault, Stage};
use serde_json::json;

/// Negotiates the response media type from the request's `Accept` header.
#[derive(Debug, Clone)]
pub struct NegotiateStage {
    options: RequestContentOptions,
}

impl NegotiateStage {
    /// Creates the stage from its configuration section.
    #[must_use]
    pub fn new(options: RequestContentOptions) -> Self {
        Self { options }
    }
}

impl Stage for NegotiateStage {
    fn name(&self) -> &'static str {
        "negotiate"
    }

    fn before<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let Some(available) = self.options.available_media_types.as_deref() else {
                return Ok(());
            };
            if available.is_empty() {
                return Ok(());
            }

            let negotiated = match exchange.header("accept") {
                // No preference expressed: the first available type wins.
                None => Some(available[0].clone()),
                Some(accept) => parse_weighted(accept).iter().find_map(|accepted| {
                    available
                        .iter()
                        .find(|candidate| media_matches(accepted, candidate))
                        .cloned()
                }),
            };

            match negotiated {
                Some(media_type) => exchange.set_response_media_type(media_type),
                None if self.options.fail_on_mismatch.unwrap_or(false) => {
                    exchange.set_response(res::status(
                        406,
                        json!({ "message": "Unsupported media type" }),
                    ));
                }
                None => {}
            }
            Ok(())
        })
    }
}
