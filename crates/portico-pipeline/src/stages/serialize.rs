//! Response serialization.
//!
//! Renders structured response bodies to text with the first serializer
//! whose pattern matches the negotiated media type, falling back to the
//! configured default content type. Bodies that are already strings are
//! left alone, as are bodyless responses.

use portico_config::{ResponseContentOptions, SerializerBinding};
use portico_core::{BoxFuture, Exchange, Fault, Stage};
use serde_json::Value;

/// Serializes the response body by content type.
#[derive(Debug, Clone)]
pub struct SerializeStage {
    options: ResponseContentOptions,
}

impl SerializeStage {
    /// Creates the stage from its configuration section.
    #[must_use]
    pub fn new(options: ResponseContentOptions) -> Self {
        Self { options }
    }

    fn binding_for(&self, media_type: &str) -> Option<&SerializerBinding> {
        self.options
            .serializers
            .iter()
            .find(|binding| binding.matches(media_type))
    }
}

impl Stage for SerializeStage {
    fn name(&self) -> &'static str {
        "response_serializer"
    }

    fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let negotiated = exchange.response_media_type().map(ToOwned::to_owned);
            let default = self.options.default_content_type.clone();

            let Some(response) = exchange.response_mut() else {
                return Ok(());
            };
            let Some(body) = response.body.clone() else {
                return Ok(());
            };
            if body.is_string() {
                // Already serialized, by the handler or an extension stage.
                return Ok(());
            }

            let preferred = negotiated.or_else(|| default.clone());
            let Some(mut media_type) = preferred else {
                return Ok(());
            };
            let mut binding = self.binding_for(&media_type);
            if binding.is_none() {
                if let Some(fallback) = default.filter(|fallback| *fallback != media_type) {
                    binding = self.binding_for(&fallback);
                    if binding.is_some() {
                        media_type = fallback;
                    }
                }
            }
            let Some(binding) = binding else {
                return Ok(());
            };

            let text = binding.serialize(&body).map_err(|err| {
                Fault::configuration(format!("response serializer for {media_type} failed: {err}"))
            })?;
            response.body = Some(Value::String(text));
            if response.header("content-type").is_none() {
                response.set_header("Content-Type", media_type);
            }
            Ok(())
        })
    }
}
