//! Response content encoding.
//!
//! Negotiates `Accept-Encoding` against the enabled codecs and compresses
//! the serialized response body, re-encoding it as base64 for the wire.
//! Only runs against text bodies that the serialization stage has already
//! produced; structured and binary bodies pass through untouched.

use crate::stages::accept::parse_weighted;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use portico_config::EncodingOptions;
use portico_core::{BoxFuture, Exchange, Fault, Stage};
use serde_json::Value;
use std::io::Write;

/// Compresses the serialized response body.
#[derive(Debug, Clone)]
pub struct ContentEncodingStage {
    options: EncodingOptions,
}

impl ContentEncodingStage {
    /// Creates the stage from its configuration section.
    #[must_use]
    pub fn new(options: EncodingOptions) -> Self {
        Self { options }
    }

    fn choose(&self, accept_encoding: Option<&str>) -> Option<String> {
        let preferred = match &self.options.override_preferred_encoding {
            Some(order) => order.clone(),
            None => accept_encoding.map(parse_weighted).unwrap_or_default(),
        };
        let gzip_enabled = self.options.gzip.unwrap_or(true);
        let deflate_enabled = self.options.deflate.unwrap_or(true);
        preferred.into_iter().find(|encoding| match encoding.as_str() {
            "gzip" => gzip_enabled,
            "deflate" => deflate_enabled,
            _ => false,
        })
    }
}

impl Stage for ContentEncodingStage {
    fn name(&self) -> &'static str {
        "content_encoding"
    }

    fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let accept_encoding = exchange.header("accept-encoding").map(ToOwned::to_owned);
            let Some(encoding) = self.choose(accept_encoding.as_deref()) else {
                return Ok(());
            };
            let Some(response) = exchange.response_mut() else {
                return Ok(());
            };
            if response.is_base64_encoded {
                return Ok(());
            }
            let Some(text) = response.body_text().map(ToOwned::to_owned) else {
                return Ok(());
            };

            let compressed = compress(&encoding, text.as_bytes())?;
            response.body = Some(Value::String(BASE64.encode(compressed)));
            response.is_base64_encoded = true;
            response.set_header("Content-Encoding", encoding);
            Ok(())
        })
    }
}

fn compress(encoding: &str, data: &[u8]) -> Result<Vec<u8>, Fault> {
    let compressed = match encoding {
        "gzip" => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).and_then(|()| encoder.finish())
        }
        "deflate" => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).and_then(|()| encoder.finish())
        }
        other => {
            return Err(Fault::configuration(format!(
                "unsupported content encoding: {other}"
            )))
        }
    };
    compressed.map_err(|err| Fault::configuration(format!("content encoding failed: {err}")))
}
