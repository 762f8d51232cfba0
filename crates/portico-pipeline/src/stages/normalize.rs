//! Inbound normalization.
//!
//! Runs first on every request: lowercases header names into the exchange,
//! percent-decodes path parameter values, materializes empty path/query
//! objects so later stages never special-case their absence, and lifts the
//! authorizer context out of the envelope. Works identically for both
//! payload versions because it only uses the event's uniform accessors.

use indexmap::IndexMap;
use portico_core::{BoxFuture, Exchange, Fault, Stage};
use serde_json::{Map, Value};

/// Normalizes the raw event into the exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeStage;

impl Stage for NormalizeStage {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn before<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let event = exchange.event();

            let mut headers = IndexMap::new();
            if let Some(map) = event.header_map() {
                for (name, value) in map {
                    headers.insert(name.to_ascii_lowercase(), value.clone());
                }
            }

            let path: Map<String, Value> = event
                .path_parameter_map()
                .map(|parameters| {
                    parameters
                        .iter()
                        .map(|(name, value)| {
                            (name.clone(), Value::String(percent_decode(value)))
                        })
                        .collect()
                })
                .unwrap_or_default();

            let query: Map<String, Value> = event
                .query_parameters()
                .map(|parameters| {
                    parameters
                        .iter()
                        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                        .collect()
                })
                .unwrap_or_default();

            let authorizer = event.authorizer().cloned();

            exchange.set_headers(headers);
            exchange.set_path_parameters(Value::Object(path));
            exchange.set_query_parameters(Value::Object(query));
            if let Some(authorizer) = authorizer {
                exchange.set_authorizer(authorizer);
            }
            Ok(())
        })
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decodes `%XX` escapes. Malformed escapes pass through untouched.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(high * 16 + low);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(decoded).unwrap_or_else(|_| input.to_owned())
}
