//! Body parsing by content type.
//!
//! JSON bodies (including `+json` suffixed types, and requests that declare
//! no content type at all) parse into structured values; urlencoded forms
//! parse into string-valued objects. A body with a foreign content type is
//! kept as a raw string rather than rejected, matching the lenient posture
//! of the surrounding pipeline - schema validation decides what is
//! acceptable, not the parser. Malformed input under a *declared* JSON or
//! form content type is a request-validation fault.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use portico_core::schema::{ValidationError, ValidationTarget};
use portico_core::{BoxFuture, Exchange, Fault, Stage};
use serde_json::{Map, Value};

/// Parses the raw request body into the exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyParserStage;

impl Stage for BodyParserStage {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    fn before<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let Some(raw) = exchange.event().raw_body() else {
                return Ok(());
            };
            let raw = raw.to_owned();
            let base64_encoded = exchange.event().is_base64_encoded;
            let content_type = exchange
                .header("content-type")
                .and_then(|value| value.split(';').next())
                .map(|value| value.trim().to_ascii_lowercase());

            let text = if base64_encoded {
                let bytes = BASE64.decode(raw.as_bytes()).map_err(|err| {
                    invalid_body(format!("Invalid base64 body: {err}"))
                })?;
                String::from_utf8(bytes)
                    .map_err(|_| invalid_body("Body is not valid UTF-8"))?
            } else {
                raw
            };
            if text.is_empty() {
                return Ok(());
            }

            let declared_json = content_type
                .as_deref()
                .is_some_and(|ct| ct == "application/json" || ct.ends_with("+json"));
            let undeclared = content_type.is_none();

            if declared_json || undeclared {
                match serde_json::from_str(&text) {
                    Ok(parsed) => exchange.set_body(parsed),
                    Err(_) if undeclared => exchange.set_body(Value::String(text)),
                    Err(err) => {
                        return Err(invalid_body(format!("Invalid or malformed JSON: {err}")));
                    }
                }
            } else if content_type.as_deref() == Some("application/x-www-form-urlencoded") {
                let pairs: Vec<(String, String)> = serde_urlencoded::from_str(&text)
                    .map_err(|err| invalid_body(format!("Invalid urlencoded body: {err}")))?;
                let mut object = Map::new();
                for (name, value) in pairs {
                    object.insert(name, Value::String(value));
                }
                exchange.set_body(Value::Object(object));
            } else {
                exchange.set_body(Value::String(text));
            }
            Ok(())
        })
    }
}

fn invalid_body(message: impl Into<String>) -> Fault {
    Fault::RequestValidation(ValidationError::message(ValidationTarget::Body, message))
}
