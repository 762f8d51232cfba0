//! The outbound response shape and its helper constructors.
//!
//! A [`Response`] mirrors the platform's structured result: an integer
//! status, an optional body, string-keyed headers whose values may be
//! strings, numbers, or booleans, and an ordered cookie list. An absent body
//! serializes as an omitted field, which is distinct from an explicit
//! `null` or an empty object.
//!
//! The [`res`] module holds the canonical constructors for common statuses;
//! they build plain values and take part in no control flow.
//!
//! # Example
//!
//! ```
//! use portico_core::response::res;
//! use serde_json::json;
//!
//! let response = res::ok(json!({ "id": "123" }));
//! assert_eq!(response.status_code, 200);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A header value: string, number, or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// A textual header value.
    Str(String),
    /// A numeric header value (for example `Content-Length` or `Max-Age`).
    Int(i64),
    /// A boolean header value.
    Bool(bool),
}

impl HeaderValue {
    /// Returns the textual value, when this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// The structured result sent back to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP-style status code.
    pub status_code: u16,
    /// Response body. `None` is omitted on the wire; `Some(Value::Null)`
    /// serializes as an explicit `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Response headers, in insertion order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, HeaderValue>,
    /// Cookies to set, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    /// Whether `body` is a base64-encoded binary payload.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_base64_encoded: bool,
}

impl Response {
    /// Creates a bodyless response with the given status.
    #[must_use]
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            body: None,
            headers: IndexMap::new(),
            cookies: Vec::new(),
            is_base64_encoded: false,
        }
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a header, replacing any existing header with the same name
    /// (case-insensitive).
    pub fn set_header(&mut self, name: &str, value: impl Into<HeaderValue>) {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_owned(), value.into());
    }

    /// Adds a header, builder style.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<HeaderValue>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Looks a header up by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// The body as text, when it has already been serialized.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_ref().and_then(Value::as_str)
    }
}

/// Canonical response constructors for common statuses.
pub mod res {
    use super::Response;
    use serde_json::Value;

    /// A response with an arbitrary status and body.
    #[must_use]
    pub fn status(status_code: u16, body: Value) -> Response {
        Response::new(status_code).with_body(body)
    }

    /// `200 OK`.
    #[must_use]
    pub fn ok(body: Value) -> Response {
        status(200, body)
    }

    /// `201 Created`, with an optional `Location` header.
    #[must_use]
    pub fn created(body: Value, location: Option<&str>) -> Response {
        let response = status(201, body);
        match location {
            Some(location) => response.with_header("Location", location),
            None => response,
        }
    }

    /// `202 Accepted`, with an optional `Location` header.
    #[must_use]
    pub fn accepted(body: Value, location: Option<&str>) -> Response {
        let response = status(202, body);
        match location {
            Some(location) => response.with_header("Location", location),
            None => response,
        }
    }

    /// `204 No Content`. Carries no body.
    #[must_use]
    pub fn no_content() -> Response {
        Response::new(204)
    }

    /// `400 Bad Request`.
    #[must_use]
    pub fn bad_request(body: Value) -> Response {
        status(400, body)
    }

    /// `404 Not Found`.
    #[must_use]
    pub fn not_found(body: Value) -> Response {
        status(404, body)
    }

    /// `409 Conflict`.
    #[must_use]
    pub fn conflict(body: Value) -> Response {
        status(409, body)
    }

    /// `422 Unprocessable Entity`.
    #[must_use]
    pub fn unprocessable(body: Value) -> Response {
        status(422, body)
    }

    /// `429 Too Many Requests`.
    #[must_use]
    pub fn too_many_requests(body: Value) -> Response {
        status(429, body)
    }

    /// `500 Internal Server Error`.
    #[must_use]
    pub fn server_error(body: Value) -> Response {
        status(500, body)
    }

    /// `501 Not Implemented`.
    #[must_use]
    pub fn not_implemented(body: Value) -> Response {
        status(501, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_body_is_omitted_but_null_body_is_kept() {
        let absent = serde_json::to_value(Response::new(204)).unwrap();
        assert_eq!(absent, json!({"statusCode": 204}));

        let null_body = serde_json::to_value(Response::new(200).with_body(Value::Null)).unwrap();
        assert_eq!(null_body, json!({"statusCode": 200, "body": null}));

        let empty_body = serde_json::to_value(res::ok(json!({}))).unwrap();
        assert_eq!(empty_body, json!({"statusCode": 200, "body": {}}));
    }

    #[test]
    fn header_values_serialize_untagged() {
        let mut response = Response::new(200);
        response.set_header("X-Str", "text");
        response.set_header("X-Num", 42_i64);
        response.set_header("X-Flag", true);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value["headers"],
            json!({"X-Str": "text", "X-Num": 42, "X-Flag": true})
        );
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut response = Response::new(200);
        response.set_header("content-type", "text/plain");
        response.set_header("Content-Type", "application/json");
        assert_eq!(response.headers.len(), 1);
        assert_eq!(
            response.header("CONTENT-TYPE").and_then(HeaderValue::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn helpers_build_the_canonical_shapes() {
        assert_eq!(res::ok(json!({"id": 1})).status_code, 200);
        assert_eq!(res::no_content().status_code, 204);
        assert!(res::no_content().body.is_none());
        assert_eq!(res::not_found(json!({"message": "missing"})).status_code, 404);

        let created = res::created(json!({}), Some("/things/9"));
        assert_eq!(created.status_code, 201);
        assert_eq!(
            created.header("Location").and_then(HeaderValue::as_str),
            Some("/things/9")
        );

        let created_without_location = res::created(json!({}), None);
        assert!(created_without_location.header("Location").is_none());
    }
}
