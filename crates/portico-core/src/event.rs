//! The inbound request envelope.
//!
//! The platform delivers requests in one of two recognized payload shapes.
//! Version 2.0 carries the method under `requestContext.http` and the path
//! as `rawPath`; version 1.0 carries them as top-level `httpMethod` and
//! `path` and may duplicate headers/query parameters in multi-value maps.
//! [`Event`] deserializes either shape into one struct and exposes uniform
//! accessors, so nothing downstream cares which version arrived.
//!
//! Unknown fields are tolerated; the envelope is owned by the platform and
//! grows over time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The recognized envelope versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVersion {
    /// The 1.0 shape: top-level `httpMethod`/`path`, multi-value maps.
    V1,
    /// The 2.0 shape: `rawPath`, `requestContext.http`, cookie list.
    V2,
}

/// The inbound request envelope, either payload version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    /// Envelope version marker; `"2.0"` selects the 2.0 shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    // 2.0 fields
    /// Request path (2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_path: Option<String>,
    /// Raw query string (2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_query_string: Option<String>,
    /// Cookie strings (2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<String>>,

    // 1.0 fields
    /// Request method (1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    /// Request path (1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Multi-value headers (1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    /// Multi-value query parameters (1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_value_query_string_parameters: Option<HashMap<String, Vec<String>>>,

    // common fields
    /// Single-value headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Single-value query parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<HashMap<String, String>>,
    /// Path parameters extracted by the platform's router.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_parameters: Option<HashMap<String, String>>,
    /// Raw request body, possibly base64-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Whether `body` is base64-encoded.
    pub is_base64_encoded: bool,
    /// The requester-identity / routing context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_context: Option<EventContext>,
}

/// The `requestContext` member of the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventContext {
    /// Authorizer output attached by the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<Value>,
    /// HTTP description (2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpDescription>,
    /// Requester identity (1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Value>,
    /// Platform-assigned request id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Deployment stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

/// The `requestContext.http` member of a 2.0 envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpDescription {
    /// Request method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Requester address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    /// Requester user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Event {
    /// Deserializes an envelope from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the underlying deserialization error when the value is not an
    /// envelope at all (individual unknown fields are tolerated).
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Which payload version this envelope uses.
    #[must_use]
    pub fn payload_version(&self) -> PayloadVersion {
        if self.version.as_deref() == Some("2.0") {
            PayloadVersion::V2
        } else {
            PayloadVersion::V1
        }
    }

    /// The request method, regardless of version.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self.payload_version() {
            PayloadVersion::V2 => self
                .request_context
                .as_ref()
                .and_then(|ctx| ctx.http.as_ref())
                .and_then(|http| http.method.as_deref()),
            PayloadVersion::V1 => self.http_method.as_deref(),
        }
    }

    /// The request path, regardless of version.
    #[must_use]
    pub fn request_path(&self) -> Option<&str> {
        match self.payload_version() {
            PayloadVersion::V2 => self.raw_path.as_deref(),
            PayloadVersion::V1 => self.path.as_deref(),
        }
    }

    /// The single-value headers, as delivered.
    #[must_use]
    pub fn header_map(&self) -> Option<&HashMap<String, String>> {
        self.headers.as_ref()
    }

    /// The single-value query parameters.
    #[must_use]
    pub fn query_parameters(&self) -> Option<&HashMap<String, String>> {
        self.query_string_parameters.as_ref()
    }

    /// The path parameters.
    #[must_use]
    pub fn path_parameter_map(&self) -> Option<&HashMap<String, String>> {
        self.path_parameters.as_ref()
    }

    /// The raw (unparsed) body.
    #[must_use]
    pub fn raw_body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The authorizer context, regardless of version.
    #[must_use]
    pub fn authorizer(&self) -> Option<&Value> {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.authorizer.as_ref())
    }
}
