//! The recognized option sections.
//!
//! Data-shaped sections (CORS, security headers, encoding, request content)
//! are plain serde structs: they convert to mapping nodes in the layer
//! tree, so later layers can override individual keys. Function-valued
//! options (serializers, warmup hooks, error callbacks, extension stages)
//! are opaque leaves that replace wholesale.

use portico_core::{Event, Fault, Stage};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Response-validation severity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    /// Skip response validation entirely.
    Never,
    /// Log the failure and pass the original response through.
    Warn,
    /// Replace the response with a 500.
    #[default]
    Error,
}

impl Severity {
    /// The lowercase policy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// CORS header computation options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorsOptions {
    /// A single allowed origin (or `*`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// A list of allowed origins; the request origin is echoed when it
    /// matches. Takes precedence over `origin`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origins: Option<Vec<String>>,
    /// Value for `Access-Control-Allow-Headers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_headers: Option<Vec<String>>,
    /// Value for `Access-Control-Allow-Methods`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_methods: Option<Vec<String>>,
    /// Value for `Access-Control-Expose-Headers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose_headers: Option<Vec<String>>,
    /// Whether to allow credentials. Forces origin echo over `*`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<bool>,
    /// Value for `Access-Control-Max-Age`, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

/// Strict-Transport-Security sub-options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HstsOptions {
    /// `max-age` directive, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    /// Whether to add `includeSubDomains`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_sub_domains: Option<bool>,
    /// Whether to add `preload`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preload: Option<bool>,
}

/// Security response-header table options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityOptions {
    /// `X-DNS-Prefetch-Control`: `true` allows, `false` disables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_prefetch_control: Option<bool>,
    /// `X-Frame-Options` action (`DENY` or `SAMEORIGIN`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_options: Option<String>,
    /// `Strict-Transport-Security` directives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_transport_security: Option<HstsOptions>,
    /// `X-Content-Type-Options: nosniff` when `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type_options: Option<bool>,
    /// `Referrer-Policy` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_policy: Option<String>,
    /// `Server` header override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// `X-XSS-Protection`: enabled (`1; mode=block`) when `true`, `0` when
    /// `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xss_protection: Option<bool>,
    /// `Origin-Agent-Cluster: ?1` when `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_agent_cluster: Option<bool>,
    /// `Cross-Origin-Opener-Policy` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_origin_opener_policy: Option<String>,
    /// `Cross-Origin-Resource-Policy` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_origin_resource_policy: Option<String>,
}

impl SecurityOptions {
    /// The standard hardened header set.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            dns_prefetch_control: Some(false),
            frame_options: Some("DENY".to_owned()),
            strict_transport_security: Some(HstsOptions {
                max_age: Some(15_552_000),
                include_sub_domains: Some(true),
                preload: Some(true),
            }),
            content_type_options: Some(true),
            referrer_policy: Some("no-referrer".to_owned()),
            server: None,
            xss_protection: Some(true),
            origin_agent_cluster: Some(true),
            cross_origin_opener_policy: Some("same-origin".to_owned()),
            cross_origin_resource_policy: Some("same-origin".to_owned()),
        }
    }
}

/// Content-encoding options for the response body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodingOptions {
    /// Whether gzip is offered (defaults to enabled).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gzip: Option<bool>,
    /// Whether deflate is offered (defaults to enabled).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deflate: Option<bool>,
    /// Overrides the client's encoding preference order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_preferred_encoding: Option<Vec<String>>,
}

/// Content negotiation options for the request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestContentOptions {
    /// Media types the handler can produce, most preferred first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_media_types: Option<Vec<String>>,
    /// Whether a failed negotiation short-circuits with a 406.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_mismatch: Option<bool>,
}

/// One response serializer: a media-type pattern and the function that
/// renders a structured body into text.
#[derive(Clone)]
pub struct SerializerBinding {
    pattern: Regex,
    serializer: Arc<dyn Fn(&Value) -> Result<String, anyhow::Error> + Send + Sync>,
}

impl SerializerBinding {
    /// Binds a serializer function to a media-type pattern.
    pub fn new(
        pattern: Regex,
        serializer: impl Fn(&Value) -> Result<String, anyhow::Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            pattern,
            serializer: Arc::new(serializer),
        }
    }

    /// Whether this binding handles the media type.
    #[must_use]
    pub fn matches(&self, media_type: &str) -> bool {
        self.pattern.is_match(media_type)
    }

    /// Renders the body.
    ///
    /// # Errors
    ///
    /// Propagates the serializer function's error.
    pub fn serialize(&self, body: &Value) -> Result<String, anyhow::Error> {
        (self.serializer)(body)
    }
}

impl fmt::Debug for SerializerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializerBinding({})", self.pattern.as_str())
    }
}

/// Response serialization options.
#[derive(Debug, Clone, Default)]
pub struct ResponseContentOptions {
    /// Serializer bindings, tried in order.
    pub serializers: Vec<SerializerBinding>,
    /// Fallback media type when negotiation produced none.
    pub default_content_type: Option<String>,
}

/// Warmup short-circuit options.
#[derive(Clone)]
pub struct WarmupOptions {
    predicate: Arc<dyn Fn(&Event) -> bool + Send + Sync>,
    on_warmup: Option<Arc<dyn Fn(&Event) + Send + Sync>>,
}

impl WarmupOptions {
    /// Creates warmup options from the detection predicate.
    pub fn new(predicate: impl Fn(&Event) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
            on_warmup: None,
        }
    }

    /// Adds a callback invoked on every detected warmup event.
    #[must_use]
    pub fn with_callback(mut self, callback: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on_warmup = Some(Arc::new(callback));
        self
    }

    /// Whether the event is a warmup probe.
    #[must_use]
    pub fn is_warming_up(&self, event: &Event) -> bool {
        (self.predicate)(event)
    }

    /// Invokes the warmup callback, when one is set.
    pub fn notify(&self, event: &Event) {
        if let Some(callback) = &self.on_warmup {
            callback(event);
        }
    }
}

impl fmt::Debug for WarmupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmupOptions")
            .field("has_callback", &self.on_warmup.is_some())
            .finish()
    }
}

/// Callback observing every fault the engine converts.
#[derive(Clone)]
pub struct ErrorCallback(Arc<dyn Fn(&Fault) + Send + Sync>);

impl ErrorCallback {
    /// Wraps a callback function.
    pub fn new(callback: impl Fn(&Fault) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Invokes the callback.
    pub fn call(&self, fault: &Fault) {
        (self.0)(fault);
    }
}

impl fmt::Debug for ErrorCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorCallback")
    }
}

/// A caller-supplied pipeline stage carried through the configuration tree.
#[derive(Clone)]
pub struct StageHandle(Arc<dyn Stage>);

impl StageHandle {
    /// Wraps a stage.
    #[must_use]
    pub fn new(stage: Arc<dyn Stage>) -> Self {
        Self(stage)
    }

    /// The wrapped stage.
    #[must_use]
    pub fn stage(&self) -> Arc<dyn Stage> {
        Arc::clone(&self.0)
    }
}

impl fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageHandle({})", self.0.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_parsing_and_default() {
        assert_eq!("never".parse::<Severity>().unwrap(), Severity::Never);
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("error".parse::<Severity>().unwrap(), Severity::Error);
        assert!("loud".parse::<Severity>().is_err());
        assert_eq!(Severity::default(), Severity::Error);
    }

    #[test]
    fn cors_options_round_trip_through_json() {
        let options = CorsOptions {
            origin: Some("https://app.example.com".to_owned()),
            credentials: Some(true),
            ..CorsOptions::default()
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            json!({"origin": "https://app.example.com", "credentials": true})
        );
        let back: CorsOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn serializer_binding_matches_and_renders() {
        let binding = SerializerBinding::new(Regex::new("^application/json$").unwrap(), |body| {
            Ok(serde_json::to_string(body)?)
        });
        assert!(binding.matches("application/json"));
        assert!(!binding.matches("text/plain"));
        assert_eq!(binding.serialize(&json!({"a": 1})).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn warmup_options_detect_and_notify() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_callback = Arc::clone(&seen);
        let options = WarmupOptions::new(|event: &Event| event.raw_body() == Some("warmup"))
            .with_callback(move |_event| {
                seen_in_callback.fetch_add(1, Ordering::SeqCst);
            });

        let mut event = Event::default();
        event.body = Some("warmup".to_owned());
        assert!(options.is_warming_up(&event));
        options.notify(&event);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        event.body = Some("real request".to_owned());
        assert!(!options.is_warming_up(&event));
    }
}
