//! Schema adapter: one `validate` operation over incompatible validators.
//!
//! Callers bring their own validation logic, drawn from libraries with
//! structurally different APIs. Rather than probing an opaque object for
//! capabilities at call time, each validator is wrapped into one of a closed
//! set of named variants when the configuration is built, so dispatch is a
//! static choice:
//!
//! - [`Schema::direct_parse`] - a parser that receives the value *and* a
//!   [`ParseContext`] naming where the value is mounted, and returns the
//!   parsed (possibly transformed) value
//! - [`Schema::validate_only`] - a validator that receives the bare value
//!   and nothing else
//! - [`Schema::validate_with_options`] - a validator that receives the value
//!   plus a [`ValidateOptions`] bag
//!
//! Whatever error shape the wrapped library produces must be mapped to
//! [`SchemaViolations`] by the adapter closure; [`Schema::validate`] then
//! normalizes it into a [`ValidationError`] whose violation paths are
//! prefixed with the target designator. Reported violation paths must be
//! relative to the validated value - the adapter owns the prefixing.
//!
//! # Example
//!
//! ```
//! use portico_core::schema::{Schema, ValidationTarget};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let schema = Schema::json_schema(&json!({
//!     "type": "object",
//!     "required": ["id"],
//!     "properties": { "id": { "type": "number" } }
//! })).unwrap();
//!
//! let err = schema
//!     .validate(json!({}), ValidationTarget::Body)
//!     .await
//!     .unwrap_err();
//! assert_eq!(err.target, ValidationTarget::Body);
//! # });
//! ```

use crate::stage::BoxFuture;
use jsonschema::error::ValidationErrorKind;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// The part of the exchange a schema check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationTarget {
    /// The parsed request body.
    Body,
    /// The path parameters.
    Path,
    /// The query-string parameters.
    Querystring,
    /// The handler's response body.
    Response,
}

impl ValidationTarget {
    /// Returns the wire designator for this target.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Path => "path",
            Self::Querystring => "querystring",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step in a violation path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// An object member key.
    Key(String),
    /// An array element index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A single failed check: where it failed and a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Path to the offending value, relative to the validated value until
    /// [`Schema::validate`] prefixes the target designator.
    pub path: Vec<PathSegment>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl Violation {
    /// Creates a violation from a path and message.
    #[must_use]
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Creates a violation anchored at the root of the validated value.
    #[must_use]
    pub fn at_root(message: impl Into<String>) -> Self {
        Self::new(Vec::new(), message)
    }
}

/// The raw failure an adapter closure reports before normalization.
///
/// Carries the violations plus, optionally, the library-native error as an
/// opaque cause for diagnostics. No consumer requires the cause.
#[derive(Debug)]
pub struct SchemaViolations {
    /// Violations relative to the validated value.
    pub violations: Vec<Violation>,
    /// The library-native error, if the adapter kept it.
    pub cause: Option<anyhow::Error>,
}

impl SchemaViolations {
    /// Creates a failure from a list of violations.
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        Self {
            violations,
            cause: None,
        }
    }

    /// Creates a failure with a single root-level message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(vec![Violation::at_root(message)])
    }

    /// Attaches the library-native error for diagnostics.
    #[must_use]
    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        self.cause = Some(cause);
        self
    }
}

/// Normalized result of a failed schema check.
///
/// Violation paths are prefixed with the target designator, so a missing
/// `name` field in the body reports the path `["body", "name"]`.
#[derive(Debug, Error)]
#[error("{target} failed validation")]
pub struct ValidationError {
    /// Which part of the exchange failed.
    pub target: ValidationTarget,
    /// The individual failures, paths prefixed with `target`.
    pub violations: Vec<Violation>,
    /// The library-native error, if kept. Diagnostics only.
    pub cause: Option<anyhow::Error>,
}

impl ValidationError {
    /// Normalizes an adapter failure against a target: every violation path
    /// is prefixed with the target designator.
    #[must_use]
    pub fn normalize(target: ValidationTarget, raw: SchemaViolations) -> Self {
        let violations = raw
            .violations
            .into_iter()
            .map(|violation| {
                let mut path = Vec::with_capacity(violation.path.len() + 1);
                path.push(PathSegment::from(target.as_str()));
                path.extend(violation.path);
                Violation {
                    path,
                    message: violation.message,
                }
            })
            .collect();
        Self {
            target,
            violations,
            cause: raw.cause,
        }
    }

    /// Creates a validation error with a single root-level message for the
    /// target (used for failures that precede any schema, such as an
    /// undecodable body).
    #[must_use]
    pub fn message(target: ValidationTarget, message: impl Into<String>) -> Self {
        Self::normalize(target, SchemaViolations::message(message))
    }

    /// Renders the violations as the wire `details` array.
    #[must_use]
    pub fn details(&self) -> Value {
        serde_json::to_value(&self.violations).unwrap_or_else(|_| Value::Array(Vec::new()))
    }
}

/// Context handed to a [`Schema::direct_parse`] adapter.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Where the value being parsed is mounted (the target designator).
    pub path: Vec<PathSegment>,
}

/// Options bag handed to a [`Schema::validate_with_options`] adapter.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Stop at the first violation instead of collecting all of them.
    pub abort_early: bool,
    /// Extra context forwarded to the validator, if it understands any.
    pub context: Option<Value>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            abort_early: false,
            context: None,
        }
    }
}

type SchemaOutcome = Result<Value, SchemaViolations>;

type DirectParseFn =
    dyn Fn(Value, ParseContext) -> BoxFuture<'static, SchemaOutcome> + Send + Sync;
type ValidateOnlyFn = dyn Fn(Value) -> BoxFuture<'static, SchemaOutcome> + Send + Sync;
type ValidateWithOptionsFn =
    dyn Fn(Value, ValidateOptions) -> BoxFuture<'static, SchemaOutcome> + Send + Sync;

#[derive(Clone)]
enum SchemaKind {
    DirectParse(Arc<DirectParseFn>),
    ValidateOnly(Arc<ValidateOnlyFn>),
    ValidateWithOptions(Arc<ValidateWithOptionsFn>),
}

/// An opaque validator wrapped into one of the recognized variants.
///
/// Cloning is cheap; the wrapped adapter is shared.
#[derive(Clone)]
pub struct Schema {
    kind: SchemaKind,
}

impl Schema {
    /// Wraps a parser that receives the value and a [`ParseContext`] and
    /// returns the parsed value.
    pub fn direct_parse<F, Fut>(parse: F) -> Self
    where
        F: Fn(Value, ParseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SchemaOutcome> + Send + 'static,
    {
        Self {
            kind: SchemaKind::DirectParse(Arc::new(move |value, ctx| Box::pin(parse(value, ctx)))),
        }
    }

    /// Wraps a validator that receives the bare value only.
    pub fn validate_only<F, Fut>(validate: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SchemaOutcome> + Send + 'static,
    {
        Self {
            kind: SchemaKind::ValidateOnly(Arc::new(move |value| Box::pin(validate(value)))),
        }
    }

    /// Wraps a validator that receives the value plus a [`ValidateOptions`]
    /// bag.
    pub fn validate_with_options<F, Fut>(validate: F) -> Self
    where
        F: Fn(Value, ValidateOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SchemaOutcome> + Send + 'static,
    {
        Self {
            kind: SchemaKind::ValidateWithOptions(Arc::new(move |value, options| {
                Box::pin(validate(value, options))
            })),
        }
    }

    /// Compiles a JSON Schema document into a validate-only variant.
    ///
    /// # Errors
    ///
    /// Returns a configuration fault when the document itself is not a valid
    /// JSON Schema.
    pub fn json_schema(document: &Value) -> Result<Self, crate::error::Fault> {
        let validator = jsonschema::validator_for(document).map_err(|err| {
            crate::error::Fault::configuration(format!("invalid JSON Schema document: {err}"))
        })?;
        let validator = Arc::new(validator);
        Ok(Self::validate_only(move |value| {
            let validator = Arc::clone(&validator);
            async move {
                let violations: Vec<Violation> = validator
                    .iter_errors(&value)
                    .map(|err| {
                        let mut path = pointer_segments(&err.instance_path().to_string());
                        // A missing required property is reported at the
                        // parent path; point at the property itself.
                        if let ValidationErrorKind::Required { property } = err.kind() {
                            if let Some(name) = property.as_str() {
                                path.push(PathSegment::Key(name.to_owned()));
                            }
                        }
                        Violation::new(path, err.to_string())
                    })
                    .collect();
                if violations.is_empty() {
                    Ok(value)
                } else {
                    Err(SchemaViolations::new(violations))
                }
            }
        }))
    }

    /// Drives the wrapped validator against `value`.
    ///
    /// Returns the parsed value on success. On failure, the library error is
    /// normalized into a [`ValidationError`] carrying `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the value fails the wrapped check.
    pub async fn validate(
        &self,
        value: Value,
        target: ValidationTarget,
    ) -> Result<Value, ValidationError> {
        let outcome = match &self.kind {
            SchemaKind::DirectParse(parse) => {
                let ctx = ParseContext {
                    path: vec![PathSegment::from(target.as_str())],
                };
                parse(value, ctx).await
            }
            SchemaKind::ValidateOnly(validate) => validate(value).await,
            SchemaKind::ValidateWithOptions(validate) => {
                validate(value, ValidateOptions::default()).await
            }
        };
        outcome.map_err(|raw| ValidationError::normalize(target, raw))
    }

    /// Returns the variant name, for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::DirectParse(_) => "direct_parse",
            SchemaKind::ValidateOnly(_) => "validate_only",
            SchemaKind::ValidateWithOptions(_) => "validate_with_options",
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("kind", &self.kind_name()).finish()
    }
}

/// Splits a JSON-pointer-style path (`/items/0/name`) into segments.
fn pointer_segments(pointer: &str) -> Vec<PathSegment> {
    pointer
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let unescaped = part.replace("~1", "/").replace("~0", "~");
            match unescaped.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(unescaped),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_segments_splits_keys_and_indices() {
        assert_eq!(
            pointer_segments("/items/0/name"),
            vec![
                PathSegment::from("items"),
                PathSegment::from(0_usize),
                PathSegment::from("name"),
            ]
        );
        assert_eq!(pointer_segments(""), Vec::<PathSegment>::new());
    }

    #[tokio::test]
    async fn direct_parse_receives_target_path() {
        let schema = Schema::direct_parse(|value, ctx| async move {
            assert_eq!(ctx.path, vec![PathSegment::from("body")]);
            Ok(value)
        });
        let parsed = schema
            .validate(json!({"id": 1}), ValidationTarget::Body)
            .await
            .unwrap();
        assert_eq!(parsed, json!({"id": 1}));
    }

    #[tokio::test]
    async fn violations_are_prefixed_with_target() {
        let schema = Schema::validate_only(|_value| async move {
            Err(SchemaViolations::new(vec![Violation::new(
                vec![PathSegment::from("name")],
                "Required",
            )]))
        });
        let err = schema
            .validate(json!({}), ValidationTarget::Querystring)
            .await
            .unwrap_err();
        assert_eq!(err.target, ValidationTarget::Querystring);
        assert_eq!(
            err.violations[0].path,
            vec![PathSegment::from("querystring"), PathSegment::from("name")]
        );
    }

    #[tokio::test]
    async fn with_options_variant_gets_default_options() {
        let schema = Schema::validate_with_options(|value, options| async move {
            assert!(!options.abort_early);
            Ok(value)
        });
        schema
            .validate(json!(null), ValidationTarget::Path)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn json_schema_reports_field_paths() {
        let schema = Schema::json_schema(&json!({
            "type": "object",
            "required": ["id", "name"],
            "properties": {
                "id": { "type": "number" },
                "name": { "type": "string" }
            }
        }))
        .unwrap();

        let err = schema
            .validate(json!({"id": "not-a-number"}), ValidationTarget::Body)
            .await
            .unwrap_err();
        assert_eq!(err.target, ValidationTarget::Body);
        assert!(!err.violations.is_empty());
        assert!(err
            .violations
            .iter()
            .all(|violation| violation.path[0] == PathSegment::from("body")));
    }

    #[tokio::test]
    async fn json_schema_points_missing_required_fields_at_the_field() {
        let schema = Schema::json_schema(&json!({
            "type": "object",
            "required": ["id", "name"],
            "properties": {
                "id": { "type": "number" },
                "name": { "type": "string" }
            }
        }))
        .unwrap();

        let err = schema
            .validate(json!({"id": 1}), ValidationTarget::Body)
            .await
            .unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(
            err.violations[0].path,
            vec![PathSegment::from("body"), PathSegment::from("name")]
        );
    }

    #[tokio::test]
    async fn json_schema_passes_valid_values() {
        let schema = Schema::json_schema(&json!({
            "type": "object",
            "required": ["id"],
            "properties": { "id": { "type": "number" } }
        }))
        .unwrap();
        let parsed = schema
            .validate(json!({"id": 7}), ValidationTarget::Body)
            .await
            .unwrap();
        assert_eq!(parsed, json!({"id": 7}));
    }

    #[test]
    fn invalid_json_schema_document_is_a_configuration_fault() {
        let err = Schema::json_schema(&json!({"type": 42})).unwrap_err();
        assert!(matches!(err, crate::error::Fault::Configuration { .. }));
    }

    #[test]
    fn details_render_as_path_message_entries() {
        let err = ValidationError::message(ValidationTarget::Body, "Required");
        assert_eq!(err.details(), json!([{"path": ["body"], "message": "Required"}]));
    }
}
