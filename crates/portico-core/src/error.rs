//! The fault taxonomy and its mapping to terminal responses.
//!
//! Every failure mode of an invocation is one of the [`Fault`] variants.
//! Faults never escape the invocation engine: they are caught at its
//! boundary, logged, and converted into a well-formed response via
//! [`Fault::to_response`]. The conversion controls detail exposure:
//! validation failures carry a machine-readable `details` list, while
//! configuration and handler faults deliberately leak nothing.

use crate::response::Response;
use crate::schema::ValidationError;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// A failure raised anywhere between accepting an event and producing the
/// wire response.
#[derive(Debug, Error)]
pub enum Fault {
    /// The caller supplied configuration the pipeline cannot use (for
    /// example, an unrecognized value where a schema was expected). Fatal
    /// for the invocation; no detail reaches the response.
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },

    /// The first failing of the body/path/querystring checks.
    #[error("request validation failed: {0}")]
    RequestValidation(ValidationError),

    /// The handler's response body failed the response schema under the
    /// `error` severity policy.
    #[error("response validation failed: {0}")]
    ResponseValidation(ValidationError),

    /// The handler (or a hook) returned an error or panicked.
    #[error("handler fault: {source}")]
    Handler {
        /// The underlying error. Logged, never exposed to clients.
        #[from]
        source: anyhow::Error,
    },

    /// The platform deadline elapsed before the invocation settled.
    #[error("invocation deadline exceeded")]
    Timeout,
}

impl Fault {
    /// Creates a configuration fault.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// The HTTP-style status this fault terminates with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration { .. } | Self::Handler { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::RequestValidation(_) => StatusCode::BAD_REQUEST,
            Self::ResponseValidation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Converts the fault into its terminal response.
    ///
    /// Validation faults expose their `details`; configuration and handler
    /// faults surface a generic message; the timeout carries the bare
    /// status.
    #[must_use]
    pub fn to_response(&self) -> Response {
        let status = self.status_code().as_u16();
        match self {
            Self::RequestValidation(err) => Response::new(status).with_body(json!({
                "message": "Invalid Request",
                "details": err.details(),
            })),
            Self::ResponseValidation(err) => Response::new(status).with_body(json!({
                "message": "Response object failed validation",
                "details": err.details(),
            })),
            Self::Configuration { .. } | Self::Handler { .. } => Response::new(status)
                .with_body(json!({ "message": "Internal Server Error" })),
            Self::Timeout => Response::new(status),
        }
    }
}
