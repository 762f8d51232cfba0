//! Request and response validation against the configured schemas.
//!
//! The `before` hook checks the body, then the path parameters, then the
//! querystring, in that fixed order. An absent schema is a no-op that keeps
//! its place in the ordering. The first failure aborts the remaining checks
//! and surfaces as the 400 terminal response, reporting only the failed
//! target - later targets are not attempted, so their failures are never
//! aggregated into the same response.
//!
//! The `after` hook validates the handler's response body under the
//! configured severity: `never` skips, `warn` logs and lets the original
//! response through, `error` (the default) replaces it with a 500. Only
//! handler-produced responses are checked; short-circuit and fault
//! responses are none of this stage's business.

use portico_config::{Config, Severity};
use portico_core::schema::{Schema, ValidationTarget};
use portico_core::{BoxFuture, Exchange, Fault, Stage};
use portico_telemetry::SharedLogger;
use serde_json::Value;

/// Schema validation of the request legs and the response body.
pub struct ValidationStage {
    request: Option<Schema>,
    path: Option<Schema>,
    query: Option<Schema>,
    response: Option<Schema>,
    severity: Severity,
    logger: SharedLogger,
}

impl ValidationStage {
    /// Builds the stage from the parser section of a resolved
    /// configuration.
    ///
    /// # Errors
    ///
    /// Configuration fault when a parser slot holds something other than a
    /// schema.
    pub fn from_config(config: &Config, logger: SharedLogger) -> Result<Self, Fault> {
        Ok(Self {
            request: config.request_schema()?,
            path: config.path_schema()?,
            query: config.query_schema()?,
            response: config.response_schema()?,
            severity: config.validate_responses(),
            logger,
        })
    }

    async fn check(
        schema: Option<&Schema>,
        value: Value,
        target: ValidationTarget,
    ) -> Result<(), Fault> {
        match schema {
            None => Ok(()),
            Some(schema) => match schema.validate(value, target).await {
                Ok(_) => Ok(()),
                Err(err) => Err(match target {
                    ValidationTarget::Response => Fault::ResponseValidation(err),
                    _ => Fault::RequestValidation(err),
                }),
            },
        }
    }
}

impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn before<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            Self::check(
                self.request.as_ref(),
                exchange.body_or_null(),
                ValidationTarget::Body,
            )
            .await?;
            Self::check(
                self.path.as_ref(),
                exchange.path_parameters().clone(),
                ValidationTarget::Path,
            )
            .await?;
            Self::check(
                self.query.as_ref(),
                exchange.query_parameters().clone(),
                ValidationTarget::Querystring,
            )
            .await?;
            Ok(())
        })
    }

    fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let Some(schema) = self.response.as_ref() else {
                return Ok(());
            };
            if self.severity == Severity::Never {
                return Ok(());
            }
            if !exchange.handler_responded() {
                return Ok(());
            }
            let Some(response) = exchange.response() else {
                return Ok(());
            };

            let body = response.body.clone().unwrap_or(Value::Null);
            match Self::check(Some(schema), body, ValidationTarget::Response).await {
                Ok(()) => Ok(()),
                Err(fault) => match self.severity {
                    Severity::Warn => {
                        if let Fault::ResponseValidation(err) = &fault {
                            self.logger.warn(&format!(
                                "Response object failed validation: {}",
                                err.details()
                            ));
                        }
                        Ok(())
                    }
                    _ => Err(fault),
                },
            }
        })
    }
}
