//! Pipeline assembly.
//!
//! Builds the fixed-order stage list for a resolved configuration. The
//! order is decided here, once per handler definition, never per request:
//!
//! 1. metrics (when enabled - listed first so its `after` hook runs last
//!    and observes the final response)
//! 2. normalize
//! 3. content negotiation (when `transport.content.request` is set)
//! 4. body parsing
//! 5. warmup (when `lifecycle.warmup` is set)
//! 6. security headers (when `transport.security` is set)
//! 7. CORS (when `transport.cors` is set)
//! 8. content encoding (when `transport.encoding` is set)
//! 9. response serialization (when `transport.content.response` is set)
//! 10. validation (when the `parser` section is present)
//! 11. caller-supplied extension stages, in order
//!
//! Because `after` hooks run in reverse, response validation sees the
//! structured body before serialization renders it, and the header
//! decorating stages run against the final (possibly fault-converted)
//! response.
//!
//! A stage whose gating option is absent is simply not assembled; there is
//! no disabled-stage placeholder.

use crate::stages::{
    BodyParserStage, ContentEncodingStage, CorsStage, MetricsStage, NegotiateStage,
    NormalizeStage, SecurityHeadersStage, SerializeStage, ValidationStage, WarmupStage,
};
use portico_config::Config;
use portico_core::{Fault, Stage};
use portico_telemetry::SharedLogger;
use std::sync::Arc;

/// Builds the ordered stage list for a resolved configuration.
///
/// # Errors
///
/// Configuration fault when a gated section is present but unusable (for
/// example a parser slot holding something other than a schema).
pub fn assemble(config: &Config, logger: &SharedLogger) -> Result<Vec<Arc<dyn Stage>>, Fault> {
    let mut stages: Vec<Arc<dyn Stage>> = Vec::new();

    if let Some(metrics) = config.metrics()? {
        stages.push(Arc::new(MetricsStage::new(metrics)));
    }
    stages.push(Arc::new(NormalizeStage));
    if let Some(content) = config.request_content()? {
        stages.push(Arc::new(NegotiateStage::new(content)));
    }
    stages.push(Arc::new(BodyParserStage));
    if let Some(warmup) = config.warmup()? {
        stages.push(Arc::new(WarmupStage::new(warmup, Arc::clone(logger))));
    }
    if let Some(security) = config.security()? {
        stages.push(Arc::new(SecurityHeadersStage::new(security)));
    }
    if let Some(cors) = config.cors()? {
        stages.push(Arc::new(CorsStage::new(cors)));
    }
    if let Some(encoding) = config.encoding()? {
        stages.push(Arc::new(ContentEncodingStage::new(encoding)));
    }
    if let Some(content) = config.response_content()? {
        stages.push(Arc::new(SerializeStage::new(content)));
    }
    if config.parser_present() {
        stages.push(Arc::new(ValidationStage::from_config(
            config,
            Arc::clone(logger),
        )?));
    }
    stages.extend(config.extensions()?);

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_config::{ConfigLayer, ConfigValue, CorsOptions, SecurityOptions};
    use portico_telemetry::NoopLogger;

    fn names(config: &Config) -> Vec<&'static str> {
        let logger: SharedLogger = Arc::new(NoopLogger);
        assemble(config, &logger)
            .unwrap()
            .iter()
            .map(|stage| stage.name())
            .collect()
    }

    #[test]
    fn minimal_config_assembles_the_unconditional_stages() {
        let config = Config::resolve([ConfigLayer::new()]);
        assert_eq!(names(&config), vec!["normalize", "body_parser"]);
    }

    #[test]
    fn gated_stages_appear_only_when_configured() {
        let config = Config::resolve([ConfigLayer::new()
            .cors(CorsOptions::default())
            .security(SecurityOptions::standard())
            .metrics(true)
            .validate_responses(portico_config::Severity::Error)]);
        assert_eq!(
            names(&config),
            vec![
                "metrics",
                "normalize",
                "body_parser",
                "security_headers",
                "cors",
                "validation",
            ]
        );
    }

    #[test]
    fn extensions_land_after_validation() {
        struct Custom;
        impl Stage for Custom {
            fn name(&self) -> &'static str {
                "custom"
            }
        }

        let config = Config::resolve([ConfigLayer::new()
            .validate_responses(portico_config::Severity::Error)
            .extend(Arc::new(Custom))]);
        let names = names(&config);
        assert_eq!(names.last(), Some(&"custom"));
        assert!(names.contains(&"validation"));
    }

    #[test]
    fn broken_parser_slot_fails_assembly() {
        let config = Config::resolve([ConfigLayer::new().set(
            "parser.request",
            ConfigValue::opaque("not-a-schema", 3_u8),
        )]);
        let logger: SharedLogger = Arc::new(NoopLogger);
        assert!(matches!(
            assemble(&config, &logger),
            Err(Fault::Configuration { .. })
        ));
    }
}
