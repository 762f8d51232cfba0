//! Security response headers.
//!
//! Applies the configured security-header table to whatever response leaves
//! the pipeline, including short-circuit and fault responses.

use portico_config::SecurityOptions;
use portico_core::{BoxFuture, Exchange, Fault, Stage};

/// Decorates responses with the configured security headers.
#[derive(Debug, Clone)]
pub struct SecurityHeadersStage {
    options: SecurityOptions,
}

impl SecurityHeadersStage {
    /// Creates the stage from its configuration section.
    #[must_use]
    pub fn new(options: SecurityOptions) -> Self {
        Self { options }
    }

    fn header_table(&self) -> Vec<(&'static str, String)> {
        let opts = &self.options;
        let mut headers = Vec::new();
        if let Some(allow) = opts.dns_prefetch_control {
            headers.push((
                "X-DNS-Prefetch-Control",
                if allow { "on" } else { "off" }.to_owned(),
            ));
        }
        if let Some(action) = &opts.frame_options {
            headers.push(("X-Frame-Options", action.clone()));
        }
        if let Some(hsts) = &opts.strict_transport_security {
            let mut value = format!("max-age={}", hsts.max_age.unwrap_or(15_552_000));
            if hsts.include_sub_domains.unwrap_or(false) {
                value.push_str("; includeSubDomains");
            }
            if hsts.preload.unwrap_or(false) {
                value.push_str("; preload");
            }
            headers.push(("Strict-Transport-Security", value));
        }
        if opts.content_type_options == Some(true) {
            headers.push(("X-Content-Type-Options", "nosniff".to_owned()));
        }
        if let Some(policy) = &opts.referrer_policy {
            headers.push(("Referrer-Policy", policy.clone()));
        }
        if let Some(server) = &opts.server {
            headers.push(("Server", server.clone()));
        }
        if let Some(enabled) = opts.xss_protection {
            headers.push((
                "X-XSS-Protection",
                if enabled { "1; mode=block" } else { "0" }.to_owned(),
            ));
        }
        if opts.origin_agent_cluster == Some(true) {
            headers.push(("Origin-Agent-Cluster", "?1".to_owned()));
        }
        if let Some(policy) = &opts.cross_origin_opener_policy {
            headers.push(("Cross-Origin-Opener-Policy", policy.clone()));
        }
        if let Some(policy) = &opts.cross_origin_resource_policy {
            headers.push(("Cross-Origin-Resource-Policy", policy.clone()));
        }
        headers
    }
}

impl Stage for SecurityHeadersStage {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let headers = self.header_table();
            if let Some(response) = exchange.response_mut() {
                for (name, value) in headers {
                    response.set_header(name, value);
                }
            }
            Ok(())
        })
    }
}
