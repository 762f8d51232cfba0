//! CORS header computation.
//!
//! Computes `Access-Control-*` headers from the configured policy and the
//! request's `Origin` header, and applies them to the outgoing response.
//! When an origin list is configured, the request origin is echoed only if
//! it is allowed; with credentials enabled, a wildcard is replaced by the
//! concrete request origin, since browsers reject `*` with credentials.

use portico_config::CorsOptions;
use portico_core::{BoxFuture, Exchange, Fault, Stage};

/// Applies the configured CORS policy to the response.
#[derive(Debug, Clone)]
pub struct CorsStage {
    options: CorsOptions,
}

impl CorsStage {
    /// Creates the stage from its configuration section.
    #[must_use]
    pub fn new(options: CorsOptions) -> Self {
        Self { options }
    }

    fn resolve_origin(&self, request_origin: Option<&str>) -> Option<String> {
        match self.options.origins.as_deref() {
            Some(origins) if !origins.is_empty() => {
                if origins.iter().any(|origin| origin == "*") {
                    Some("*".to_owned())
                } else {
                    request_origin
                        .filter(|origin| origins.iter().any(|allowed| allowed == origin))
                        .map(ToOwned::to_owned)
                }
            }
            _ => Some(
                self.options
                    .origin
                    .clone()
                    .unwrap_or_else(|| "*".to_owned()),
            ),
        }
    }
}

impl Stage for CorsStage {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
        Box::pin(async move {
            let request_origin = exchange.header("origin").map(ToOwned::to_owned);
            let allow_origin = self.resolve_origin(request_origin.as_deref());
            let Some(response) = exchange.response_mut() else {
                return Ok(());
            };

            let credentials = self.options.credentials.unwrap_or(false);
            if let Some(mut origin) = allow_origin {
                if credentials && origin == "*" {
                    if let Some(request_origin) = &request_origin {
                        origin.clone_from(request_origin);
                    }
                }
                if origin != "*" {
                    response.set_header("Vary", "Origin");
                }
                response.set_header("Access-Control-Allow-Origin", origin);
                if credentials {
                    response.set_header("Access-Control-Allow-Credentials", "true");
                }
            }
            if let Some(headers) = &self.options.allow_headers {
                response.set_header("Access-Control-Allow-Headers", headers.join(", "));
            }
            if let Some(methods) = &self.options.allow_methods {
                response.set_header("Access-Control-Allow-Methods", methods.join(", "));
            }
            if let Some(exposed) = &self.options.expose_headers {
                response.set_header("Access-Control-Expose-Headers", exposed.join(", "));
            }
            if let Some(max_age) = self.options.max_age {
                response.set_header("Access-Control-Max-Age", i64::try_from(max_age).unwrap_or(0));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use portico_core::response::res;
    use portico_core::{Event, FunctionContext, HeaderValue};
    use serde_json::json;

    async fn run(options: CorsOptions, request_origin: Option<&str>) -> Exchange {
        let mut exchange = Exchange::new(Event::default(), FunctionContext::default());
        if let Some(origin) = request_origin {
            let mut headers = IndexMap::new();
            headers.insert("origin".to_owned(), origin.to_owned());
            exchange.set_headers(headers);
        }
        exchange.set_handler_response(res::ok(json!({})));
        CorsStage::new(options).after(&mut exchange).await.unwrap();
        exchange
    }

    fn allow_origin(exchange: &Exchange) -> Option<String> {
        exchange
            .response()
            .unwrap()
            .header("Access-Control-Allow-Origin")
            .and_then(HeaderValue::as_str)
            .map(ToOwned::to_owned)
    }

    #[tokio::test]
    async fn defaults_to_wildcard() {
        let exchange = run(CorsOptions::default(), Some("https://a.example")).await;
        assert_eq!(allow_origin(&exchange).as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn single_origin_is_used_verbatim() {
        let options = CorsOptions {
            origin: Some("https://app.example".to_owned()),
            ..CorsOptions::default()
        };
        let exchange = run(options, Some("https://other.example")).await;
        assert_eq!(allow_origin(&exchange).as_deref(), Some("https://app.example"));
        assert_eq!(
            exchange
                .response()
                .unwrap()
                .header("Vary")
                .and_then(HeaderValue::as_str),
            Some("Origin")
        );
    }

    #[tokio::test]
    async fn origin_list_echoes_only_allowed_origins() {
        let options = CorsOptions {
            origins: Some(vec![
                "https://one.example".to_owned(),
                "https://two.example".to_owned(),
            ]),
            ..CorsOptions::default()
        };

        let allowed = run(options.clone(), Some("https://two.example")).await;
        assert_eq!(allow_origin(&allowed).as_deref(), Some("https://two.example"));

        let denied = run(options, Some("https://evil.example")).await;
        assert_eq!(allow_origin(&denied), None);
    }

    #[tokio::test]
    async fn credentials_replace_wildcard_with_request_origin() {
        let options = CorsOptions {
            credentials: Some(true),
            ..CorsOptions::default()
        };
        let exchange = run(options, Some("https://app.example")).await;
        assert_eq!(allow_origin(&exchange).as_deref(), Some("https://app.example"));
        assert_eq!(
            exchange
                .response()
                .unwrap()
                .header("Access-Control-Allow-Credentials")
                .and_then(HeaderValue::as_str),
            Some("true")
        );
    }

    #[tokio::test]
    async fn list_valued_headers_are_joined() {
        let options = CorsOptions {
            allow_methods: Some(vec!["GET".to_owned(), "POST".to_owned()]),
            allow_headers: Some(vec!["Content-Type".to_owned(), "Authorization".to_owned()]),
            max_age: Some(3600),
            ..CorsOptions::default()
        };
        let exchange = run(options, None).await;
        let response = exchange.response().unwrap();
        assert_eq!(
            response
                .header("Access-Control-Allow-Methods")
                .and_then(HeaderValue::as_str),
            Some("GET, POST")
        );
        assert_eq!(
            response
                .header("Access-Control-Allow-Headers")
                .and_then(HeaderValue::as_str),
            Some("Content-Type, Authorization")
        );
        assert_eq!(
            response.header("Access-Control-Max-Age"),
            Some(&HeaderValue::Int(3600))
        );
    }
}
