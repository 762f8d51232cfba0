//! End-to-end pipeline behavior: envelopes, decoration, short-circuits,
//! the deadline race, and fault containment.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use portico::{res, Api};
use portico_config::{
    ConfigLayer, CorsOptions, EncodingOptions, SecurityOptions, WarmupOptions,
};
use portico_core::{
    BoxFuture, Event, Exchange, Fault, FunctionContext, HandlerResult, HeaderValue, Invocation,
    Schema, Stage,
};
use portico_telemetry::{LoggerFactory, NoopLogger, SharedLogger};
use serde_json::{json, Value};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn v2_event() -> Event {
    Event::from_value(json!({
        "version": "2.0",
        "rawPath": "/things/9",
        "headers": { "content-type": "application/json" },
        "queryStringParameters": { "limit": "10" },
        "pathParameters": { "id": "9" },
        "body": "{\"id\":9}",
        "requestContext": {
            "http": { "method": "POST", "path": "/things/9" },
            "authorizer": { "principalId": "user-1" }
        }
    }))
    .unwrap()
}

fn v1_event() -> Event {
    Event::from_value(json!({
        "httpMethod": "POST",
        "path": "/things/9",
        "headers": { "Content-Type": "application/json" },
        "queryStringParameters": { "limit": "10" },
        "pathParameters": { "id": "9" },
        "body": "{\"id\":9}",
        "requestContext": {
            "authorizer": { "principalId": "user-1" }
        }
    }))
    .unwrap()
}

async fn echo_view(invocation: Invocation) -> HandlerResult {
    Ok(res::ok(json!({
        "body": invocation.body,
        "path": invocation.path,
        "query": invocation.query,
        "authorizer": invocation.authorizer,
    })))
}

fn parsed_body(response: &portico_core::Response) -> Value {
    serde_json::from_str(response.body_text().expect("serialized body")).unwrap()
}

#[tokio::test]
async fn both_envelope_versions_produce_the_same_handler_view() {
    let function = Api::new().function(ConfigLayer::new(), echo_view);

    let from_v2 = function.invoke(v2_event(), FunctionContext::default()).await;
    let from_v1 = function.invoke(v1_event(), FunctionContext::default()).await;

    assert_eq!(from_v2.status_code, 200);
    let expected = json!({
        "body": {"id": 9},
        "path": {"id": "9"},
        "query": {"limit": "10"},
        "authorizer": {"principalId": "user-1"},
    });
    assert_eq!(parsed_body(&from_v2), expected);
    assert_eq!(parsed_body(&from_v1), expected);
}

#[tokio::test]
async fn default_pipeline_serializes_json_and_sets_the_content_type() {
    let function = Api::new().function(ConfigLayer::new(), |_invocation: Invocation| async move {
        Ok(res::ok(json!({"message": "Hello World"})))
    });

    let response = function.invoke(v2_event(), FunctionContext::default()).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body_text(), Some("{\"message\":\"Hello World\"}"));
    assert_eq!(
        response.header("Content-Type").and_then(HeaderValue::as_str),
        Some("application/json")
    );
}

#[tokio::test]
async fn cors_headers_appear_only_when_configured() {
    let bare = Api::new().function(ConfigLayer::new(), echo_view);
    let response = bare.invoke(v2_event(), FunctionContext::default()).await;
    assert!(response.header("Access-Control-Allow-Origin").is_none());

    let with_cors = Api::new().function(
        ConfigLayer::new().cors(CorsOptions {
            origin: Some("*".to_owned()),
            ..CorsOptions::default()
        }),
        echo_view,
    );
    let response = with_cors.invoke(v2_event(), FunctionContext::default()).await;
    assert_eq!(
        response
            .header("Access-Control-Allow-Origin")
            .and_then(HeaderValue::as_str),
        Some("*")
    );
}

#[tokio::test]
async fn security_headers_decorate_even_fault_responses() {
    async fn failing(_invocation: Invocation) -> HandlerResult {
        Err(anyhow::anyhow!("nope"))
    }
    let function = Api::new().function(
        ConfigLayer::new().security(SecurityOptions::standard()),
        failing,
    );

    let response = function.invoke(v2_event(), FunctionContext::default()).await;
    assert_eq!(response.status_code, 500);
    assert_eq!(
        response
            .header("X-Content-Type-Options")
            .and_then(HeaderValue::as_str),
        Some("nosniff")
    );
}

#[tokio::test]
async fn deadline_beats_a_stuck_handler_and_skips_response_validation() {
    async fn stuck(_invocation: Invocation) -> HandlerResult {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(res::ok(json!({"never": "returned"})))
    }
    // A response schema nothing could satisfy: if response validation ran,
    // the status would be 500, not 408.
    let function = Api::new().function(
        ConfigLayer::new().response_schema(
            Schema::json_schema(&json!({"type": "object", "required": ["impossible"]})).unwrap(),
        ),
        stuck,
    );

    let context = FunctionContext::default().with_remaining(Duration::from_millis(50));
    let response = function.invoke(v2_event(), context).await;
    assert_eq!(response.status_code, 408);
    assert!(response.body.is_none());
}

#[tokio::test]
async fn handler_faults_do_not_poison_subsequent_invocations() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_handler = Arc::clone(&calls);
    let function = Api::new().function(ConfigLayer::new(), move |_invocation: Invocation| {
        let calls = Arc::clone(&calls_in_handler);
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first call explodes");
            }
            Ok(res::ok(json!({"call": 2})))
        }
    });

    let first = function.invoke(v2_event(), FunctionContext::default()).await;
    assert_eq!(first.status_code, 500);

    let second = function.invoke(v2_event(), FunctionContext::default()).await;
    assert_eq!(second.status_code, 200);
    assert_eq!(parsed_body(&second), json!({"call": 2}));
}

#[tokio::test]
async fn warmup_probes_never_reach_the_handler() {
    let handled = Arc::new(AtomicUsize::new(0));
    let handled_in_handler = Arc::clone(&handled);
    let function = Api::new().function(
        ConfigLayer::new().warmup(WarmupOptions::new(|event: &Event| {
            event.raw_body() == Some("{\"warmer\":true}")
        })),
        move |_invocation: Invocation| {
            let handled = Arc::clone(&handled_in_handler);
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(res::ok(json!({})))
            }
        },
    );

    let mut event = v2_event();
    event.body = Some("{\"warmer\":true}".to_owned());
    let response = function.invoke(event, FunctionContext::default()).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(handled.load(Ordering::SeqCst), 0);

    let response = function.invoke(v2_event(), FunctionContext::default()).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn content_encoding_compresses_the_serialized_body() {
    let function = Api::new().function(
        ConfigLayer::new().encoding(EncodingOptions::default()),
        |_invocation: Invocation| async move { Ok(res::ok(json!({"hello": "world"}))) },
    );

    let mut event = v2_event();
    if let Some(headers) = event.headers.as_mut() {
        headers.insert("Accept-Encoding".to_owned(), "gzip".to_owned());
    }
    let response = function.invoke(event, FunctionContext::default()).await;

    assert!(response.is_base64_encoded);
    assert_eq!(
        response
            .header("Content-Encoding")
            .and_then(HeaderValue::as_str),
        Some("gzip")
    );
    let compressed = BASE64.decode(response.body_text().unwrap()).unwrap();
    let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
    let mut decompressed = String::new();
    decoder.read_to_string(&mut decompressed).unwrap();
    assert_eq!(decompressed, "{\"hello\":\"world\"}");
}

#[tokio::test]
async fn extension_stages_observe_the_final_response() {
    struct Stamp;
    impl Stage for Stamp {
        fn name(&self) -> &'static str {
            "stamp"
        }
        fn after<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Fault>> {
            Box::pin(async move {
                let elapsed = i64::try_from(exchange.elapsed().as_millis()).unwrap_or(i64::MAX);
                if let Some(response) = exchange.response_mut() {
                    response.set_header("X-Elapsed-Ms", elapsed);
                }
                Ok(())
            })
        }
    }

    let function = Api::new().function(
        ConfigLayer::new().extend(Arc::new(Stamp)),
        echo_view,
    );
    let response = function.invoke(v2_event(), FunctionContext::default()).await;
    assert!(response.header("X-Elapsed-Ms").is_some());
}

#[tokio::test]
async fn a_fresh_logger_is_made_per_invocation() {
    let made = Arc::new(AtomicUsize::new(0));
    let made_in_factory = Arc::clone(&made);
    let factory = LoggerFactory::new(move || {
        made_in_factory.fetch_add(1, Ordering::SeqCst);
        Arc::new(NoopLogger) as SharedLogger
    });

    let function = Api::new().function(ConfigLayer::new().logger(factory), echo_view);
    let after_definition = made.load(Ordering::SeqCst);

    function.invoke(v2_event(), FunctionContext::default()).await;
    function.invoke(v2_event(), FunctionContext::default()).await;

    assert!(made.load(Ordering::SeqCst) >= after_definition + 2);
}

#[tokio::test]
async fn on_error_observes_handler_faults() {
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_in_callback = Arc::clone(&seen);
    async fn failing(_invocation: Invocation) -> HandlerResult {
        Err(anyhow::anyhow!("observable"))
    }

    let function = Api::new().function(
        ConfigLayer::new().on_error(move |_fault| {
            seen_in_callback.fetch_add(1, Ordering::SeqCst);
        }),
        failing,
    );
    function.invoke(v2_event(), FunctionContext::default()).await;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
