use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// JSON bodies up to this size are logged verbatim.
const LOGGED_BODY_LIMIT: usize = 1024;

pub async fn trace_middleware(
    State(_state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let (parts, body) = req.into_parts();
        let req_bytes = buffer_and_log("request", &parts.headers, body).await;
        let mut req = Request::from_parts(parts, Body::from(req_bytes));
        if let Some(value) = &trace_header {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(req).await;
        let (parts, body) = response.into_parts();

        // Event streams are relayed as they are produced.
        let body = if is_event_stream(&parts.headers) {
            body
        } else {
            Body::from(buffer_and_log("response", &parts.headers, body).await)
        };
        let mut response = Response::from_parts(parts, body);
        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    content_type(headers).starts_with("text/event-stream")
}

async fn buffer_and_log(direction: &str, headers: &HeaderMap, body: Body) -> Bytes {
    let content_type = content_type(headers);
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Bytes::new(),
    };

    if content_type.contains("application/json") && bytes.len() < LOGGED_BODY_LIMIT {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            info!("{direction} body: {text}");
        }
    } else if !bytes.is_empty() {
        info!("{direction} body: [skipped: type={content_type}, size={}]", bytes.len());
    }
    bytes
}
