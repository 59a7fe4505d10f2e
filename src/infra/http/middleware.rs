use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::public::CACHE_STATUS_HEADER;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request identity, read back when logging the response.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let span = info_span!("bundle_request", request_id = %ctx.request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if status.is_success() {
        let from_cache = response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        debug!(
            target: "modjulie::http::response",
            status = status.as_u16(),
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            from_cache,
            elapsed_ms,
            "bundle served",
        );
        return response;
    }

    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        warn!(
            target: "modjulie::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            request_id = %request_id,
            "request rejected",
        );
        return response;
    };

    let detail = report
        .messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target: "modjulie::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms,
            source = report.source,
            detail = %detail,
            chain = ?report.messages,
            request_id = %request_id,
            "bundle build failed",
        );
    } else {
        warn!(
            target: "modjulie::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms,
            source = report.source,
            detail = %detail,
            request_id = %request_id,
            "bundle request rejected",
        );
    }

    response
}
