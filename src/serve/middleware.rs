//! Response header middleware.

use super::policy::{accepts_gzip, is_static_asset, should_compress, sniff_content_type, STATIC_CACHE_CONTROL};
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Largest body buffered to sniff a missing content type
const SNIFF_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Mark static assets as cacheable for a year
pub(crate) async fn cache_control(req: Request, next: Next) -> Response {
    let cacheable = is_static_asset(req.uri().path());
    let mut response = next.run(req).await;
    if cacheable {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(STATIC_CACHE_CONTROL),
        );
    }
    response
}

/// Hide `Accept-Encoding` from the compression layer unless the request
/// both accepts gzip and asks for a compressible path. Paths that are never
/// compressed do not vary by encoding.
pub(crate) async fn negotiate_compression(mut req: Request, next: Next) -> Response {
    let compressible = should_compress(req.uri().path());
    if !(compressible && accepts_gzip(req.headers())) {
        req.headers_mut().remove(header::ACCEPT_ENCODING);
    }
    let mut response = next.run(req).await;
    if !compressible {
        response.headers_mut().remove(header::VARY);
    }
    response
}

/// Give successful responses without a content type one sniffed from the body
pub(crate) async fn fill_content_type(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if !response.status().is_success() || response.headers().contains_key(header::CONTENT_TYPE) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, SNIFF_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(sniff_content_type(&bytes)),
    );
    Response::from_parts(parts, Body::from(bytes))
}
