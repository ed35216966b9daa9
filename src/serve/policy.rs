//! Header policy for the preview server.
//!
//! Decisions are made from the request path's extension alone; the server
//! never inspects file contents to decide on caching or compression.

use axum::http::header::ACCEPT_ENCODING;
use axum::http::HeaderMap;

/// Cache directive sent with long-lived static assets
pub const STATIC_CACHE_CONTROL: &str = "public, max-age=31536000";

const CACHEABLE: &[&str] = &["css", "js", "jpg", "jpeg", "png", "gif", "ico", "svg", "webp"];

const COMPRESSIBLE: &[&str] = &["html", "css", "js", "json", "xml", "txt", "svg"];

/// Already compressed, never worth gzipping again
const INCOMPRESSIBLE: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "zip", "gz", "mp3", "mp4"];

/// Number of leading bytes looked at when sniffing a content type
pub const SNIFF_LEN: usize = 512;

/// Lowercased extension of a request path. A path ending in `/` is served
/// as its directory index and counts as `html`.
pub fn extension_of(path: &str) -> Option<String> {
    if path.is_empty() || path.ends_with('/') {
        return Some("html".to_string());
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the path gets the long-lived cache directive
pub fn is_static_asset(path: &str) -> bool {
    extension_of(path).is_some_and(|ext| CACHEABLE.contains(&ext.as_str()))
}

/// Whether a response for this path may be gzipped
pub fn should_compress(path: &str) -> bool {
    extension_of(path).is_some_and(|ext| {
        COMPRESSIBLE.contains(&ext.as_str()) && !INCOMPRESSIBLE.contains(&ext.as_str())
    })
}

/// Whether the client lists `gzip`, `x-gzip` or `*` with a non-zero quality
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|coding| {
            let mut params = coding.split(';');
            let name = params.next().unwrap_or("").trim().to_ascii_lowercase();
            if !matches!(name.as_str(), "gzip" | "x-gzip" | "*") {
                return false;
            }
            quality(params) > 0.0
        })
}

fn quality<'a>(params: impl Iterator<Item = &'a str>) -> f32 {
    for param in params {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("q") {
                return value.trim().parse().unwrap_or(0.0);
            }
        }
    }
    1.0
}

/// Guess a content type from the leading bytes of a body
pub fn sniff_content_type(body: &[u8]) -> &'static str {
    let head = &body[..body.len().min(SNIFF_LEN)];

    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"%PDF-", "application/pdf"),
        (b"\x1f\x8b\x08", "application/x-gzip"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x00\x00\x01\x00", "image/x-icon"),
    ];
    for (magic, mime) in SIGNATURES {
        if head.starts_with(magic) {
            return mime;
        }
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return "image/webp";
    }

    let text = head.trim_ascii_start();
    const MARKUP: &[(&[u8], &str)] = &[
        (b"<!doctype html", "text/html; charset=utf-8"),
        (b"<html", "text/html; charset=utf-8"),
        (b"<head", "text/html; charset=utf-8"),
        (b"<body", "text/html; charset=utf-8"),
        (b"<svg", "image/svg+xml"),
        (b"<?xml", "text/xml; charset=utf-8"),
    ];
    for (prefix, mime) in MARKUP {
        if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
            return mime;
        }
    }

    let binary = head
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b));
    if binary {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}
