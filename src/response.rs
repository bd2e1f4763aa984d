//! HTTP response builders
//!
//! Builders for the handful of responses this server produces,
//! decoupled from routing logic.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use tokio::fs;

/// Read the entry file from disk.
///
/// Called on every request so edits (and deletions) of the file are
/// observed immediately. No caching, no retry.
pub async fn load_static_file(path: &Path) -> std::io::Result<Vec<u8>> {
    fs::read(path).await
}

/// Build the 200 response carrying the entry file's bytes.
pub fn build_file_response(
    data: Vec<u8>,
    content_type: &str,
    server_name: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(data)
    };

    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Server", server_name)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Body of the 404 fallback, shared with access logging.
pub const NOT_FOUND_BODY: &str = "404 Not Found";

/// Build the explicit 404 fallback for every path except the root.
pub fn build_404_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(NOT_FOUND_BODY)))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from(NOT_FOUND_BODY)))
        })
}

/// Build the 500 returned when the entry file cannot be read.
pub fn build_500_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("500 Internal Server Error")))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(Full::new(Bytes::from("500 Internal Server Error")))
        })
}

fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
