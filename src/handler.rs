use crate::config::AppState;
use crate::logger;
use crate::mime;
use crate::response;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Main entry point for HTTP request handling.
///
/// The root path serves the entry file on any method (HEAD gets the
/// headers only). Every other path falls through to an explicit 404;
/// there is deliberately no other routing.
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method();
    let uri = req.uri();
    let path = uri.path();
    let is_head = *method == Method::HEAD;

    let access_log = state.config.logging.access_log;
    if access_log {
        logger::log_request(method, uri, req.version());
    }

    if path == "/" {
        return Ok(serve_entry_file(&state, is_head).await);
    }

    if access_log {
        logger::log_response(404, response::NOT_FOUND_BODY.len());
    }
    Ok(response::build_404_response())
}

/// Read the entry file and build the response for the root path.
///
/// A read failure is a per-request 500, never a crash: the file may
/// reappear before the next request.
pub async fn serve_entry_file(state: &Arc<AppState>, is_head: bool) -> Response<Full<Bytes>> {
    match response::load_static_file(&state.static_file).await {
        Ok(content) => {
            let content_type = mime::get_content_type(
                state.static_file.extension().and_then(|e| e.to_str()),
            );
            if state.config.logging.access_log {
                logger::log_response(200, content.len());
            }
            response::build_file_response(
                content,
                content_type,
                &state.config.http.server_name,
                is_head,
            )
        }
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read entry file '{}': {e}",
                state.static_file.display()
            ));
            response::build_500_response()
        }
    }
}
