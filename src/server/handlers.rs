use axum::body::{self, Bytes};
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header::ALLOW;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use http_body_util::LengthLimitError;
use std::sync::Arc;

use super::dispatcher::{Dispatcher, Reply};
use super::request::ApiRequest;

/// Worst-case growth of a payload once escaped inside a JSON string (`\u00XX`).
const JSON_ESCAPE_RATIO: usize = 6;

/// Room left for the other JSON fields and framing.
const BODY_LIMIT_OVERHEAD: usize = 1024 * 1024;

/// Largest body buffered for a backend accepting `max_record_size` byte records.
///
/// Any payload within the record limit fits, however it is encoded. Larger bodies are
/// dropped and reported by the dispatcher as an oversized payload.
pub fn transport_body_limit(max_record_size: usize) -> usize {
    max_record_size
        .saturating_mul(JSON_ESCAPE_RATIO)
        .saturating_add(BODY_LIMIT_OVERHEAD)
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(envelope) => (self.status, Json(envelope)).into_response(),
            None => self.status.into_response(),
        };
        if let Some(allow) = self.allow {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

/// Single entry point for every method and path.
pub async fn dispatch(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Reply {
    let (parts, body) = request.into_parts();
    let limit = transport_body_limit(dispatcher.limits().max_record_size);

    let (body, oversized) = match body::to_bytes(body, limit).await {
        Ok(bytes) => (bytes, false),
        Err(err) => {
            let source = err.into_inner();
            let oversized = source.is::<LengthLimitError>();
            if !oversized {
                tracing::warn!("Failed to read request body: {}", source);
            }
            (Bytes::new(), oversized)
        }
    };

    let mut request = ApiRequest::new(parts.method, &parts.uri, parts.headers, body);
    if oversized {
        request = request.with_oversized_body();
    }

    let reply = dispatcher.handle(&request).await;
    tracing::info!(
        "{} {} : {}",
        request.method,
        request.path,
        reply.status.as_u16()
    );
    reply
}

/// Router with the dispatcher installed as the fallback for every path.
///
/// The body is buffered by [`dispatch`] itself, bounded by [`transport_body_limit`],
/// so an oversized request still gets an envelope in the usual check order.
pub fn build_app(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new().fallback(dispatch).with_state(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limit_covers_fully_escaped_record() {
        let max_record_size = 1000;
        let escaped = serde_json::to_string(&"\u{1}".repeat(max_record_size)).unwrap();

        assert!(escaped.len() <= transport_body_limit(max_record_size));
        assert_eq!(transport_body_limit(usize::MAX), usize::MAX);
    }
}
