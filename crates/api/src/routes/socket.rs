//! Operator WebSocket.
//!
//! Identity comes from the authenticating proxy in front of this server,
//! as the `operator_id` query parameter or the `x-operator-id` header.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use fanout::{ClientFrame, ServerFrame};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the operator identity.
pub const OPERATOR_HEADER: &str = "x-operator-id";

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub operator_id: Option<String>,
}

/// Upgrade an authenticated operator to a live session.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(operator_id) = operator_identity(&query, &headers) else {
        return ApiError::BadRequest("missing operator identity".to_string()).into_response();
    };

    ws.on_upgrade(move |socket| run_session(state, socket, operator_id))
        .into_response()
}

/// Query parameter first, then the header. Blank values count as missing.
pub fn operator_identity(query: &SocketQuery, headers: &HeaderMap) -> Option<String> {
    query
        .operator_id
        .clone()
        .or_else(|| {
            headers
                .get(OPERATOR_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

async fn run_session(state: AppState, socket: WebSocket, operator_id: String) {
    let (mut sink, mut stream) = socket.split();
    let mut conn = state.gateway.connect(&operator_id);
    info!(connection_id = conn.id(), operator_id = %operator_id, "Operator connected");

    'session: loop {
        tokio::select! {
            incoming = stream.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };

                let reply = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => state.gateway.handle_frame(&mut conn, frame).await,
                    Err(e) => ServerFrame::error(format!("Invalid frame: {}", e)),
                };
                if send_frame(&mut sink, &reply).await.is_err() {
                    break;
                }
            }
            frames = state.gateway.next_frames(&mut conn) => {
                for frame in &frames {
                    if send_frame(&mut sink, frame).await.is_err() {
                        break 'session;
                    }
                }
            }
        }
    }

    state.gateway.close(&mut conn);
    info!(connection_id = conn.id(), operator_id = %operator_id, "Operator disconnected");
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "Failed to encode frame");
            return Ok(());
        }
    };
    sink.send(Message::Text(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_query_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(OPERATOR_HEADER, HeaderValue::from_static("from-header"));
        let query = SocketQuery {
            operator_id: Some("from-query".to_string()),
        };
        assert_eq!(operator_identity(&query, &headers).as_deref(), Some("from-query"));
    }

    #[test]
    fn test_header_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(OPERATOR_HEADER, HeaderValue::from_static(" op-7 "));
        assert_eq!(
            operator_identity(&SocketQuery::default(), &headers).as_deref(),
            Some("op-7")
        );
    }

    #[test]
    fn test_missing_identity() {
        let query = SocketQuery {
            operator_id: Some("  ".to_string()),
        };
        assert_eq!(operator_identity(&query, &HeaderMap::new()), None);
        assert_eq!(operator_identity(&SocketQuery::default(), &HeaderMap::new()), None);
    }
}
