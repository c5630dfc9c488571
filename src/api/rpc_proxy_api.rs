//! 节点 RPC 代理
//!
//! - `POST /api/v1/nodes/rpc/:id`：转发到节点 HTTP RPC，并向事件通道发布请求与完成事件
//! - `GET  /api/v1/nodes/rpc/:id`：WebSocket 升级后与节点 WS RPC 双向桥接
//! - `GET  /api/v1/nodes/rpc/:id/sse`：以 SSE 推送该节点的 RPC 事件

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        OriginalUri, Path, State,
    },
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Extension, Router,
};
use futures::{SinkExt, Stream, StreamExt};
use tokio::{net::TcpStream, sync::broadcast::error::RecvError};
use tokio_tungstenite::{
    tungstenite::Message as UpstreamMessage, MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use crate::{
    api::{middleware::TraceId, node_api::parse_node_id},
    app_state::AppState,
    error::AppError,
    infrastructure::rpc_events::{RpcEvent, RpcEventResponse},
};

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id", get(proxy_ws).post(proxy_http))
        .route("/:id/sse", get(rpc_events_sse))
}

/// header map 编码为 `{ name: [values] }` JSON
fn headers_json<'a>(headers: impl Iterator<Item = (&'a str, &'a [u8])>) -> String {
    let mut map: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(name)
            .or_default()
            .push(String::from_utf8_lossy(value).into_owned());
    }
    serde_json::to_string(&map).unwrap_or_default()
}

#[utoipa::path(
    post,
    path = "/api/v1/nodes/rpc/{id}",
    params(("id" = String, Path, description = "Node UUID")),
    responses(
        (status = 200, description = "Upstream JSON-RPC response, passed through"),
        (status = 404, description = "Unknown node", body = crate::error_body::ErrorBodyDoc),
        (status = 502, description = "Upstream unreachable", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn proxy_http(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let node_id = parse_node_id(&id).map_err(|e| trace_id.attach(e))?;
    let node = st
        .node_service
        .get(node_id)
        .await
        .map_err(|e| trace_id.attach(e))?;
    let rpc_url = node.rpc.http;

    let started = Instant::now();
    let mut event = RpcEvent::new(rpc_url.clone(), uri.to_string());
    event.request.headers = headers_json(headers.iter().map(|(k, v)| (k.as_str(), v.as_bytes())));
    event.request.body = String::from_utf8_lossy(&body).into_owned();

    tracing::info!(
        node_id = %node_id,
        rpc_url = %rpc_url,
        body = %event.request.body,
        "proxying rpc request"
    );
    st.events.publish(node_id, event.clone()).await;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();

    let upstream = st
        .http
        .post(&rpc_url)
        .header(reqwest::header::CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(node_id = %node_id, error = %e, "rpc upstream unreachable");
            trace_id.attach(AppError::rpc_error(format!("failed to reach node rpc: {}", e)))
        })?;

    let status = upstream.status().as_u16();
    let upstream_content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .map(|v| v.as_bytes().to_vec());
    let response_headers = headers_json(
        upstream
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_bytes())),
    );
    let response_body = upstream.bytes().await.map_err(|e| {
        trace_id.attach(AppError::rpc_error(format!("failed to read node rpc response: {}", e)))
    })?;

    event.response = RpcEventResponse {
        headers: response_headers,
        body: String::from_utf8_lossy(&response_body).into_owned(),
        status_code: status,
    };
    event.duration = Some(started.elapsed().as_millis() as u64);

    tracing::info!(
        node_id = %node_id,
        status = status,
        duration_ms = ?event.duration,
        "proxied rpc response"
    );
    st.events.publish(node_id, event).await;

    let mut response = Response::new(Body::from(response_body));
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    if let Some(value) = upstream_content_type.and_then(|v| HeaderValue::from_bytes(&v).ok()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(response)
}

pub async fn proxy_ws(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let node_id = parse_node_id(&id).map_err(|e| trace_id.attach(e))?;
    let node = st
        .node_service
        .get(node_id)
        .await
        .map_err(|e| trace_id.attach(e))?;

    let ws_url = node
        .rpc
        .ws
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            trace_id.attach(AppError::bad_request(format!(
                "node {} has no websocket rpc url",
                node_id
            )))
        })?;

    let (upstream, _) = tokio_tungstenite::connect_async(ws_url.as_str())
        .await
        .map_err(|e| {
            tracing::warn!(node_id = %node_id, error = %e, "ws upstream unreachable");
            trace_id.attach(AppError::rpc_error(format!("failed to reach node ws rpc: {}", e)))
        })?;

    tracing::info!(node_id = %node_id, ws_url = %ws_url, "proxying websocket rpc");
    Ok(ws
        .on_upgrade(move |socket| bridge(socket, upstream, node_id))
        .into_response())
}

fn to_upstream(msg: Message) -> UpstreamMessage {
    match msg {
        Message::Text(text) => UpstreamMessage::Text(text),
        Message::Binary(data) => UpstreamMessage::Binary(data),
        Message::Ping(data) => UpstreamMessage::Ping(data),
        Message::Pong(data) => UpstreamMessage::Pong(data),
        Message::Close(_) => UpstreamMessage::Close(None),
    }
}

fn to_client(msg: UpstreamMessage) -> Option<Message> {
    match msg {
        UpstreamMessage::Text(text) => Some(Message::Text(text)),
        UpstreamMessage::Binary(data) => Some(Message::Binary(data)),
        UpstreamMessage::Ping(data) => Some(Message::Ping(data)),
        UpstreamMessage::Pong(data) => Some(Message::Pong(data)),
        UpstreamMessage::Close(_) => Some(Message::Close(None)),
        UpstreamMessage::Frame(_) => None,
    }
}

/// 双向转发，任一方向结束即关闭两端
async fn bridge(client: WebSocket, upstream: UpstreamSocket, node_id: Uuid) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = client_rx.next().await {
            let msg = to_upstream(msg);
            let closing = msg.is_close();
            if upstream_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
        let _ = upstream_tx.close().await;
    };

    let upstream_to_client = async {
        while let Some(Ok(msg)) = upstream_rx.next().await {
            let Some(msg) = to_client(msg) else { continue };
            let closing = matches!(msg, Message::Close(_));
            if client_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
        let _ = client_tx.close().await;
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
    tracing::debug!(node_id = %node_id, "websocket rpc proxy closed");
}

#[utoipa::path(
    get,
    path = "/api/v1/nodes/rpc/{id}/sse",
    params(("id" = String, Path, description = "Node UUID")),
    responses(
        (status = 200, description = "text/event-stream of RPC events"),
        (status = 404, description = "Node has not been proxied yet", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn rpc_events_sse(
    State(st): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let node_id = parse_node_id(&id).map_err(|e| trace_id.attach(e))?;
    let rx = st.events.subscribe(node_id).await.ok_or_else(|| {
        trace_id.attach(AppError::not_found(format!(
            "node subscriber not found: {}",
            node_id
        )))
    })?;

    let stream = futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Event::default().json_data(&event), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(node_id = %node_id, skipped, "sse subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
