// Webhook HTTP 入口
//
// - POST /webhook: 校验签名后处理 ping / push 事件
// - GET /health: 存活检查

mod handler;
mod types;

pub use handler::WebhookHandler;
pub use types::{PushPayload, RepositoryInfo, WebhookBody, WebhookResponse};

use crate::constants::{version, webhook};
use crate::context::UpdaterContext;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Webhook 负载大小上限
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// 创建 Webhook 路由
pub fn create_router(context: Arc<UpdaterContext>) -> Router {
    let handler = WebhookHandler::new(context);

    Router::new()
        .route(webhook::ROUTE, post(receive_webhook))
        .route(webhook::HEALTH_ROUTE, get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn receive_webhook(
    State(handler): State<WebhookHandler>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    handler.handle(&body, &headers).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": version::CORE_VERSION }))
}
