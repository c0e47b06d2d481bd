use super::types::{PushPayload, WebhookResponse};
use crate::constants::webhook;
use crate::context::UpdaterContext;
use crate::signature;
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::{Span, info, instrument, warn};

/// Webhook 处理器
///
/// 签名校验 → 解析负载 → 事件/分支过滤 → 触发更新周期。
#[derive(Debug, Clone)]
pub struct WebhookHandler {
    context: Arc<UpdaterContext>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl WebhookHandler {
    pub fn new(context: Arc<UpdaterContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<UpdaterContext> {
        &self.context
    }

    #[instrument(skip_all, fields(event = tracing::field::Empty, delivery = tracing::field::Empty))]
    pub async fn handle(&self, raw_body: &[u8], headers: &HeaderMap) -> WebhookResponse {
        let span = Span::current();
        if let Some(delivery) = header_str(headers, webhook::DELIVERY_HEADER) {
            span.record("delivery", delivery);
        }

        // 每次请求都重新读取密钥，重新生成后立即生效；请求路径上不生成密钥
        let secret = match self.context.settings().webhook_secret() {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                warn!("🔒 尚未生成 Webhook 密钥，拒绝请求");
                return WebhookResponse::unauthorized();
            }
            Err(e) => {
                warn!("读取 Webhook 密钥失败: {}", e);
                return WebhookResponse::internal_error("settings unavailable");
            }
        };

        let signature_header = header_str(headers, webhook::SIGNATURE_HEADER).unwrap_or_default();
        if !signature::verify(raw_body, signature_header, secret.expose()) {
            warn!(
                "🔒 Webhook 签名校验失败 (signature header present: {})",
                !signature_header.is_empty()
            );
            return WebhookResponse::unauthorized();
        }

        let payload: serde_json::Value = match serde_json::from_slice(raw_body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Webhook 负载不是合法 JSON: {}", e);
                return WebhookResponse::bad_request("payload is not valid JSON");
            }
        };

        let Some(event) = header_str(headers, webhook::EVENT_HEADER) else {
            return WebhookResponse::bad_request("missing event header");
        };
        span.record("event", event);

        match event {
            "ping" => {
                info!("收到 ping 事件");
                WebhookResponse::ok("pong", "pong")
            }
            "push" => self.handle_push(payload).await,
            other => {
                info!("忽略事件: {}", other);
                WebhookResponse::ignored(format!("event '{other}' is not handled"))
            }
        }
    }

    async fn handle_push(&self, payload: serde_json::Value) -> WebhookResponse {
        let push: PushPayload = match serde_json::from_value(payload) {
            Ok(push) => push,
            Err(e) => {
                warn!("push 负载格式错误: {}", e);
                return WebhookResponse::bad_request("malformed push payload");
            }
        };

        let Some(git_ref) = push.git_ref.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
            return WebhookResponse::bad_request("missing ref");
        };

        // 标签等非分支 ref 属于正常投递
        let Some(branch) = git_ref
            .strip_prefix(webhook::BRANCH_REF_PREFIX)
            .filter(|branch| !branch.is_empty())
        else {
            info!("忽略非分支 ref 的 push: {}", git_ref);
            return WebhookResponse::ignored(format!("ref '{git_ref}' is not a branch"));
        };

        let Some(authoritative) = push
            .default_branch()
            .or_else(|| self.context.tracked_branch())
        else {
            info!("未知默认分支，忽略 push 到 {}", branch);
            return WebhookResponse::ignored("no tracked branch configured");
        };

        if branch != authoritative {
            info!("忽略非跟踪分支的 push: {} (跟踪 {})", branch, authoritative);
            return WebhookResponse::ignored(format!(
                "push to '{branch}' ignored, tracking '{authoritative}'"
            ));
        }

        info!("跟踪分支 {} 有新的 push，开始更新周期", branch);
        let summary = self.context.run_update_cycle().await;
        info!("更新周期结束: {}", summary.status_token());
        WebhookResponse::ok(summary.status_token(), summary.message())
    }
}
