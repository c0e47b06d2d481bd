use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// push 事件负载中用到的字段
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub repository: Option<RepositoryInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: Option<String>,
    pub default_branch: Option<String>,
}

impl PushPayload {
    /// 仓库报告的默认分支
    pub fn default_branch(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .and_then(|repo| repo.default_branch.as_deref())
            .filter(|branch| !branch.trim().is_empty())
    }
}

/// 响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookBody {
    pub status: String,
    pub message: String,
}

/// Webhook 处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: WebhookBody,
}

impl WebhookResponse {
    pub fn new(status: StatusCode, token: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: WebhookBody {
                status: token.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn ok(token: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, token, message)
    }

    pub fn ignored(message: impl Into<String>) -> Self {
        Self::ok("ignored", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "invalid signature")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "error", message)
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
