use crate::constants::upstream;
use crate::downloader::build_http_client;
use crate::models::ReleaseInfo;
use crate::settings::SettingsManager;
use crate::{Result, UpdaterError, version};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// GitHub Release API 响应结构
///
/// 字段全部可选，缺失的必填字段由 [`ReleaseChecker`] 转成明确的失败原因。
#[derive(Debug, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: Option<String>,
    pub zipball_url: Option<String>,
    pub published_at: Option<String>,
    pub body: Option<String>,
}

/// 版本检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// 上游版本更新
    UpdateAvailable(ReleaseInfo),
    /// 已是最新版本
    NoUpdateAvailable { latest: String },
    /// 检查失败，附带诊断信息
    CheckFailed(String),
}

impl CheckOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckOutcome::CheckFailed(_))
    }
}

/// 将 `https://github.com/owner/repo(.git)` 或 `owner/repo` 统一为 `owner/repo`
pub fn normalize_repository(repository: &str) -> String {
    let trimmed = repository.trim().trim_end_matches('/');
    let without_host = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .or_else(|| trimmed.strip_prefix("github.com/"))
        .unwrap_or(trimmed);
    without_host
        .strip_suffix(".git")
        .unwrap_or(without_host)
        .to_string()
}

/// 上游发布检查器
#[derive(Debug, Clone)]
pub struct ReleaseChecker {
    client: Client,
    api_base_url: String,
    settings: SettingsManager,
}

impl ReleaseChecker {
    pub fn new(api_base_url: &str, timeout: Duration, settings: SettingsManager) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            settings,
        })
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// 获取最新发布 API URL
    pub fn latest_release_url(&self, repository: &str) -> String {
        let path = upstream::LATEST_RELEASE_PATH
            .replace("{repository}", &normalize_repository(repository));
        format!("{}{}", self.api_base_url, path)
    }

    /// 检查上游是否有比 `current_version` 更新的发布
    ///
    /// 失败时不会修改版本相关的持久化状态，也不会在内部重试。
    pub async fn check(
        &self,
        current_version: &str,
        repository: &str,
        auth_token: Option<&str>,
    ) -> CheckOutcome {
        let release = match self.fetch_latest(repository, auth_token).await {
            Ok(release) => release,
            Err(e) => {
                warn!("检查更新失败: {}", e);
                return CheckOutcome::CheckFailed(e.to_string());
            }
        };

        let release = match Self::to_release_info(release) {
            Ok(release) => release,
            Err(e) => {
                warn!("上游发布信息无效: {}", e);
                return CheckOutcome::CheckFailed(e.to_string());
            }
        };

        let newer = match version::is_newer(current_version, &release.version) {
            Ok(newer) => newer,
            Err(e) => {
                warn!("版本比较失败: {}", e);
                return CheckOutcome::CheckFailed(e.to_string());
            }
        };

        let checked_at = Utc::now();
        if newer {
            info!(
                "发现新版本: {} -> {}",
                current_version, release.version
            );
            self.persist_check(checked_at, Some(&release));
            CheckOutcome::UpdateAvailable(release)
        } else {
            info!(
                "已是最新版本: 当前 {}，上游 {}",
                current_version, release.version
            );
            self.persist_check(checked_at, None);
            CheckOutcome::NoUpdateAvailable {
                latest: release.version,
            }
        }
    }

    fn persist_check(&self, checked_at: DateTime<Utc>, release: Option<&ReleaseInfo>) {
        if let Err(e) = self.settings.set_last_checked_at(checked_at) {
            warn!("保存检查时间失败: {}", e);
        }
        if let Err(e) = self.settings.set_cached_release(release) {
            warn!("保存发布缓存失败: {}", e);
        }
    }

    /// 从上游获取最新发布
    async fn fetch_latest(&self, repository: &str, auth_token: Option<&str>) -> Result<GitHubRelease> {
        let url = self.latest_release_url(repository);
        debug!("正在检查最新版本: {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, upstream::ACCEPT_HEADER);
        if let Some(token) = auth_token.filter(|t| !t.trim().is_empty()) {
            request = request.bearer_auth(token.trim());
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpdaterError::release(format!("无法连接到上游 API: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpdaterError::release(format!(
                "仓库 {repository} 没有已发布的版本"
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpdaterError::release(format!(
                "上游 API 请求失败: {status} - {}",
                error_text.chars().take(200).collect::<String>()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpdaterError::release(format!("读取上游响应失败: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| UpdaterError::release(format!("上游响应格式错误: {e}")))
    }

    fn to_release_info(release: GitHubRelease) -> Result<ReleaseInfo> {
        let tag_name = release
            .tag_name
            .filter(|tag| !tag.trim().is_empty())
            .ok_or_else(|| UpdaterError::release("响应缺少 tag_name"))?;
        let download_url = release
            .zipball_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| UpdaterError::release("响应缺少 zipball_url"))?;

        // 先校验版本号是否可解析
        version::parse(&tag_name)?;

        let published_at = release.published_at.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|time| time.with_timezone(&Utc))
                .map_err(|e| warn!("发布时间格式无法解析 {}: {}", raw, e))
                .ok()
        });

        Ok(ReleaseInfo {
            version: version::normalize(&tag_name).to_string(),
            download_url,
            published_at,
            notes: release.body.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use crate::test_support::{release_json, spawn_router};
    use axum::response::IntoResponse;
    use axum::{Json, Router, http::HeaderMap, routing::get};
    use std::sync::Arc;

    fn settings() -> SettingsManager {
        SettingsManager::new(Arc::new(MemoryStore::new()))
    }

    async fn checker_for(router: Router, settings: SettingsManager) -> ReleaseChecker {
        let base_url = spawn_router(router).await;
        ReleaseChecker::new(&base_url, Duration::from_secs(5), settings).unwrap()
    }

    fn static_release(tag: &'static str) -> Router {
        Router::new().route(
            "/repos/acme/demo/releases/latest",
            get(move || async move { Json(release_json(tag, "http://unused/pkg.zip")) }),
        )
    }

    #[test]
    fn test_normalize_repository() {
        assert_eq!(normalize_repository("acme/demo"), "acme/demo");
        assert_eq!(
            normalize_repository("https://github.com/ediblesites/snippet-aggregator"),
            "ediblesites/snippet-aggregator"
        );
        assert_eq!(normalize_repository("https://github.com/acme/demo.git/"), "acme/demo");
    }

    #[tokio::test]
    async fn test_prefixed_newer_version_is_update() {
        let settings = settings();
        let checker = checker_for(static_release("v2.1.0"), settings.clone()).await;

        let outcome = checker.check("2.0.9", "acme/demo", None).await;
        let CheckOutcome::UpdateAvailable(release) = outcome else {
            panic!("expected update, got {outcome:?}");
        };
        assert_eq!(release.version, "2.1.0");
        assert_eq!(release.notes, "Release notes");
        assert!(release.published_at.is_some());

        assert_eq!(settings.cached_release().unwrap(), Some(release));
        assert!(settings.last_checked_at().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_equal_version_is_no_update() {
        let settings = settings();
        let checker = checker_for(static_release("v2.1.0"), settings.clone()).await;

        let outcome = checker.check("2.1.0", "acme/demo", None).await;
        assert_eq!(
            outcome,
            CheckOutcome::NoUpdateAvailable {
                latest: "2.1.0".to_string()
            }
        );
        assert!(settings.last_checked_at().unwrap().is_some());
        assert!(settings.cached_release().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_tag_is_check_failure() {
        let router = Router::new().route(
            "/repos/acme/demo/releases/latest",
            get(|| async { Json(serde_json::json!({ "zipball_url": "http://x/pkg.zip" })) }),
        );
        let settings = settings();
        settings.set_current_version("1.0.0").unwrap();
        let checker = checker_for(router, settings.clone()).await;

        let outcome = checker.check("1.0.0", "acme/demo", None).await;
        assert!(matches!(outcome, CheckOutcome::CheckFailed(ref reason) if reason.contains("tag_name")));
        assert!(settings.last_checked_at().unwrap().is_none());
        assert_eq!(settings.current_version().unwrap(), Some("1.0.0".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_body_is_check_failure() {
        let router = Router::new().route(
            "/repos/acme/demo/releases/latest",
            get(|| async { "<html>rate limited</html>" }),
        );
        let checker = checker_for(router, settings()).await;
        let outcome = checker.check("1.0.0", "acme/demo", None).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_missing_release_is_check_failure() {
        let checker = checker_for(Router::new(), settings()).await;
        let outcome = checker.check("1.0.0", "acme/demo", None).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_check_failure() {
        let checker =
            ReleaseChecker::new("http://127.0.0.1:9", Duration::from_secs(2), settings()).unwrap();
        let outcome = checker.check("1.0.0", "acme/demo", None).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_client_headers_and_token_are_sent() {
        let router = Router::new().route(
            "/repos/acme/private/releases/latest",
            get(|headers: HeaderMap| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer s3cr3t");
                let agent = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if authorized && agent.starts_with("updater-cli/") {
                    Json(release_json("3.0.0", "http://unused/pkg.zip")).into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }),
        );
        let checker = checker_for(router, settings()).await;

        assert!(checker.check("1.0.0", "acme/private", None).await.is_failure());
        assert!(matches!(
            checker.check("1.0.0", "acme/private", Some("s3cr3t")).await,
            CheckOutcome::UpdateAvailable(_)
        ));
    }
}
