//! # 下载模块
//!
//! 将发布包以流式方式写入临时文件，并提供 SHA-256 计算工具。
//!
//! - 所有请求带统一的 User-Agent 和超时
//! - 访问令牌只发送给与 API 同一主机的下载地址
//! - 下载失败时清理不完整的文件

use crate::constants::http;
use crate::error::{Result, UpdaterError};
use futures_util::StreamExt;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

/// 创建带统一 User-Agent 和超时的 HTTP 客户端
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(http::user_agent())
        .build()
        .map_err(UpdaterError::from)
}

/// 文件下载器
#[derive(Debug, Clone)]
pub struct FileDownloader {
    client: Client,
    /// 可以携带访问令牌的主机（API 所在主机）
    trusted_host: Option<String>,
    auth_token: Option<String>,
}

impl FileDownloader {
    pub fn new(timeout: Duration, api_base_url: &str, auth_token: Option<String>) -> Result<Self> {
        let trusted_host = Url::parse(api_base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        Ok(Self {
            client: build_http_client(timeout)?,
            trusted_host,
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// 下载地址是否允许携带访问令牌
    fn should_send_token(&self, url: &str) -> bool {
        let Some(trusted) = self.trusted_host.as_deref() else {
            return false;
        };
        Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host == trusted))
            .unwrap_or(false)
    }

    /// 下载文件到指定路径，返回写入的字节数
    pub async fn download(&self, url: &str, target: &Path) -> Result<u64> {
        info!("📥 开始下载: {}", url);

        match self.download_inner(url, target).await {
            Ok(size) => {
                info!(
                    "✅ 下载完成: {} ({:.2} MB)",
                    target.display(),
                    size as f64 / 1024.0 / 1024.0
                );
                Ok(size)
            }
            Err(e) => {
                if target.exists() {
                    if let Err(remove_err) = tokio::fs::remove_file(target).await {
                        warn!("清理不完整下载失败 {}: {}", target.display(), remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    async fn download_inner(&self, url: &str, target: &Path) -> Result<u64> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut request = self.client.get(url);
        if let Some(token) = self.auth_token.as_deref() {
            if self.should_send_token(url) {
                request = request.bearer_auth(token.trim());
            } else {
                debug!("下载地址不在 API 主机下，不发送访问令牌");
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpdaterError::download(format!("请求失败: {e}")))?;

        if !response.status().is_success() {
            return Err(UpdaterError::download(format!(
                "服务器响应错误: HTTP {}",
                response.status()
            )));
        }

        let mut file = File::create(target).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdaterError::download(format!("下载数据失败: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdaterError::download(format!("写入文件失败: {e}")))?;
            downloaded += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| UpdaterError::download(format!("刷新文件缓冲区失败: {e}")))?;

        if downloaded == 0 {
            return Err(UpdaterError::download("下载内容为空"));
        }

        Ok(downloaded)
    }
}

/// 计算文件的 SHA-256 哈希值
pub async fn calculate_file_hash(file_path: &Path) -> Result<String> {
    let mut file = File::open(file_path).await.map_err(|e| {
        UpdaterError::custom(format!("无法打开文件 {}: {}", file_path.display(), e))
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// 校验文件哈希（忽略大小写）
pub async fn verify_file_integrity(file_path: &Path, expected_hash: &str) -> Result<bool> {
    let actual_hash = calculate_file_hash(file_path).await?;
    let matches = actual_hash.eq_ignore_ascii_case(expected_hash);

    if !matches {
        warn!("❌ 文件完整性验证失败: {}", file_path.display());
        warn!("   期望哈希: {}", expected_hash);
        warn!("   实际哈希: {}", actual_hash);
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::{Router, routing::get};
    use tempfile::tempdir;

    fn token_echo_router() -> Router {
        Router::new()
            .route(
                "/pkg.zip",
                get(|headers: HeaderMap| async move {
                    match headers.get("authorization") {
                        Some(_) => "with-token".into_response(),
                        None => "no-token".into_response(),
                    }
                }),
            )
            .route("/missing.zip", get(|| async { StatusCode::NOT_FOUND }))
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let temp_dir = tempdir().unwrap();
        let base_url = spawn_router(token_echo_router()).await;
        let downloader =
            FileDownloader::new(Duration::from_secs(5), &base_url, None).unwrap();

        let target = temp_dir.path().join("nested").join("pkg.zip");
        let size = downloader
            .download(&format!("{base_url}/pkg.zip"), &target)
            .await
            .unwrap();

        assert_eq!(size, 8);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "no-token");
    }

    #[tokio::test]
    async fn test_token_only_sent_to_api_host() {
        let temp_dir = tempdir().unwrap();
        let base_url = spawn_router(token_echo_router()).await;
        let target = temp_dir.path().join("pkg.zip");

        let same_host =
            FileDownloader::new(Duration::from_secs(5), &base_url, Some("t0k".to_string()))
                .unwrap();
        same_host
            .download(&format!("{base_url}/pkg.zip"), &target)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "with-token");

        let other_host = FileDownloader::new(
            Duration::from_secs(5),
            "https://api.github.com",
            Some("t0k".to_string()),
        )
        .unwrap();
        other_host
            .download(&format!("{base_url}/pkg.zip"), &target)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "no-token");
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_file() {
        let temp_dir = tempdir().unwrap();
        let base_url = spawn_router(token_echo_router()).await;
        let downloader =
            FileDownloader::new(Duration::from_secs(5), &base_url, None).unwrap();

        let target = temp_dir.path().join("pkg.zip");
        let result = downloader
            .download(&format!("{base_url}/missing.zip"), &target)
            .await;

        assert!(matches!(result, Err(UpdaterError::Download(_))));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_file_hash_and_integrity() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, b"abc").unwrap();

        let hash = calculate_file_hash(&path).await.unwrap();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(verify_file_integrity(&path, &hash.to_uppercase()).await.unwrap());
        assert!(!verify_file_integrity(&path, "deadbeef").await.unwrap());
    }
}
