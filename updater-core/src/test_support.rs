//! 测试辅助工具：本地模拟上游、代码树和更新包构造

use axum::Router;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// 在随机端口启动路由，返回 `http://127.0.0.1:<port>`
pub async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// GitHub `releases/latest` 响应
pub fn release_json(tag: &str, zipball_url: &str) -> serde_json::Value {
    serde_json::json!({
        "tag_name": tag,
        "name": format!("Release {tag}"),
        "zipball_url": zipball_url,
        "published_at": "2025-06-01T12:00:00Z",
        "body": "Release notes",
    })
}

pub fn main_file_content(version: &str) -> String {
    format!("<?php\n/**\n * Plugin Name: Demo\n * Version: {version}\n */\n")
}

/// 写入带主文件和一个子目录文件的代码树
pub fn write_live_tree(dir: &Path, main_file: &str, version: &str) {
    std::fs::create_dir_all(dir.join("includes")).unwrap();
    std::fs::write(dir.join(main_file), main_file_content(version)).unwrap();
    std::fs::write(
        dir.join("includes").join("core.php"),
        format!("<?php // core {version}\n"),
    )
    .unwrap();
}

/// 构造 GitHub zipball 风格的更新包（所有文件位于 `{top_level}/` 下）
pub fn build_package(top_level: &str, main_file: &str, version: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.add_directory(format!("{top_level}/"), options).unwrap();
    writer
        .start_file(format!("{top_level}/{main_file}"), options)
        .unwrap();
    writer
        .write_all(main_file_content(version).as_bytes())
        .unwrap();
    writer
        .add_directory(format!("{top_level}/includes/"), options)
        .unwrap();
    writer
        .start_file(format!("{top_level}/includes/core.php"), options)
        .unwrap();
    writer
        .write_all(format!("<?php // core {version}\n").as_bytes())
        .unwrap();

    writer.finish().unwrap().into_inner()
}
