/// # 日志配置
///
/// - 库代码只使用 `tracing` 宏，订阅者由 CLI 入口统一设置
/// - `-v, --verbose` 启用 DEBUG 级别，`RUST_LOG` 可覆盖
/// - `UPDATER_LOG_FILE` 设置后日志写入文件（包含模块路径和行号）
///
/// ```bash
/// UPDATER_LOG_FILE=updater.log updater-cli serve
/// RUST_LOG=updater_core::installer=debug updater-cli update
/// ```
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_file = std::env::var(LOG_FILE_ENV).ok().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| eprintln!("无法打开日志文件 {path}: {e}，改为输出到终端"))
            .ok()
    });

    if let Some(file) = log_file {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .compact()
            .init();
    }
}

/// 日志文件环境变量
pub const LOG_FILE_ENV: &str = "UPDATER_LOG_FILE";

/// 人类可读的文件大小
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size >= GB {
        format!("{:.1}GB", size / GB)
    } else if size >= MB {
        format!("{:.1}MB", size / MB)
    } else if size >= KB {
        format!("{:.1}KB", size / KB)
    } else {
        format!("{bytes}B")
    }
}
