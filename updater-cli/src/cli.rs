use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 备份管理相关命令
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum BackupsCommand {
    /// 列出所有备份
    List,
    /// 清理旧备份
    Prune {
        /// 保留的备份数量（默认使用配置中的 backup.keep）
        #[arg(long)]
        keep: Option<usize>,
    },
    /// 从备份恢复代码树
    Rollback {
        /// 备份文件路径或文件名（默认使用最新备份）
        #[arg(long)]
        file: Option<String>,
    },
}

/// Webhook 密钥相关命令
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SecretCommand {
    /// 显示当前密钥（首次访问时生成）
    Show,
    /// 重新生成密钥，旧密钥立即失效
    Regenerate,
}

/// Plugin Updater CLI
#[derive(Parser, Debug)]
#[command(name = "updater-cli")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml", env = "UPDATER_CONFIG")]
    pub config: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// 创建默认配置文件和目录
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 启动 Webhook 服务
    Serve {
        /// 覆盖配置中的监听地址
        #[arg(long)]
        bind: Option<String>,
    },
    /// 检查上游最新发布
    Check,
    /// 执行完整更新周期（检查 → 安装 → 清理），可由 cron 调用
    Update,
    /// 显示版本、检查记录和备份状态
    Status,
    /// 备份管理
    #[command(subcommand)]
    Backups(BackupsCommand),
    /// Webhook 密钥管理
    #[command(subcommand)]
    Secret(SecretCommand),
}
