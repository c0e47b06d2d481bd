/// 项目元数据（自动从 Cargo.toml 同步）
pub mod metadata {
    pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    /// 命令行帮助中的详细描述
    pub const DESCRIPTION_LONG: &str = "接收上游仓库的 push Webhook，校验签名后检查最新发布，\
        下载并替换插件代码树，失败时自动回滚，并按数量保留历史备份";
}

/// 版本信息
pub mod version_info {
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

    pub const CORE_VERSION: &str = updater_core::constants::version::CORE_VERSION;
}
