use crate::cli::{BackupsCommand, Commands, SecretCommand};
use crate::commands;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use updater_core::config::AppConfig;
use updater_core::context::UpdaterContext;

pub struct CliApp {
    pub config_path: PathBuf,
    pub context: Arc<UpdaterContext>,
}

impl CliApp {
    /// 加载配置并构建应用上下文
    pub fn new(config_path: &Path) -> Result<Self> {
        let config = AppConfig::load_from_file(config_path)?;
        let context = UpdaterContext::from_config(config).context("初始化更新上下文失败")?;

        Ok(Self {
            config_path: config_path.to_path_buf(),
            context: Arc::new(context),
        })
    }

    pub fn config(&self) -> &AppConfig {
        self.context.config()
    }

    /// 运行应用命令
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { .. } => anyhow::bail!("init 命令不需要加载配置，应在加载前处理"),
            Commands::Serve { bind } => commands::run_serve(self, bind).await,
            Commands::Check => commands::run_check(self).await,
            Commands::Update => commands::run_update(self).await,
            Commands::Status => commands::run_status(self),
            Commands::Backups(cmd) => self.run_backups_command(cmd).await,
            Commands::Secret(cmd) => self.run_secret_command(cmd),
        }
    }

    async fn run_backups_command(&self, cmd: BackupsCommand) -> Result<()> {
        match cmd {
            BackupsCommand::List => commands::run_list_backups(self).await,
            BackupsCommand::Prune { keep } => commands::run_prune_backups(self, keep).await,
            BackupsCommand::Rollback { file } => {
                commands::run_rollback(self, file.as_deref()).await
            }
        }
    }

    fn run_secret_command(&self, cmd: SecretCommand) -> Result<()> {
        match cmd {
            SecretCommand::Show => commands::show_secret(self),
            SecretCommand::Regenerate => commands::regenerate_secret(self),
        }
    }
}
