use clap::Parser;
use tracing::error;
use updater_cli::{Cli, CliApp, Commands, run_init, setup_logging};
use updater_core::UpdaterError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // `init` 不需要预先加载配置
    if let Commands::Init { force } = cli.command {
        if let Err(e) = run_init(&cli.config, force) {
            error!("❌ 初始化失败: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    let app = match CliApp::new(&cli.config) {
        Ok(app) => app,
        Err(e) => {
            let config_missing = e
                .chain()
                .any(|cause| {
                    matches!(
                        cause.downcast_ref::<UpdaterError>(),
                        Some(UpdaterError::ConfigNotFound(_))
                    )
                });
            if config_missing {
                error!("❌ 配置文件 '{}' 未找到。", cli.config.display());
                error!("👉 请先运行 'updater-cli init' 命令来创建配置文件。");
            } else {
                error!("❌ 应用初始化失败: {:#}", e);
            }
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run(cli.command).await {
        error!("❌ 操作失败: {:#}", e);
        std::process::exit(1);
    }
}
