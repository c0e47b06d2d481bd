mod app;
mod cli;
mod commands;
mod init;
pub mod project_info;
mod utils;

pub use app::CliApp;
pub use cli::{BackupsCommand, Cli, Commands, SecretCommand};
pub use init::run_init;
pub use utils::{format_size, setup_logging};
