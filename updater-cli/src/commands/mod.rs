pub mod backups;
pub mod check;
pub mod secret;
pub mod serve;
pub mod status;
pub mod update;

pub use backups::{run_list_backups, run_prune_backups, run_rollback};
pub use check::run_check;
pub use secret::{regenerate_secret, show_secret};
pub use serve::run_serve;
pub use status::run_status;
pub use update::run_update;
