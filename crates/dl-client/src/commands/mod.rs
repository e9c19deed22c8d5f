//! CLI command implementations

mod config;
mod snapshot;
mod watch;

pub use config::{config_get, config_init, config_show, load_client_config};
pub use snapshot::{snapshot_command, snapshot_dispatcher};
pub use watch::watch_command;
