mod claim;
mod commands;
mod init;
mod registry;
mod snapshot;
mod utils;

pub use claim::handle_claim;
pub use commands::{Cli, Commands};
pub use init::{generate_key, init_config, run_setup};
pub use registry::handle_registry;
pub use snapshot::handle_snapshot;
pub use utils::init_logging;
