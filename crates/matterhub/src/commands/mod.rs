//! Command dispatch: CLI args -> bridge store / engine -> output formatting.

pub mod bridges;
pub mod config_cmd;
pub mod preview;
pub mod storage;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a storage-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Bridges(args) => bridges::handle(config, args, global).await,
        Command::Storage(args) => storage::handle(config, args, global).await,
        Command::Preview(args) => preview::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
