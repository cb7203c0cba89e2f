use clap::Parser;

use crate::args::{Command, ProxyArgs};
use crate::capture::run_capture;
use crate::error::AppResult;
use crate::replay::run_replay;

/// Parse the command line, install logging and run the chosen component on
/// a fresh multi-threaded runtime.
///
/// # Errors
///
/// Returns an error if arguments are invalid or the component fails.
pub fn run() -> AppResult<()> {
    let args = ProxyArgs::parse();

    crate::logger::init_logging(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(execute(args.command))
}

async fn execute(command: Command) -> AppResult<()> {
    match command {
        Command::Capture(capture_args) => run_capture(&capture_args).await,
        Command::Replay(replay_args) => {
            run_replay(&replay_args).await?;
            Ok(())
        }
    }
}
