//! Entry point for the `fleet` CLI. It parses arguments, dispatches to the
//! command handler, and maps errors to exit codes.

use fleet::cli::Cli;
use fleet::{commands, exit_codes, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse_args();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
