//! Retrace CLI Binary
//!
//! Thin entry point: parse arguments, initialize logging, execute the
//! command, and map errors onto the exit codes callers script against.

use clap::Parser;
use retrace::logging;
use retrace::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    // try_parse so bad flags exit 1, matching the configuration-error code.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    logging::init(cli.verbose, cli.command.debug());

    let context = CliContext::new(cli.state_file.clone());
    match context.execute(&cli.command) {
        Ok(output) => {
            print!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}
