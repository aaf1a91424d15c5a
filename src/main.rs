use std::process::ExitCode;

use colored::Colorize;
use zeroapi_json::cli::{self, Outcome};

fn main() -> ExitCode {
    let command_line_interface = cli::CommandLineInterface::load();
    command_line_interface.init_logging();
    match command_line_interface.run() {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::SomeFailed) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
