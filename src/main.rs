//! dacdoc - verify the claims embedded in documentation

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = dacdoc::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
