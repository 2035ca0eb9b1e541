//! sched - find tasks that need automatic rescheduling

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = schedule_impact::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
