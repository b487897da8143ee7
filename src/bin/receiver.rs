use std::process::ExitCode;

use ptp::config::ReceiverConfig;
use ptp::error::Error;

fn main() -> ExitCode {
    env_logger::init();

    let args = std::env::args().skip(1);
    let cfg = match ReceiverConfig::from_args(args) {
        Ok(cfg) => cfg,
        Err(Error::UsageError(msg)) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match ptp::receiver::run(cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
