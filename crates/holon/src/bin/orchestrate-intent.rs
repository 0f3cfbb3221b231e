//! orchestrate-intent binary entry point

use std::process::ExitCode;

use clap::Parser;
use holon::cli::{exit_code, usage_error, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let usage = usage_error(&err);
            let _ = err.print();
            return ExitCode::from(u8::try_from(usage.exit_code()).unwrap_or(2));
        }
        Err(err) => {
            // --help and --version
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
    };

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
