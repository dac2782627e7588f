//! Storefront checkout CLI

use std::process::ExitCode;

use crate::cli::Cli;

mod cli;

/// Storefront CLI entry point
#[tokio::main(flavor = "current_thread")]
pub async fn main() -> ExitCode {
    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(error) => {
            _ = error.print();

            return ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2));
        }
    };

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            #[expect(
                clippy::print_stderr,
                reason = "command failures are reported to the user, not logged"
            )]
            {
                eprintln!("{error}");
            }

            ExitCode::FAILURE
        }
    }
}
