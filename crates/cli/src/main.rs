//! keyrelay binary entry point

use keyrelay::tracing::init_tracing;
use keyrelay::{CliError, exit_code_for, render_error, run};
use std::process::ExitCode;

fn fail(err: &CliError) -> ExitCode {
    render_error(err);
    ExitCode::from(exit_code_for(err))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match keyrelay::cli::parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => return fail(&err),
    };

    if let Err(e) = init_tracing(&cli.tracing_config()) {
        return fail(&CliError::config(e.to_string()));
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err),
    }
}
