pub mod environment;
pub mod error;
pub mod input;
pub mod model;
pub mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};

use environment::Environment;
use error::RunError;
use input::RunInput;
use model::ResidualRiskModel;
use output::{DRAW_HEADERS, SUMMARY_HEADERS};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), RunError> {
    // Input comes from the file named on the command line, or stdin
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let env = Environment::<RunInput>::load(path.as_deref())?;
    let Some(input) = env.input.as_ref() else {
        return Err(RunError::EmptyInput);
    };
    info!("running {:?} model, replicate {}", input.model, env.replicate);

    let report = ResidualRiskModel::run(input, env.seed)?;

    env.write_csv("residual_risk.csv", &SUMMARY_HEADERS, &report.summary_rows())?;
    if !report.draws.is_empty() {
        env.write_csv("bootstrap_samples.csv", &DRAW_HEADERS, &report.draw_rows())?;
    }
    Ok(())
}
