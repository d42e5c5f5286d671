use std::io;

use nat_risk::RiskError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("no input provided")]
    EmptyInput,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML input: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Risk(#[from] RiskError),
}
