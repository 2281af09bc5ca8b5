// src/error.rs
//
// Error taxonomy for the screening pipeline. Everything is fail-fast: errors
// bubble up to main via `?` and abort the batch with a non-zero exit.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("input file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("output directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("folding program `{0}` was not found on PATH")]
    OracleNotFound(String),

    #[error("folding program exited with {0}")]
    OracleExecutionFailed(ExitStatus),

    #[error("unexpected folding output:\n{0}")]
    OracleOutputMalformed(String),

    #[error("structure length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("diagram renderer failed: {0}")]
    RenderFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScreenError>;
