// src/oracle.rs
//
// The folding oracle: a capability interface over the external
// secondary-structure prediction program, plus the CoFold subprocess
// adapter. The adapter writes each candidate to its own scratch file, feeds
// it to the program on stdin and parses the three-line textual output.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{Result, ScreenError};
use crate::fasta::FastaRecord;

/// Parameters of one folding invocation.
#[derive(Debug, Clone)]
pub struct FoldParams {
    pub alpha: f64,
    pub tau: f64,
    pub param_file: PathBuf,
}

/// A predicted structure and, when the program reports one, its free energy.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub structure: String,
    pub energy: Option<f64>,
}

/// Anything that can fold a sequence into a dot-bracket structure.
pub trait FoldingOracle {
    fn fold(&self, record: &FastaRecord, params: &FoldParams) -> Result<Prediction>;
}

/// Adapter shelling out to the CoFold family of folding programs.
pub struct CoFoldOracle {
    program: String,
}

impl CoFoldOracle {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl FoldingOracle for CoFoldOracle {
    fn fold(&self, record: &FastaRecord, params: &FoldParams) -> Result<Prediction> {
        // Per-invocation scratch file; concurrent runs no longer race on a
        // shared temp path.
        let mut scratch = NamedTempFile::new()?;
        scratch.write_all(record.to_fasta().as_bytes())?;
        scratch.flush()?;

        let stdin = File::open(scratch.path())?;
        debug!(
            "{} -d1 --noPS --distAlpha {:.5} --distTau {:.5} --paramFile={} < {}",
            self.program,
            params.alpha,
            params.tau,
            params.param_file.display(),
            scratch.path().display()
        );
        let output = Command::new(&self.program)
            .arg("-d1")
            .arg("--noPS")
            .arg("--distAlpha")
            .arg(format!("{:.5}", params.alpha))
            .arg("--distTau")
            .arg(format!("{:.5}", params.tau))
            .arg(format!("--paramFile={}", params.param_file.display()))
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ScreenError::OracleNotFound(self.program.clone()),
                _ => ScreenError::Io(e),
            })?;

        if !output.status.success() {
            return Err(ScreenError::OracleExecutionFailed(output.status));
        }
        parse_fold_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the expected output: line 0 echoed header, line 1 echoed sequence,
/// line 2 `<dot-bracket> (<energy>)`. Only the first whitespace token of
/// line 2 is the structure; the parenthesized energy is optional.
pub fn parse_fold_output(stdout: &str) -> Result<Prediction> {
    let line = stdout
        .lines()
        .nth(2)
        .ok_or_else(|| ScreenError::OracleOutputMalformed(stdout.to_string()))?;

    let mut tokens = line.split_whitespace();
    let structure = tokens.next().unwrap_or("").to_string();
    if structure.is_empty() || !structure.chars().all(|c| matches!(c, '.' | '(' | ')')) {
        return Err(ScreenError::OracleOutputMalformed(stdout.to_string()));
    }

    let rest = tokens.collect::<Vec<_>>().join(" ");
    let energy = rest
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .parse::<f64>()
        .ok();

    Ok(Prediction { structure, energy })
}
