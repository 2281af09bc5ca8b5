// src/render.rs
//
// Adapter for the external structure-diagram renderer. The renderer is an
// opaque collaborator: it reads a FASTA-with-structure block on stdin and
// writes `<id>_ss.svg` into its working directory, so we run it inside the
// target directory and rename the result.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Result, ScreenError};
use crate::fasta::FastaRecord;

pub struct DiagramRenderer {
    program: String,
}

impl DiagramRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Render `structure` for `record` into `out_path` as SVG. Callers in a
    /// batch loop treat a failure as a logged warning, not an abort.
    pub fn render(&self, record: &FastaRecord, structure: &str, out_path: &Path) -> Result<()> {
        let dir = match out_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let id = record
            .header
            .trim_start_matches('>')
            .split_whitespace()
            .next()
            .unwrap_or("rna")
            .replace('/', "-");
        let input = format!(">{}\n{}\n{}\n", id, record.residues, structure);

        let mut child = Command::new(&self.program)
            .arg("--output-format=svg")
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ScreenError::OracleNotFound(self.program.clone()),
                _ => ScreenError::Io(e),
            })?;
        child
            .stdin
            .take()
            .ok_or_else(|| ScreenError::RenderFailed("renderer stdin unavailable".into()))?
            .write_all(input.as_bytes())?;

        let status = child.wait()?;
        if !status.success() {
            return Err(ScreenError::RenderFailed(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        let produced = dir.join(format!("{}_ss.svg", id));
        if produced != out_path {
            fs::rename(&produced, out_path).map_err(|_| {
                ScreenError::RenderFailed(format!(
                    "expected renderer output {} was not produced",
                    produced.display()
                ))
            })?;
        }
        Ok(())
    }
}
