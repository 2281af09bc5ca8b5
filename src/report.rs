// src/report.rs
//
// Per-run result recording: a typed record for the flat result table, a run
// directory with the artifact layout the analysis notebooks expect, JSON
// run metadata, and CSV export. Charting stays external; the CSV is the
// hand-off point.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{Result, ScreenError};
use crate::fasta::FastaRecord;

/// One row of the result table: a variant, the parameters it was folded
/// with, and how well its prediction matched the reference structure(s).
#[derive(Debug, Serialize, Clone)]
pub struct ScreenRecord {
    pub variant: String,
    pub group: Option<String>,
    pub alpha: f64,
    pub tau: f64,
    pub match_ratio: f64,
    pub mutations: usize,
    pub secondary_match_ratio: Option<f64>,
    pub probe_paired: Option<bool>,
    pub energy: Option<f64>,
}

const ARTIFACT_DIRS: [&str; 3] = ["sequences", "dot-bracket-structures", "diagrams"];

/// Owns the per-run output directory and the in-memory result table.
#[derive(Debug)]
pub struct RunRecorder {
    run_dir: PathBuf,
    records: Vec<ScreenRecord>,
    metadata: serde_json::Value,
}

impl RunRecorder {
    /// Create `<output_dir>/<index>_<label>` where `index` counts the
    /// entries already present, plus the artifact subdirectories.
    pub fn create(
        output_dir: &Path,
        label: &str,
        parameters: serde_json::Value,
    ) -> Result<Self> {
        if !output_dir.is_dir() {
            return Err(ScreenError::DirectoryNotFound(output_dir.to_path_buf()));
        }
        let index = fs::read_dir(output_dir)?.count();
        let run_dir = output_dir.join(format!("{}_{}", index, label));
        Self::init(run_dir, parameters, true)
    }

    /// Create a timestamp-named run directory without the standard artifact
    /// subdirectories (iterative runs lay out one directory per iteration).
    pub fn create_timestamped(output_dir: &Path, parameters: serde_json::Value) -> Result<Self> {
        if !output_dir.is_dir() {
            return Err(ScreenError::DirectoryNotFound(output_dir.to_path_buf()));
        }
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self::init(output_dir.join(stamp), parameters, false)
    }

    fn init(run_dir: PathBuf, parameters: serde_json::Value, with_subdirs: bool) -> Result<Self> {
        fs::create_dir(&run_dir)?;
        if with_subdirs {
            for sub in ARTIFACT_DIRS {
                fs::create_dir(run_dir.join(sub))?;
            }
        }
        let metadata = json!({
            "run_id": Uuid::new_v4().to_string(),
            "timestamp": Local::now().to_rfc3339(),
            "parameters": parameters,
        });
        serde_json::to_writer_pretty(File::create(run_dir.join("parameters.json"))?, &metadata)?;
        info!("Run directory: {}", run_dir.display());
        Ok(Self {
            run_dir,
            records: Vec::new(),
            metadata,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn push(&mut self, record: ScreenRecord) {
        self.records.push(record);
    }

    pub fn write_sequence(&self, name: &str, record: &FastaRecord) -> Result<()> {
        fs::write(self.run_dir.join("sequences").join(name), record.to_fasta())?;
        Ok(())
    }

    pub fn write_structure(&self, name: &str, structure: &str) -> Result<()> {
        fs::write(
            self.run_dir.join("dot-bracket-structures").join(name),
            structure,
        )?;
        Ok(())
    }

    pub fn diagram_path(&self, name: &str) -> PathBuf {
        self.run_dir.join("diagrams").join(name)
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        serde_json::to_writer_pretty(File::create(self.run_dir.join(name))?, value)?;
        Ok(())
    }

    /// Write the accumulated table to `results.csv` and return its path.
    pub fn finish(self) -> Result<PathBuf> {
        let path = self.run_dir.join("results.csv");
        save_records_csv(&path, &self.records, &self.metadata)?;
        info!("Results saved to {}", path.display());
        Ok(path)
    }

    /// As `finish`, but with a caller-supplied row type (iterative runs).
    pub fn finish_with<T: Serialize>(self, rows: &[T]) -> Result<PathBuf> {
        let path = self.run_dir.join("results.csv");
        save_records_csv(&path, rows, &self.metadata)?;
        info!("Results saved to {}", path.display());
        Ok(path)
    }
}

/// Write rows as CSV preceded by a `# Metadata:` JSON comment line.
pub fn save_records_csv<T: Serialize>(
    path: &Path,
    rows: &[T],
    metadata: &serde_json::Value,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "# Metadata: {}", serde_json::to_string(metadata)?)?;

    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(variant: &str) -> ScreenRecord {
        ScreenRecord {
            variant: variant.to_string(),
            group: None,
            alpha: 0.5,
            tau: 640.0,
            match_ratio: 0.75,
            mutations: 2,
            secondary_match_ratio: None,
            probe_paired: Some(true),
            energy: Some(-10.2),
        }
    }

    #[test]
    fn run_directories_are_indexed() {
        let out = tempfile::tempdir().unwrap();
        let first = RunRecorder::create(out.path(), "scan", json!({})).unwrap();
        assert!(first.dir().ends_with("0_scan"));
        let second = RunRecorder::create(out.path(), "scan", json!({})).unwrap();
        assert!(second.dir().ends_with("1_scan"));
        assert!(first.dir().join("sequences").is_dir());
        assert!(first.dir().join("parameters.json").is_file());
    }

    #[test]
    fn missing_output_directory_is_an_error() {
        let err = RunRecorder::create(Path::new("/no/such/dir"), "scan", json!({})).unwrap_err();
        assert!(matches!(err, ScreenError::DirectoryNotFound(_)));
    }

    #[test]
    fn finish_writes_metadata_comment_and_rows() {
        let out = tempfile::tempdir().unwrap();
        let mut recorder = RunRecorder::create(out.path(), "scan", json!({"k": 1})).unwrap();
        recorder.push(record("TGTAGC"));
        recorder.push(record("TGTAGA"));
        let csv_path = recorder.finish().unwrap();

        let text = fs::read_to_string(csv_path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("# Metadata: "));
        assert!(lines.next().unwrap().starts_with("variant,"));
        assert_eq!(lines.count(), 2);
    }
}
