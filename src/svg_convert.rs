// src/svg_convert.rs
//
// Batch conversion of rendered SVG diagrams to PDF. Walks a directory tree,
// creates a `pdf/` directory next to each SVG and hands the actual
// conversion to an external converter program.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};
use walkdir::WalkDir;

use crate::error::{Result, ScreenError};

/// Every SVG file below `root`, in walk order.
pub fn find_svgs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Convert every SVG under `root`, writing `<dir>/pdf/<stem>.pdf` next to
/// each source file. Returns (converted, failed); individual failures are
/// warnings, a missing converter aborts.
pub fn convert_tree(root: &Path, converter: &str) -> Result<(usize, usize)> {
    if !root.is_dir() {
        return Err(ScreenError::DirectoryNotFound(root.to_path_buf()));
    }

    let svgs = find_svgs(root);
    info!("Found {} SVG files under {}", svgs.len(), root.display());

    let mut converted = 0;
    let mut failed = 0;
    for svg in svgs {
        let dir = svg.parent().unwrap_or(root);
        let pdf_dir = dir.join("pdf");
        fs::create_dir_all(&pdf_dir)?;
        let pdf = pdf_dir
            .join(svg.file_stem().unwrap_or_default())
            .with_extension("pdf");

        match Command::new(converter).arg(&svg).arg("-o").arg(&pdf).status() {
            Ok(status) if status.success() => converted += 1,
            Ok(status) => {
                warn!("{} failed on {} ({})", converter, svg.display(), status);
                failed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ScreenError::OracleNotFound(converter.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Converted {} SVG files, {} failures", converted, failed);
    Ok((converted, failed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_only_svg_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("nested/b.SVG"), "<svg/>").unwrap();
        fs::write(dir.path().join("nested/c.txt"), "not a diagram").unwrap();

        let found = find_svgs(dir.path());
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case("svg"))));
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = convert_tree(Path::new("/no/such/tree"), "cairosvg").unwrap_err();
        assert!(matches!(err, ScreenError::DirectoryNotFound(_)));
    }
}
