#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Gzip tar packaging of a collected workdir tree
//!
//! The terminal step of a run: the whole workdir is written into one
//! `.tar.gz`. Entries are stored relative to the workdir's parent so
//! the archive unpacks into a single self-contained tree.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::task;
use triage_errors::{ArchiveError, Error};

/// Package `source_dir` into a gzip tar at `output`.
///
/// The source must be an absolute path to an existing directory. The
/// output's parent directory is created when missing.
///
/// # Errors
///
/// Returns an [`ArchiveError`] for a relative or missing source, or
/// when the tar stream cannot be written.
pub async fn create(source_dir: &Path, output: &Path) -> Result<(), Error> {
    if !source_dir.is_absolute() {
        return Err(ArchiveError::NotAbsolute {
            path: source_dir.display().to_string(),
        }
        .into());
    }
    if !source_dir.is_dir() {
        return Err(ArchiveError::SourceMissing {
            path: source_dir.display().to_string(),
        }
        .into());
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
    }

    let source_dir = source_dir.to_path_buf();
    let output_path = output.to_path_buf();
    task::spawn_blocking(move || create_blocking(&source_dir, &output_path))
        .await
        .map_err(|e| Error::internal(format!("archive task: {e}")))?
}

fn create_blocking(source_dir: &Path, output: &Path) -> Result<(), Error> {
    let failed = |reason: String| ArchiveError::CreateFailed {
        path: output.display().to_string(),
        reason,
    };

    // Entries land under the workdir's own name
    let prefix: PathBuf = source_dir
        .file_name()
        .map_or_else(|| PathBuf::from("triage"), PathBuf::from);

    let file = File::create(output).map_err(|e| failed(e.to_string()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    builder
        .append_dir_all(&prefix, source_dir)
        .map_err(|e| failed(e.to_string()))?;

    let encoder = builder.into_inner().map_err(|e| failed(e.to_string()))?;
    encoder.finish().map_err(|e| failed(e.to_string()))?;

    tracing::debug!(archive = %output.display(), "archive finished");
    Ok(())
}
