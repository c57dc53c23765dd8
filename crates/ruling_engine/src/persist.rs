use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

const PARTIAL_PREFIX: &str = ".partial-";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("destination {path} is unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("writing {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn unusable(dir: &Path, reason: impl ToString) -> PersistError {
    PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Creates the destination if needed and checks a file can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(unusable(dir, "not a directory")),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|err| unusable(dir, err))?;
        }
        Err(err) => return Err(unusable(dir, err)),
    }
    partial_file(dir).map_err(|err| unusable(dir, err))?;
    Ok(())
}

fn partial_file(dir: &Path) -> io::Result<NamedTempFile> {
    Builder::new().prefix(PARTIAL_PREFIX).tempfile_in(dir)
}

/// Writes `{dir}/{filename}` through a hidden temp file in the same directory
/// followed by a rename, so a reader sees either the old file or the new one.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.write_bytes(filename, content.as_bytes())
    }

    /// Replaces any existing file of the same name.
    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;
        let target = self.dir.join(filename);
        let io_error = |source: io::Error| PersistError::Io {
            path: target.clone(),
            source,
        };

        let mut partial = partial_file(&self.dir).map_err(io_error)?;
        partial.write_all(content).map_err(io_error)?;
        partial.as_file_mut().sync_all().map_err(io_error)?;
        partial
            .persist(&target)
            .map_err(|err| io_error(err.error))?;
        Ok(target)
    }
}
