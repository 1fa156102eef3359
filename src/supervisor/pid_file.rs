//! Sidecar file holding the pid of the last launched app.
//!
//! The file is plain text: a single decimal integer. It is the only state a
//! later CLI invocation has to find the process again.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::SupervisorError;

#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, pid: u32) -> Result<(), SupervisorError> {
        let write_err = |source| SupervisorError::WriteFailed {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, pid.to_string()).map_err(write_err)
    }

    /// `Ok(None)` when there is no sidecar file.
    pub fn read(&self) -> Result<Option<u32>, SupervisorError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SupervisorError::PidFile {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match contents.trim().parse::<u32>() {
            Ok(pid) if pid > 0 => Ok(Some(pid)),
            _ => Err(SupervisorError::CorruptPidFile {
                path: self.path.clone(),
                contents: contents.trim().to_string(),
            }),
        }
    }

    /// Remove the sidecar; a missing file is not an error.
    pub fn remove(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
