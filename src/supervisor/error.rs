use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Error writing to {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error executing {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process {pid} did not exit within {waited:?} of being terminated")]
    Timeout { pid: u32, waited: Duration },

    #[error("Failed to signal process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    #[error("Error reading PID file {}: {source}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PID file {} does not contain a process id: {contents:?}", path.display())]
    CorruptPidFile { path: PathBuf, contents: String },
}
