//! Lifecycle manager for the single generated-app child process.
//!
//! One run overwrites the target file, stops whatever was running before,
//! spawns the interpreter on the file and watches it for a bounded startup
//! window. The child's pid goes to a sidecar file so `stop` works from a
//! later CLI invocation that never held the process handle.

mod error;
mod pid_file;
pub mod signal;

pub use error::SupervisorError;
pub use pid_file::PidFile;

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::generator::Framework;

/// Poll interval inside the startup window
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Extra time given to a child that started writing stderr, so the whole
/// traceback lands in the log before it is read back.
const STDERR_SETTLE: Duration = Duration::from_millis(300);

/// Captured stderr is cut to its last this-many bytes.
const MAX_CAPTURED_STDERR: usize = 16 * 1024;

/// Argument replaced by the app file path in a launcher's argument list.
pub const APP_PLACEHOLDER: &str = "{app}";

/// How to start the interpreter on the app file.
#[derive(Debug, Clone)]
pub struct Launcher {
    program: String,
    args: Vec<String>,
}

impl Launcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments passed to the program. Use [`APP_PLACEHOLDER`] to position
    /// the app file; without it the file is appended last.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn resolved_args(&self, app_file: &Path) -> Vec<String> {
        let app = app_file.display().to_string();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| if a == APP_PLACEHOLDER { app.clone() } else { a.clone() })
            .collect();
        if !self.args.iter().any(|a| a == APP_PLACEHOLDER) {
            args.push(app);
        }
        args
    }

    fn command(&self, app_file: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.resolved_args(app_file));
        cmd
    }

    /// Shell-like rendering for logs and status output.
    pub fn display_for(&self, app_file: &Path) -> String {
        std::iter::once(self.program.clone())
            .chain(self.resolved_args(app_file))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Fixed target file, overwritten on every run
    pub app_file: PathBuf,
    /// Sidecar file holding the running app's pid
    pub pid_file: PathBuf,
    /// Directory for the captured stdout/stderr logs
    pub log_dir: PathBuf,
    pub launcher: Launcher,
    pub startup_timeout: Duration,
    /// Wait after SIGTERM before a hard kill (and again after the kill)
    pub stop_grace: Duration,
}

impl SupervisorOptions {
    pub fn from_config(config: &Config, framework: Framework) -> Self {
        Self {
            app_file: config.app_file(),
            pid_file: config.paths.pid_file(),
            log_dir: config.paths.logs_dir(),
            launcher: framework.launcher(&config.supervisor.python),
            startup_timeout: Duration::from_secs(config.supervisor.startup_timeout_secs),
            stop_grace: Duration::from_millis(config.supervisor.stop_grace_ms),
        }
    }
}

/// Result of one `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Still alive and silent on stderr when the startup window closed.
    ///
    /// This is a heuristic, not a health check: an app that crashes right
    /// after the window looks the same as a healthy one.
    Running { pid: u32 },
    /// Exited with status 0 and no stderr inside the window.
    Completed { pid: u32 },
    /// Exited non-zero or wrote to stderr inside the window.
    Failed {
        pid: u32,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl RunOutcome {
    pub fn pid(&self) -> u32 {
        match self {
            RunOutcome::Running { pid }
            | RunOutcome::Completed { pid }
            | RunOutcome::Failed { pid, .. } => *pid,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Failed { .. })
    }

    /// Text describing the failure, suitable for feeding back to the model.
    pub fn error_text(&self) -> Option<String> {
        match self {
            RunOutcome::Failed {
                exit_code, stderr, ..
            } => Some(if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if let Some(code) = exit_code {
                format!("exited with status {}", code)
            } else {
                "exited without output".to_string()
            }),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Running { pid } => {
                write!(f, "App is running in the background! (PID: {})", pid)
            }
            RunOutcome::Completed { pid } => {
                write!(f, "App ran to completion without errors (PID: {})", pid)
            }
            RunOutcome::Failed { .. } => write!(
                f,
                "Error starting app: {}",
                self.error_text().unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Stopped through the in-memory handle.
    Stopped { pid: u32 },
    /// Signalled the pid recorded in the sidecar file. Delivery is best-effort.
    StoppedFromPidFile { pid: u32 },
    NothingRunning,
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Stopped { pid } | StopOutcome::StoppedFromPidFile { pid } => {
                write!(f, "App stopped! (PID: {})", pid)
            }
            StopOutcome::NothingRunning => write!(f, "No app running!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Running { pid: u32 },
    /// A pid is recorded but the process is gone.
    Stale { pid: u32 },
    NotRunning,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppStatus::Running { pid } => write!(f, "running (PID: {})", pid),
            AppStatus::Stale { pid } => write!(f, "not running (stale PID file: {})", pid),
            AppStatus::NotRunning => write!(f, "not running"),
        }
    }
}

struct TrackedApp {
    child: Child,
    pid: u32,
    started_at: DateTime<Local>,
}

pub struct AppSupervisor {
    options: SupervisorOptions,
    pid_file: PidFile,
    current: Option<TrackedApp>,
}

impl AppSupervisor {
    pub fn new(options: SupervisorOptions) -> Self {
        let pid_file = PidFile::new(&options.pid_file);
        Self {
            options,
            pid_file,
            current: None,
        }
    }

    pub fn from_config(config: &Config, framework: Framework) -> Self {
        Self::new(SupervisorOptions::from_config(config, framework))
    }

    pub fn app_file(&self) -> &Path {
        &self.options.app_file
    }

    pub fn pid_file(&self) -> &Path {
        self.pid_file.path()
    }

    pub fn stdout_log(&self) -> PathBuf {
        self.options.log_dir.join("app.stdout.log")
    }

    pub fn stderr_log(&self) -> PathBuf {
        self.options.log_dir.join("app.stderr.log")
    }

    /// Pid and start time of the process this instance is tracking.
    pub fn current(&self) -> Option<(u32, DateTime<Local>)> {
        self.current.as_ref().map(|t| (t.pid, t.started_at))
    }

    /// Write `code` to the target file and launch it.
    ///
    /// Any previously running app is terminated first. Failures of the app
    /// itself come back as [`RunOutcome::Failed`]; `Err` is reserved for
    /// the supervisor not being able to do its job.
    pub async fn run(&mut self, code: &str) -> Result<RunOutcome, SupervisorError> {
        let app_file = self.options.app_file.clone();
        write_app_file(&app_file, code)?;
        debug!("Wrote {} bytes to {}", code.len(), app_file.display());

        self.terminate_previous().await?;

        let (stdout, stderr) = self.open_logs()?;
        let mut cmd = self.options.launcher.command(&app_file);
        cmd.stdin(Stdio::null()).stdout(stdout).stderr(stderr);

        let started_at = Local::now();
        let program = self.options.launcher.program().to_string();
        let mut child = cmd
            .spawn()
            .map_err(|source| SupervisorError::SpawnFailed {
                program: program.clone(),
                source,
            })?;
        let Some(pid) = child.id() else {
            return Err(SupervisorError::SpawnFailed {
                program,
                source: std::io::Error::other("child exited before its pid could be read"),
            });
        };
        info!(
            "Launched `{}` (PID: {})",
            self.options.launcher.display_for(&app_file),
            pid
        );

        if let Err(e) = self.pid_file.write(pid) {
            warn!("Could not record PID {}: {}", pid, e);
        }

        let outcome = self.watch_startup(&mut child, pid).await;
        match outcome {
            RunOutcome::Running { .. } => {
                self.current = Some(TrackedApp {
                    child,
                    pid,
                    started_at,
                });
            }
            RunOutcome::Completed { .. } | RunOutcome::Failed { .. } => self.clear_pid_file(),
        }
        debug!("Startup outcome: {:?}", outcome);

        Ok(outcome)
    }

    /// Stop the app started by this instance, or the one in the sidecar file.
    pub async fn stop(&mut self) -> Result<StopOutcome, SupervisorError> {
        if let Some(mut tracked) = self.current.take() {
            if let Err(e) =
                terminate_child(&mut tracked.child, tracked.pid, self.options.stop_grace).await
            {
                warn!("{}", e);
            }
            self.clear_pid_file();
            info!("Stopped app (PID: {})", tracked.pid);
            return Ok(StopOutcome::Stopped { pid: tracked.pid });
        }

        let pid = match self.pid_file.read() {
            Ok(Some(pid)) => pid,
            Ok(None) => return Ok(StopOutcome::NothingRunning),
            Err(e) => {
                self.clear_pid_file();
                return Err(e);
            }
        };

        if let Err(reason) = signal::terminate(pid) {
            warn!("Failed to signal PID {}: {}", pid, reason);
        }
        self.clear_pid_file();
        info!("Sent stop signal to app (PID: {})", pid);

        Ok(StopOutcome::StoppedFromPidFile { pid })
    }

    /// Liveness of the tracked app, falling back to the sidecar file.
    pub fn status(&mut self) -> AppStatus {
        if let Some(tracked) = self.current.as_mut() {
            let pid = tracked.pid;
            if matches!(tracked.child.try_wait(), Ok(None)) {
                return AppStatus::Running { pid };
            }
            self.current = None;
            return AppStatus::Stale { pid };
        }

        match self.pid_file.read() {
            Ok(Some(pid)) if signal::is_alive(pid) => AppStatus::Running { pid },
            Ok(Some(pid)) => AppStatus::Stale { pid },
            Ok(None) => AppStatus::NotRunning,
            Err(e) => {
                warn!("{}", e);
                AppStatus::NotRunning
            }
        }
    }

    async fn terminate_previous(&mut self) -> Result<(), SupervisorError> {
        if let Some(mut previous) = self.current.take() {
            info!("Terminating previous app (PID: {})", previous.pid);
            terminate_child(&mut previous.child, previous.pid, self.options.stop_grace).await?;
            self.clear_pid_file();
            return Ok(());
        }

        match self.pid_file.read() {
            Ok(Some(pid)) => {
                if signal::is_alive(pid) {
                    info!("Terminating app from PID file (PID: {})", pid);
                    match signal::terminate(pid) {
                        Ok(()) => self.wait_for_exit(pid).await,
                        Err(reason) => warn!("Failed to signal PID {}: {}", pid, reason),
                    }
                }
                self.clear_pid_file();
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Ignoring unusable PID file: {}", e);
                self.clear_pid_file();
            }
        }

        Ok(())
    }

    /// Poll a process we do not own until it disappears or the grace period ends.
    async fn wait_for_exit(&self, pid: u32) {
        let deadline = Instant::now() + self.options.stop_grace;
        while signal::is_alive(pid) {
            if Instant::now() >= deadline {
                warn!("PID {} still alive after {:?}", pid, self.options.stop_grace);
                return;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn watch_startup(&self, child: &mut Child, pid: u32) -> RunOutcome {
        let deadline = Instant::now() + self.options.startup_timeout;
        let stderr_log = self.stderr_log();

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let stderr = read_log_tail(&stderr_log);
                    return if status.success() && stderr.trim().is_empty() {
                        RunOutcome::Completed { pid }
                    } else {
                        RunOutcome::Failed {
                            pid,
                            exit_code: status.code(),
                            stderr,
                        }
                    };
                }
                Ok(None) => {}
                Err(e) => warn!("Could not poll PID {}: {}", pid, e),
            }

            if log_has_output(&stderr_log) {
                sleep(STDERR_SETTLE).await;
                let exit_code = match child.try_wait() {
                    Ok(Some(status)) => status.code(),
                    _ => {
                        if let Err(e) = terminate_child(child, pid, self.options.stop_grace).await {
                            warn!("{}", e);
                        }
                        None
                    }
                };
                return RunOutcome::Failed {
                    pid,
                    exit_code,
                    stderr: read_log_tail(&stderr_log),
                };
            }

            if Instant::now() >= deadline {
                return RunOutcome::Running { pid };
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    fn open_logs(&self) -> Result<(File, File), SupervisorError> {
        let log_dir = &self.options.log_dir;
        fs::create_dir_all(log_dir).map_err(|source| SupervisorError::WriteFailed {
            path: log_dir.clone(),
            source,
        })?;

        let create = |path: PathBuf| {
            File::create(&path).map_err(|source| SupervisorError::WriteFailed { path, source })
        };
        Ok((create(self.stdout_log())?, create(self.stderr_log())?))
    }

    fn clear_pid_file(&self) {
        if let Err(e) = self.pid_file.remove() {
            warn!(
                "Could not remove PID file {}: {}",
                self.pid_file.path().display(),
                e
            );
        }
    }
}

/// SIGTERM, wait out the grace period, then hard-kill and reap.
async fn terminate_child(
    child: &mut Child,
    pid: u32,
    grace: Duration,
) -> Result<(), SupervisorError> {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return Ok(());
    }

    signal::terminate(pid).map_err(|reason| SupervisorError::SignalFailed { pid, reason })?;
    if timeout(grace, child.wait()).await.is_ok() {
        return Ok(());
    }

    warn!("PID {} ignored termination for {:?}, killing", pid, grace);
    child
        .start_kill()
        .map_err(|e| SupervisorError::SignalFailed {
            pid,
            reason: e.to_string(),
        })?;

    match timeout(grace, child.wait()).await {
        Ok(_) => Ok(()),
        Err(_) => Err(SupervisorError::Timeout {
            pid,
            waited: grace * 2,
        }),
    }
}

fn write_app_file(path: &Path, code: &str) -> Result<(), SupervisorError> {
    let write_err = |source| SupervisorError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, code).map_err(write_err)
}

fn log_has_output(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Read a captured log, keeping the tail when it is oversized.
fn read_log_tail(path: &Path) -> String {
    let bytes = fs::read(path).unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes);
    if text.len() <= MAX_CAPTURED_STDERR {
        return text.into_owned();
    }

    let mut start = text.len() - MAX_CAPTURED_STDERR;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("[...truncated...]\n{}", &text[start..])
}
