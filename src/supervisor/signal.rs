//! Platform process signalling.
//!
//! Unix sends a plain SIGTERM to the pid. Windows has no signals, so it
//! shells out to `taskkill /T /F`, which takes the whole process tree down.

/// Ask `pid` to terminate. A process that is already gone counts as success.
#[cfg(unix)]
pub fn terminate(pid: u32) -> Result<(), String> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};

    match kill(to_nix_pid(pid)?, Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Liveness check: signal 0 delivers nothing but reports whether the pid exists.
///
/// An exited but unreaped child still counts as alive here.
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;

    let Ok(pid) = to_nix_pid(pid) else {
        return false;
    };
    match kill(pid, None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

// Anything above i32::MAX would wrap negative and address a process group.
#[cfg(unix)]
fn to_nix_pid(pid: u32) -> Result<nix::unistd::Pid, String> {
    i32::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .map(nix::unistd::Pid::from_raw)
        .ok_or_else(|| format!("pid {} is out of range", pid))
}

#[cfg(windows)]
pub fn terminate(pid: u32) -> Result<(), String> {
    use std::process::Command;

    let output = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .output()
        .map_err(|e| e.to_string())?;

    if output.status.success() || !is_alive(pid) {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

#[cfg(windows)]
pub fn is_alive(pid: u32) -> bool {
    use std::process::Command;

    let pid = pid.to_string();
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid))
        .unwrap_or(false)
}
