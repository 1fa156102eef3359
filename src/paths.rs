//! Where uiforge keeps its files.
//!
//! Each directory comes from a `UIFORGE_*` override when that is an absolute
//! path (`~` allowed), else from the platform's XDG base directories.

use anyhow::{Context, Result};
use etcetera::BaseStrategy;
#[cfg(unix)]
use libc::getuid;
use std::env::VarError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "uiforge";

#[derive(Debug, Clone)]
pub struct Paths {
    /// config.toml
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Generated app and HTML page. Defaults to data_dir/workspace,
    /// `UIFORGE_WORKSPACE` moves it on its own.
    pub workspace: PathBuf,
    /// App logs; also the PID file when there is no runtime dir
    pub state_dir: PathBuf,
    pub runtime_dir: Option<PathBuf>,
}

impl Paths {
    pub fn resolve() -> Result<Self> {
        Self::resolve_with_env(|key| std::env::var(key))
    }

    /// Resolve with a custom env lookup.
    pub fn resolve_with_env<F>(env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let base = etcetera::choose_base_strategy()
            .map_err(|e| anyhow::anyhow!("Failed to determine base directories: {}", e))?;

        let config_dir = override_dir(&env_fn, "UIFORGE_CONFIG_DIR")
            .unwrap_or_else(|| base.config_dir().join(APP_DIR));
        let data_dir = override_dir(&env_fn, "UIFORGE_DATA_DIR")
            .unwrap_or_else(|| base.data_dir().join(APP_DIR));
        let state_dir = override_dir(&env_fn, "UIFORGE_STATE_DIR").unwrap_or_else(|| {
            base.state_dir()
                .unwrap_or_else(|| base.data_dir())
                .join(APP_DIR)
        });
        let workspace = override_dir(&env_fn, "UIFORGE_WORKSPACE")
            .unwrap_or_else(|| data_dir.join("workspace"));

        Ok(Self {
            config_dir,
            data_dir,
            workspace,
            state_dir,
            runtime_dir: runtime_dir(&env_fn),
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default target file for the generated program
    pub fn app_file(&self) -> PathBuf {
        self.workspace.join("app.py")
    }

    /// Generated HTML visualizer page
    pub fn page_file(&self) -> PathBuf {
        self.workspace.join("index.html")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// Sidecar file holding the running app's pid
    pub fn pid_file(&self) -> PathBuf {
        self.runtime_dir
            .as_ref()
            .unwrap_or(&self.state_dir)
            .join("app.pid")
    }

    /// Create every directory, owner-only on Unix.
    pub fn ensure_dirs(&self) -> Result<()> {
        let fixed = [
            &self.config_dir,
            &self.data_dir,
            &self.workspace,
            &self.state_dir,
        ];
        for dir in fixed.into_iter().chain(self.runtime_dir.as_ref()) {
            create_private_dir(dir)?;
        }
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::resolve().unwrap_or_else(|_| {
            let home = etcetera::home_dir().unwrap_or_else(|_| PathBuf::from("."));
            let data_dir = home.join(".local").join("share").join(APP_DIR);
            Self {
                config_dir: home.join(".config").join(APP_DIR),
                workspace: data_dir.join("workspace"),
                data_dir,
                state_dir: home.join(".local").join("state").join(APP_DIR),
                runtime_dir: None,
            }
        })
    }
}

fn override_dir<F>(env_fn: &F, var: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let value = env_fn(var).ok()?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(PathBuf::from(shellexpand::tilde(value).into_owned())).filter(|p| p.is_absolute())
}

/// `$XDG_RUNTIME_DIR/uiforge`, else a per-user directory under the temp dir.
fn runtime_dir<F>(env_fn: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    if let Ok(dir) = env_fn("XDG_RUNTIME_DIR")
        && Path::new(&dir).is_absolute()
    {
        return Some(Path::new(&dir).join(APP_DIR));
    }

    #[cfg(unix)]
    {
        let uid = unsafe { getuid() };
        let tmpdir = env_fn("TMPDIR").unwrap_or_else(|_| "/tmp".to_string());
        Some(PathBuf::from(tmpdir).join(format!("{}-{}", APP_DIR, uid)))
    }

    #[cfg(not(unix))]
    {
        let user = env_fn("USERNAME").unwrap_or_else(|_| "user".into());
        env_fn("TEMP")
            .ok()
            .map(|t| PathBuf::from(t).join(format!("{}-{}", APP_DIR, user)))
    }
}

fn create_private_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}
