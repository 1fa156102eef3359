//! CLI subcommand: `uiforge paths`
//!
//! Prints all resolved XDG-compliant paths for debugging and scripting.

use anyhow::Result;

use crate::paths::Paths;

pub fn run() -> Result<()> {
    let paths = Paths::resolve()?;

    println!("uiforge Paths (XDG Base Directory)");
    println!("==================================");
    println!();
    println!("Config:     {}", paths.config_dir.display());
    println!("  config.toml:    {}", paths.config_file().display());
    println!();
    println!("Data:       {}", paths.data_dir.display());
    println!("  workspace:      {}", paths.workspace.display());
    println!("  app file:       {}", paths.app_file().display());
    println!("  HTML page:      {}", paths.page_file().display());
    println!();
    println!("State:      {}", paths.state_dir.display());
    println!("  logs:           {}", paths.logs_dir().display());
    println!();
    match paths.runtime_dir {
        Some(ref dir) => println!("Runtime:    {}", dir.display()),
        None => println!("Runtime:    (not available)"),
    }
    println!("  PID file:       {}", paths.pid_file().display());

    Ok(())
}
