//! CLI subcommands driving the supervisor directly: `run`, `stop`, `status`.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::generator::Framework;
use crate::supervisor::{AppStatus, AppSupervisor};

#[derive(Args)]
pub struct RunArgs {
    /// Program to copy to the app file and launch
    pub file: PathBuf,

    /// Framework used to pick the launch command (overrides config)
    #[arg(short, long)]
    pub framework: Option<Framework>,
}

pub async fn run(args: RunArgs, config: &Config) -> Result<()> {
    let code = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let framework = args.framework.unwrap_or(config.generator.framework);

    let mut supervisor = AppSupervisor::from_config(config, framework);
    let outcome = supervisor.run(&code).await?;

    if !outcome.is_success() {
        anyhow::bail!("{}", outcome);
    }

    println!("{}", outcome);
    println!("  stdout:    {}", supervisor.stdout_log().display());
    println!("  stderr:    {}", supervisor.stderr_log().display());
    Ok(())
}

pub async fn stop(config: &Config) -> Result<()> {
    let mut supervisor = AppSupervisor::from_config(config, config.generator.framework);
    let outcome = supervisor.stop().await?;
    println!("{}", outcome);
    Ok(())
}

pub fn status(config: &Config) -> Result<()> {
    let mut supervisor = AppSupervisor::from_config(config, config.generator.framework);
    let status = supervisor.status();

    println!("App: {}", status);
    println!("  app file:  {}", supervisor.app_file().display());
    println!("  PID file:  {}", supervisor.pid_file().display());
    if !matches!(status, AppStatus::NotRunning) {
        println!("  stdout:    {}", supervisor.stdout_log().display());
        println!("  stderr:    {}", supervisor.stderr_log().display());
    }
    Ok(())
}
