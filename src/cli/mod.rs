pub mod app;
pub mod config;
pub mod generate;
pub mod paths;
pub mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "uiforge")]
#[command(
    author,
    version,
    about = "Generate Gradio/Streamlit UIs for ML tasks and keep them running"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "UIFORGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a UI for a task and launch it, retrying on startup errors
    Generate(generate::GenerateArgs),

    /// Launch an existing program through the supervisor
    Run(app::RunArgs),

    /// Stop the running app
    Stop,

    /// Show whether an app is running
    Status,

    /// Start the mock inference server
    Serve(serve::ServeArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Show resolved XDG directory paths
    Paths,
}
