use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::generator::{ApiContext, Framework, Generator, TaskKind};
use crate::llm::create_provider;
use crate::openapi::load_api_schema;
use crate::supervisor::AppSupervisor;

#[derive(Args)]
pub struct GenerateArgs {
    /// Description of the ML task the UI is for
    #[arg(short, long)]
    pub task: String,

    /// Task kind, e.g. image_classification or tabular_regression
    #[arg(short = 'k', long)]
    pub task_kind: Option<TaskKind>,

    /// UI framework: gradio or streamlit (overrides config)
    #[arg(short, long)]
    pub framework: Option<Framework>,

    /// Inference API endpoint the UI calls (overrides config)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// OpenAPI document to take the /predict schema from
    #[arg(long)]
    pub openapi: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum generate-and-run attempts (overrides config)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: Option<u32>,

    /// Write a standalone HTML visualizer page instead of launching an app
    #[arg(long, conflicts_with_all = ["framework", "attempts", "task_kind"])]
    pub html: bool,

    /// Where to write the HTML page (default: <workspace>/index.html)
    #[arg(short, long, requires = "html")]
    pub output: Option<PathBuf>,
}

pub async fn run(args: GenerateArgs, config: &Config) -> Result<()> {
    let framework = args.framework.unwrap_or(config.generator.framework);
    let model = args.model.unwrap_or_else(|| config.generator.model.clone());
    let endpoint = args
        .endpoint
        .unwrap_or_else(|| config.generator.api_endpoint.clone());
    let attempts = args.attempts.unwrap_or(config.generator.max_attempts);

    let mut api = ApiContext::with_endpoint(&endpoint);
    if let Some(ref path) = args.openapi {
        api.schema = load_api_schema(path)?;
    }

    let provider = create_provider(&model, config)?;
    let generator = Generator::new(provider, framework, api, attempts);

    if args.html {
        let output = args.output.unwrap_or_else(|| config.paths.page_file());
        println!("Generating an HTML page with {}...", model);
        let written = generator.generate_page(&args.task, &output).await?;
        println!("Wrote HTML page to {}", written.display());
        return Ok(());
    }
    let mut supervisor = AppSupervisor::from_config(config, framework);

    println!(
        "Generating a {} app with {} (up to {} attempts)...",
        framework, model, attempts
    );

    let report = generator
        .generate_and_run(&args.task, args.task_kind, &mut supervisor)
        .await?;

    println!("{}", report.outcome);
    println!("  attempts:  {}", report.attempts);
    println!("  app file:  {}", supervisor.app_file().display());
    println!("  stdout:    {}", supervisor.stdout_log().display());
    println!("  stderr:    {}", supervisor.stderr_log().display());

    Ok(())
}
