use anyhow::Result;
use clap::Parser;

use uiforge::cli::{self, Cli, Commands};
use uiforge::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let explicit = cli.config.as_deref();

    // `config` and `paths` must work without a readable config file.
    let config = match cli.command {
        Commands::Config(_) | Commands::Paths => None,
        _ => Some(Config::load_from(explicit)?),
    };

    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config
            .as_ref()
            .map(|c| c.logging.level.clone())
            .unwrap_or_else(|| "info".to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    match (cli.command, config) {
        (Commands::Config(args), _) => cli::config::run(args, explicit).await,
        (Commands::Paths, _) => cli::paths::run(),
        (Commands::Generate(args), Some(config)) => cli::generate::run(args, &config).await,
        (Commands::Run(args), Some(config)) => cli::app::run(args, &config).await,
        (Commands::Stop, Some(config)) => cli::app::stop(&config).await,
        (Commands::Status, Some(config)) => cli::app::status(&config),
        (Commands::Serve(args), Some(config)) => cli::serve::run(args, &config).await,
        (_, None) => anyhow::bail!("Configuration was not loaded"),
    }
}
