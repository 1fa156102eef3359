use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::server::MockServer;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,
}

pub async fn run(args: ServeArgs, config: &Config) -> Result<()> {
    let mut config = config.clone();
    if let Some(port) = args.port {
        config.mock_server.port = port;
    }
    if let Some(bind) = args.bind {
        config.mock_server.bind = bind;
    }

    let server = MockServer::new(&config);
    println!("Mock inference server listening on http://{}", server.addr()?);
    println!("  POST /predict  GET /health");
    server.run().await
}
