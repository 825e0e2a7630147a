use clap::Parser;
use imgrelay::channels::telegram;
use imgrelay::cli::{Cli, Commands, RunOpts};
use imgrelay::config::Config;
use imgrelay::gateway::{self, GatewayState};
use imgrelay::imgbb::ImgbbClient;
use imgrelay::limiter::RateLimiter;
use imgrelay::logging;
use imgrelay::pipeline::UploadPipeline;
use imgrelay::stats::ServiceStats;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(opts) => run(opts).await?,
        Commands::Version => {
            println!("imgrelay {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn run(opts: RunOpts) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(host) = opts.host {
        config.health_host = host;
    }
    if let Some(port) = opts.port {
        config.health_port = port;
    }

    info!(
        max_size_mb = config.max_size_mb,
        "starting imgrelay v{}",
        env!("CARGO_PKG_VERSION")
    );

    let stats = Arc::new(ServiceStats::new());
    let limiter = Arc::new(RateLimiter::default());
    let host_client = ImgbbClient::new(&config.imgbb_api_key, &config.upload_url)?;
    let pipeline = UploadPipeline::new(limiter, stats.clone(), config.max_size_bytes());

    let gateway_state = GatewayState {
        stats,
        max_size_mb: config.max_size_mb,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let addr = config.health_addr()?;
    tokio::spawn(async move {
        if let Err(err) = gateway::serve(gateway_state, addr).await {
            error!("health listener failed: {err:#}");
        }
    });

    telegram::run(&config, pipeline, host_client).await
}
