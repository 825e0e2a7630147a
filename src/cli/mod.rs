use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "imgrelay", version, about = "Telegram → ImgBB image relay bot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot and the health endpoint.
    Run(RunOpts),
    /// Print the version.
    Version,
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Override the health listener host.
    #[arg(long)]
    pub host: Option<String>,
    /// Override the health listener port.
    #[arg(short, long)]
    pub port: Option<u16>,
}
