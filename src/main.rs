use clap::Parser;
use recallr::Config;
use std::path::PathBuf;

/// Spaced-learning quiz backend.
#[derive(Parser)]
#[command(name = "recallr", version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured log level (e.g. debug, info, error)
    #[arg(long)]
    log: Option<String>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(level) = cli.log {
        config.logging.level = level;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(recallr::run(config))
}
