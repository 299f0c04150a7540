use clap::Parser;
use tracing_subscriber::EnvFilter;
use workspace_hub::Config;

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    workspace_hub::run(config)
}
