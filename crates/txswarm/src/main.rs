use clap::Parser;
use tracing::info;
use txswarm::{Args, run_swarm};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    init_tracing(&args.log_level, &args.log_format);
    info!(version = env!("CARGO_PKG_VERSION"), "starting txswarm");

    let config = args.resolve_config()?;
    run_swarm(config).await
}

fn init_tracing(level: &str, format: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        "json" => {
            tracing_subscriber::fmt().with_env_filter(filter).json().init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
