use clap::Parser;
use devforward::{Config, DevServer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Static dev server with request forwarding to mocks or a remote API
#[derive(Parser, Debug)]
#[command(name = "devforward", author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides listen.port)
    #[arg(short, long, env = "DEVFORWARD_PORT")]
    port: Option<u16>,

    /// Static root directory (overrides listen.root)
    #[arg(short, long, env = "DEVFORWARD_ROOT")]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devforward=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(root) = args.root {
        config.listen.root = root;
    }
    config.validate()?;

    info!(
        "Starting devforward in {} mode",
        config.forward.mode()?.as_str()
    );
    let server = DevServer::bind(&config).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
