use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use server::config::RelayConfig;
use server::network::RelayServer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value_t = shared::MAX_CLIENTS)]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = RelayConfig::new(&args.host, args.port, args.max_clients);

    info!("Starting relay...");
    let relay = RelayServer::bind(&config).await?.spawn();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = relay.stopped() => {
            warn!("Relay stopped unexpectedly");
        }
    }

    relay.shutdown().await?;

    Ok(())
}
