use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use bidbroker::broker::Broker;
use bidbroker::config::BrokerConfig;
use bidbroker::shutdown::shutdown_token;

#[derive(Parser, Debug)]
#[command(name = "bidbroker")]
#[command(about = "A lightweight job-auction broker over TCP")]
struct Args {
    /// Host to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "7171")]
    port: u16,

    /// Queue timeout in milliseconds (bounded lifetime of a pending job)
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config =
        BrokerConfig::new(listen_addr).with_queue_timeout(Duration::from_millis(args.timeout_ms));

    tracing::info!(
        listen_addr = %config.listen_addr,
        queue_timeout_ms = args.timeout_ms,
        "Starting bidbroker"
    );

    let shutdown = shutdown_token();
    Broker::new(config).run(shutdown).await?;

    Ok(())
}
