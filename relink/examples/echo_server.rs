//! Echo server for trying the client against.
//!
//! Run with: `cargo run --example echo_server -- --port 8888`

use clap::Parser;
use relink::{EchoServer, EchoServerConfig};
use std::net::{Ipv4Addr, SocketAddr};

#[derive(Parser, Debug)]
#[command(name = "echo_server", about = "TCP echo server for relink clients")]
struct Args {
    /// Port to listen on
    #[arg(long, short = 'p', default_value_t = 8888)]
    port: u16,

    /// Accept and record data without echoing it back
    #[arg(long)]
    no_echo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = EchoServerConfig::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port)))
        .echo(!args.no_echo);

    let server = EchoServer::bind(config).await?;
    println!("Echo server listening on {}", server.local_addr());
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down server...");

    println!(
        "Served {} connections, {} bytes received",
        server.accepted_count(),
        server.bytes_received()
    );
    server.shutdown().await;
    Ok(())
}
