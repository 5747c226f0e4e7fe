//! Runs several clients against a pool of servers.
//!
//! Run with: `cargo run --example client -- --servers 127.0.0.1:8888 127.0.0.1:8889`
//!
//! Start a server first: `cargo run --example echo_server`

use clap::Parser;
use relink::prelude::*;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "client", about = "Resilient TCP clients sending periodic messages")]
struct Args {
    /// Candidate servers as host:port, tried in order
    #[arg(long, short = 's', num_args = 1.., default_value = "127.0.0.1:8888")]
    servers: Vec<Endpoint>,

    /// Number of clients to run
    #[arg(long, short = 'n', default_value_t = 10)]
    clients: usize,

    /// Milliseconds between messages
    #[arg(long, default_value_t = 2000)]
    interval_ms: u64,

    /// Milliseconds between reconnect attempts
    #[arg(long, default_value_t = 3000)]
    reconnect_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut clients = Vec::with_capacity(args.clients);

    for id in 0..args.clients {
        let client = Client::new(args.servers.clone(), args.reconnect_ms)?;
        client.set_connection_callback(move |connected| {
            let status = if connected { "connected" } else { "disconnected" };
            println!("[Client {id}] {status}");
        });
        client.start();
        clients.push(client);
    }

    println!("Started {} clients, press Ctrl+C to stop", clients.len());

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms));
    let mut sequence: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                sequence += 1;
                for (id, client) in clients.iter().enumerate() {
                    let message = format!("Client {id} message #{sequence}\n");
                    match client.send(message.as_bytes()).await {
                        Ok(()) => tracing::debug!(client = id, sequence, "sent"),
                        Err(e) => println!("[Client {id}] send to {} failed: {e}", client.current_server()),
                    }
                }
            }
        }
    }

    println!("\nStopping clients...");
    for client in &clients {
        client.stop().await;
    }
    println!("Done");
    Ok(())
}
